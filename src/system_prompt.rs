//! Triage script and system prompt construction
//!
//! The intake flow (service categories, applicant profiles and the ordered
//! questions for each) lives here as data. It is rendered into the behavior
//! instructions sent to the model, and the category labels double as the
//! quick-reply options of the service menu.

use std::fmt::Write;

/// Hidden first message that makes the model open the conversation
pub const BOOTSTRAP_PROMPT: &str = "Starting virtual intake session for triage.";

/// Phrase the model must emit once intake is complete
pub const HANDOFF_PHRASE: &str = "CONNECT WITH CONSULTANT";

/// Quick-reply label that restarts the conversation
pub const RESTART_LABEL: &str = "Restart";

/// A branch of the permanent-residence flow
#[derive(Debug)]
pub struct Profile {
    pub label: &'static str,
    pub questions: &'static [&'static str],
}

/// A service the applicant can pick from the menu
#[derive(Debug)]
pub struct Category {
    pub label: &'static str,
    pub description: &'static str,
    /// Asked once the profile branch (if any) is done
    pub questions: &'static [&'static str],
    pub profiles: &'static [Profile],
}

pub const CATEGORIES: &[Category] = &[
    Category {
        label: "Permanent Visa",
        description: "Eligibility analysis for permanent residence (Eijuu)",
        questions: &[
            "What is the validity of your current visa? (1, 3 or 5 years) If it is 1 year, kindly explain it must be renewed for 3 years before applying.",
            "Have you paid pension (Nenkin) and health insurance (Hoken) on time for the last 2-3 years? Any delays?",
            "What was your approximate gross annual income last year?",
            "How many dependents do you declare for income tax?",
            "Do you have traffic fines or any criminal record?",
        ],
        profiles: &[
            Profile {
                label: "Spouse",
                questions: &[
                    "How many years have you been married? (requirement: 3 years)",
                    "How many years have you lived in Japan? (requirement: 1 year)",
                ],
            },
            Profile {
                label: "Descendant",
                questions: &[
                    "How many years have you lived in Japan without interruption? (requirement: 5 years)",
                ],
            },
            Profile {
                label: "Work Visa",
                questions: &[
                    "How many years have you lived in Japan? (requirement: 10 years, 5 of them working)",
                ],
            },
        ],
    },
    Category {
        label: "Common Visa",
        description: "Renewals and changes of status",
        questions: &[
            "What is your current visa type?",
            "When does it expire?",
            "Which city do you live in?",
            "What is your WhatsApp or phone number?",
        ],
        profiles: &[],
    },
    Category {
        label: "Consulate",
        description: "Passports and civil registrations",
        questions: &[
            "Which service do you need? (passport, registrations, etc.)",
            "Which city do you live in?",
            "What is your WhatsApp or phone number?",
        ],
        profiles: &[],
    },
];

/// Labels of the service menu, in display order
pub fn category_labels() -> Vec<String> {
    CATEGORIES.iter().map(|c| c.label.to_string()).collect()
}

fn marker_list<'a>(labels: impl IntoIterator<Item = &'a str>) -> String {
    labels.into_iter().map(|l| format!("[{l}]")).collect()
}

/// Render the complete behavior instructions for the model
pub fn build_system_prompt(consultant_name: &str) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are the Virtual Concierge of an immigration advisory office in Japan. \
         Your tone is that of a senior consultant: extremely polite, organized and premium. \
         Your goal is a precise technical triage for the consultant {consultant_name}."
    );
    prompt.push_str(
        "\nQUICK REPLIES:\nWhenever the user should pick from fixed choices, end your message with one \
         marker per choice, written as the label in square brackets, e.g. [Yes][No]. \
         Never use square brackets for anything else.\n",
    );

    prompt.push_str(
        "\nFLOW (ask ONE question at a time):\n\
         Step 1: Greet the user and ask for their full name.\n",
    );
    let _ = writeln!(
        prompt,
        "Step 2: After learning the name, greet them by name, ask how you can help today and \
         offer the options {}.",
        marker_list(CATEGORIES.iter().map(|c| c.label))
    );
    prompt.push_str("Step 3: Follow the questions of the chosen category.\n");

    for category in CATEGORIES {
        let _ = writeln!(prompt, "\n--- CATEGORY: {} ({}) ---", category.label, category.description);
        if !category.profiles.is_empty() {
            let _ = writeln!(
                prompt,
                "First ask for the applicant's current profile, offering {}.",
                marker_list(category.profiles.iter().map(|p| p.label))
            );
            for profile in category.profiles {
                let _ = writeln!(prompt, "If {}:", profile.label);
                for question in profile.questions {
                    let _ = writeln!(prompt, "  - {question}");
                }
            }
            prompt.push_str("Then, for every profile:\n");
        }
        for question in category.questions {
            let _ = writeln!(prompt, "  - {question}");
        }
    }

    let _ = write!(
        prompt,
        "\nCOMPLETION:\nAs soon as all answers are collected, say exactly: \
         \"Thank you for the information. Your triage report has been generated. \
         For {consultant_name} to take over your case right now, please press the \
         '{HANDOFF_PHRASE}' button below.\" \
         Never use the phrase '{HANDOFF_PHRASE}' before that point."
    );

    prompt
}
