//! Concierge - conversational intake for visa and consular services
//!
//! Terminal front end over the dialogue runtime. Model turns are printed
//! with their option markers stripped; options are numbered so a reply can
//! be picked by index.

mod config;
mod db;
mod handoff;
mod llm;
mod markers;
mod runtime;
mod state_machine;
mod system_prompt;

use chrono::{DateTime, Utc};
use config::ConciergeConfig;
use db::{Database, Role};
use handoff::Consultant;
use llm::{FallbackChat, ModelRegistry};
use runtime::{DatabaseStore, DialogueHandle, DialogueView};
use state_machine::DialogueContext;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concierge=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ConciergeConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let registry = ModelRegistry::new(&config.llm);
    if registry.has_models() {
        tracing::info!(models = ?registry.model_ids(), "Language models configured");
    } else {
        tracing::warn!("No API key configured. Set GEMINI_API_KEY.");
    }

    let chat = FallbackChat::new(
        registry,
        system_prompt::build_system_prompt(&config.consultant.name),
    );
    let handle = runtime::spawn(DialogueContext::default(), DatabaseStore::new(db), chat);

    repl(&handle, &config.consultant).await?;

    tracing::info!("Shutting down");
    Ok(())
}

async fn repl(
    handle: &DialogueHandle,
    consultant: &Consultant,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut transcript = Transcript::default();

    println!("Commands: /reset, /handoff, /quit. Pick an option by its number.");

    loop {
        let view = handle.settled().await?;
        transcript.render(&view);

        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => {}
            "/quit" => break,
            "/reset" => {
                if let Err(e) = handle.reset().await {
                    println!("({e})");
                }
            }
            "/handoff" => match handle.handoff_link(consultant) {
                Some(Ok(url)) => println!("Open this link to reach {}:\n{url}", consultant.name),
                Some(Err(e)) => println!("({e})"),
                None => println!("(The consultant link is available once the triage is complete.)"),
            },
            input => {
                if let Err(e) = handle.submit(resolve_choice(input, &view.options)).await {
                    println!("({e})");
                }
            }
        }
    }

    Ok(())
}

/// Tracks what has already been printed
#[derive(Default)]
struct Transcript {
    /// Start of the printed conversation; a restart gives a new one
    session: Option<DateTime<Utc>>,
    printed: usize,
}

impl Transcript {
    fn render(&mut self, view: &DialogueView) {
        let session = view.turns.first().map(|t| t.created_at);
        if session != self.session || view.turns.len() < self.printed {
            self.session = session;
            self.printed = 0;
        }

        for turn in view.turns.iter().skip(self.printed) {
            match turn.role {
                Role::Model => println!("\n{}\n", markers::strip_markers(&turn.text)),
                Role::User => println!("> {}", turn.text),
            }
        }
        self.printed = view.turns.len();

        if !view.options.is_empty() {
            let listed: Vec<String> = view
                .options
                .iter()
                .enumerate()
                .map(|(i, label)| format!("[{}] {label}", i + 1))
                .collect();
            println!("{}", listed.join("  "));
        }

        if view.state.offers_handoff() {
            println!("(Type /handoff for the consultant link.)");
        }
    }
}

/// A number picks the matching option; anything else is sent as typed
fn resolve_choice(input: &str, options: &[String]) -> String {
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .cloned()
        .unwrap_or_else(|| input.to_string())
}
