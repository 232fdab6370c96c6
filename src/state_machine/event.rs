//! Events that drive the dialogue

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Startup
    /// A snapshot was loaded; its flags decide where to resume
    Restored { finalized: bool, errored: bool },
    /// No usable snapshot
    FreshStart,

    // User events
    /// Typed text or a clicked quick reply; the two are not distinguished
    UserSubmit { text: String },
    Reset,

    // Language service events
    ModelReply { text: String, candidate_index: usize },
}
