//! Cataloging session state machine
//!
//! A session progresses linearly:
//! IDLE → CONTEXT_GATHERED → DESCRIPTION_GENERATED → KEYWORDS_GENERATED → PERSISTED
//!
//! There are no branches and no retries. A failure leaves the session in the
//! last state it reached.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Cataloging session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Nothing done yet
    Idle,
    /// Metadata and prior log context looked up
    ContextGathered,
    /// Archival description returned by the service
    DescriptionGenerated,
    /// Keyword list returned (possibly degraded)
    KeywordsGenerated,
    /// Record appended and log file rewritten
    Persisted,
}

impl SessionState {
    /// The state that follows this one, if any
    pub fn next(self) -> Option<SessionState> {
        match self {
            SessionState::Idle => Some(SessionState::ContextGathered),
            SessionState::ContextGathered => Some(SessionState::DescriptionGenerated),
            SessionState::DescriptionGenerated => Some(SessionState::KeywordsGenerated),
            SessionState::KeywordsGenerated => Some(SessionState::Persisted),
            SessionState::Persisted => None,
        }
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub old_state: SessionState,
    pub new_state: SessionState,
    pub transitioned_at: NaiveDateTime,
}
