//! Data model for the cataloging pipeline

pub mod log_record;
pub mod metadata_entry;
pub mod session_state;

pub use log_record::{LogRecord, LOG_COLUMNS};
pub use metadata_entry::MetadataEntry;
pub use session_state::{SessionState, StateTransition};
