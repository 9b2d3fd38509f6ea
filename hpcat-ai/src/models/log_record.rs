//! Description log record

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Column schema of the description log, in file order
pub const LOG_COLUMNS: [&str; 5] = [
    "imagen",
    "descripcion",
    "generated_description",
    "keywords",
    "fecha",
];

/// One cataloging result
///
/// Created once per successful cataloging operation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Image reference (URL or local path)
    pub imagen: String,
    /// User-supplied title or caption
    pub descripcion: String,
    /// Archival description returned by the generation service
    pub generated_description: String,
    /// Index keywords, in the order the service returned them
    pub keywords: Vec<String>,
    /// Local creation time
    pub fecha: NaiveDateTime,
}
