//! Description log
//!
//! Append-only table of cataloging results, stored as a `;`-separated file in
//! the legacy encoding with the header
//! `imagen;descripcion;generated_description;keywords;fecha`.
//!
//! Characters outside the legacy encoding are stored as `&#N;` references
//! inside their (quoted) field and restored on load.
//!
//! The whole file is rewritten on every persist. There is no partial-write
//! protection: a crash mid-write can leave a truncated file.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::models::{LogRecord, LOG_COLUMNS};
use hpcat_common::encoding::{escape_unmappable, unescape_unmappable};
use hpcat_common::time::{format_fecha, parse_fecha};

/// Field separator of the log file
pub const LOG_DELIMITER: u8 = b';';

/// In-memory description log, in insertion order
#[derive(Debug, Clone, Default)]
pub struct DescriptionLog {
    records: Vec<LogRecord>,
}

impl DescriptionLog {
    /// Empty log with the fixed column schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the log file
    ///
    /// A missing file yields an empty log. A header that does not match the
    /// fixed schema, or an unreadable timestamp, is a configuration error.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            info!(path = %path.display(), "Description log not found, starting empty");
            return Ok(Self::new());
        }

        let text = hpcat_common::encoding::read_legacy_file(path).map_err(CatalogError::config)?;
        let log = Self::from_csv(&text).map_err(|e| match e {
            CatalogError::Config(msg) => {
                CatalogError::Config(format!("Description log {}: {}", path.display(), msg))
            }
            other => other,
        })?;

        info!(
            path = %path.display(),
            records = log.len(),
            "Description log loaded"
        );
        Ok(log)
    }

    /// Parse log contents (already decoded to UTF-8)
    pub fn from_csv(text: &str) -> Result<Self, CatalogError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(LOG_DELIMITER)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| CatalogError::Config(format!("unreadable header: {}", e)))?;
        let names: Vec<&str> = headers.iter().map(str::trim).collect();
        if names != LOG_COLUMNS {
            return Err(CatalogError::Config(format!(
                "unexpected columns [{}], expected [{}]",
                names.join(", "),
                LOG_COLUMNS.join(", ")
            )));
        }

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            // Header is line 1
            let line = index + 2;
            let row = row.map_err(|e| CatalogError::Config(format!("line {}: {}", line, e)))?;
            let field = |i: usize| unescape_unmappable(row.get(i).unwrap_or("")).into_owned();

            let fecha_cell = field(4);
            let fecha = parse_fecha(&fecha_cell).ok_or_else(|| {
                CatalogError::Config(format!("line {}: invalid fecha '{}'", line, fecha_cell))
            })?;

            records.push(LogRecord {
                imagen: field(0),
                descripcion: field(1),
                generated_description: field(2),
                keywords: parse_keywords_cell(&field(3)),
                fecha,
            });
        }

        Ok(Self { records })
    }

    /// `descripcion` of the first record whose `imagen` equals `title`
    ///
    /// Duplicates are allowed in the log; later matches are never consulted.
    pub fn prior_description(&self, title: &str) -> Option<&str> {
        let found = self
            .records
            .iter()
            .find(|record| record.imagen == title)
            .map(|record| record.descripcion.as_str());
        debug!(title, found = found.is_some(), "Prior log lookup");
        found
    }

    /// Append a record in memory
    pub fn append(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    /// Rewrite the whole log file from memory
    pub fn persist(&self, path: &Path) -> hpcat_common::Result<()> {
        let text = self.to_csv()?;
        hpcat_common::encoding::write_legacy_file(path, &text)?;
        info!(
            path = %path.display(),
            records = self.len(),
            "Description log persisted"
        );
        Ok(())
    }

    /// Render the log as CSV text (UTF-8, before legacy encoding)
    pub fn to_csv(&self) -> hpcat_common::Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(LOG_DELIMITER)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        let csv_error =
            |e: csv::Error| hpcat_common::Error::Internal(format!("CSV write failed: {}", e));

        writer.write_record(LOG_COLUMNS).map_err(csv_error)?;
        for record in &self.records {
            let keywords = serde_json::to_string(&record.keywords).map_err(|e| {
                hpcat_common::Error::Internal(format!("Keyword encoding failed: {}", e))
            })?;
            let fecha = format_fecha(&record.fecha);
            // Escape before quoting so a reference's ';' stays inside its field
            let fields = [
                record.imagen.as_str(),
                record.descripcion.as_str(),
                record.generated_description.as_str(),
                keywords.as_str(),
                fecha.as_str(),
            ]
            .map(escape_unmappable);
            writer
                .write_record(fields.iter().map(|f| f.as_bytes()))
                .map_err(csv_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| hpcat_common::Error::Internal(format!("CSV flush failed: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| hpcat_common::Error::Internal(format!("CSV output not UTF-8: {}", e)))
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse the `keywords` cell of a log row
///
/// Accepts the JSON array form written by this tool and the single-quoted
/// list form (`['a', 'b']`) found in older logs. Empty cells are empty
/// lists; anything else is kept whole as a single keyword.
pub fn parse_keywords_cell(cell: &str) -> Vec<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Vec::new();
    }

    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(cell) {
        return items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }

    if let Some(items) = parse_quoted_list(cell) {
        return items;
    }

    warn!(cell, "Unrecognized keywords cell, keeping it as a single keyword");
    vec![cell.to_string()]
}

/// Parse `['a', "b's"]` style lists; `None` if the text is not one
fn parse_quoted_list(text: &str) -> Option<Vec<String>> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(_) => return None,
        };

        let mut item = String::new();
        loop {
            match chars.next()? {
                '\\' => item.push(chars.next()?),
                c if c == quote => break,
                c => item.push(c),
            }
        }
        items.push(item);

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }

    Some(items)
}
