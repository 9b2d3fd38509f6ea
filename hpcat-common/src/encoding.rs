//! Legacy text encoding for the archive's data files
//!
//! The metadata file and the description log are both stored in the
//! ISO-8859-1 family. `encoding_rs` resolves that label to windows-1252
//! (the WHATWG mapping), which is a superset for every printable Latin-1
//! character, so Spanish text (ñ, á, ¿) round-trips unchanged.

use std::borrow::Cow;
use std::path::Path;

use encoding_rs::{Encoding, WINDOWS_1252};
use tracing::warn;

use crate::{Error, Result};

/// Label of the legacy encoding used by the archive data files
pub const LEGACY_ENCODING_LABEL: &str = "ISO-8859-1";

/// Resolve the legacy encoding
pub fn legacy_encoding() -> &'static Encoding {
    Encoding::for_label(LEGACY_ENCODING_LABEL.as_bytes()).unwrap_or(WINDOWS_1252)
}

/// Decode legacy-encoded bytes into a UTF-8 string
///
/// Every byte maps to some character, so decoding never fails.
pub fn decode_legacy(bytes: &[u8]) -> String {
    let (decoded, _, _) = legacy_encoding().decode(bytes);
    decoded.into_owned()
}

/// Encode a UTF-8 string into legacy bytes
///
/// Characters with no legacy representation are written as HTML numeric
/// character references (`&#8776;`) and a warning is logged.
pub fn encode_legacy(text: &str) -> Vec<u8> {
    let (encoded, _, had_unmappable) = legacy_encoding().encode(text);
    if had_unmappable {
        warn!(
            encoding = LEGACY_ENCODING_LABEL,
            "Text contains characters outside the legacy encoding; written as numeric references"
        );
    }
    encoded.into_owned()
}

/// True if `c` has a single-byte legacy representation
pub fn is_legacy_representable(c: char) -> bool {
    if c.is_ascii() {
        return true;
    }
    let mut buf = [0u8; 4];
    let (_, _, had_unmappable) = legacy_encoding().encode(c.encode_utf8(&mut buf));
    !had_unmappable
}

/// Replace characters outside the legacy encoding with `&#N;` references
///
/// Applied per field before a delimited writer sees the text, so the
/// reference's `;` is quoted along with the rest of the field.
pub fn escape_unmappable(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_legacy_representable) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if is_legacy_representable(c) {
            escaped.push(c);
        } else {
            escaped.push_str(&format!("&#{};", c as u32));
        }
    }
    Cow::Owned(escaped)
}

/// Reverse `escape_unmappable`
///
/// Only references to characters outside the legacy encoding are decoded.
/// `&#233;` stays literal text, since `é` is always written as a byte.
pub fn unescape_unmappable(text: &str) -> Cow<'_, str> {
    if !text.contains("&#") {
        return Cow::Borrowed(text);
    }

    let mut unescaped = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("&#") {
        unescaped.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let digits = after.bytes().take_while(|b| b.is_ascii_digit()).count();

        let decoded = if digits > 0 && after.as_bytes().get(digits) == Some(&b';') {
            after[..digits]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .filter(|c| !is_legacy_representable(*c))
        } else {
            None
        };

        match decoded {
            Some(c) => {
                unescaped.push(c);
                rest = &after[digits + 1..];
            }
            None => {
                unescaped.push_str("&#");
                rest = after;
            }
        }
    }
    unescaped.push_str(rest);
    Cow::Owned(unescaped)
}

/// Read a whole legacy-encoded file as UTF-8 text
pub fn read_legacy_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(decode_legacy(&bytes))
}

/// Write UTF-8 text to a file in the legacy encoding, replacing any existing file
pub fn write_legacy_file(path: &Path, text: &str) -> Result<()> {
    let bytes = encode_legacy(text);
    std::fs::write(path, bytes)
        .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))
}
