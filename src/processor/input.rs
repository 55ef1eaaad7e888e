//! Reading dump files into text
//!
//! Dumps are normally UTF-8. Files straight out of the source archive are
//! Shift_JIS (CP932), so invalid UTF-8 falls back to that decoding.

use crate::error::{ProcessorError, Result};
use encoding_rs::SHIFT_JIS;
use std::fs;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &str = "\u{feff}";

/// Decode raw bytes, or `None` when neither encoding fits.
pub fn decode_bytes(bytes: Vec<u8>) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Some(match text.strip_prefix(UTF8_BOM) {
            Some(stripped) => stripped.to_string(),
            None => text,
        }),
        Err(error) => {
            let bytes = error.into_bytes();
            let (decoded, had_errors) = SHIFT_JIS.decode_without_bom_handling(&bytes);
            (!had_errors).then(|| decoded.into_owned())
        }
    }
}

/// Read one dump file as text
pub fn read_dump(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let size = bytes.len();
    let text = decode_bytes(bytes).ok_or_else(|| ProcessorError::UndecodableInput {
        path: path.to_path_buf(),
    })?;
    debug!("Read {} ({} bytes)", path.display(), size);
    Ok(text)
}
