use std::path::Path;
use tracing::{debug, warn};

use crate::config::EncodingMode;
use crate::errors::{GrepError, GrepResult};

/// Helper function to decode bytes into a String according to encoding mode
pub(crate) fn decode_bytes(bytes: &[u8], what: &str, mode: EncodingMode) -> GrepResult<String> {
    match mode {
        EncodingMode::FailFast => {
            // Try from_utf8 on the slice first to avoid an extra copy if valid
            match std::str::from_utf8(bytes) {
                Ok(valid_str) => Ok(valid_str.to_owned()),
                Err(_utf8_err) => {
                    // Reattempt on a Vec only in the error path so the
                    // FromUtf8Error carries the exact offending data.
                    let from_utf8_err = match String::from_utf8(bytes.to_vec()) {
                        Ok(_) => unreachable!("We already know it's invalid"),
                        Err(e) => e,
                    };
                    Err(GrepError::encoding_error(what, from_utf8_err))
                }
            }
        }
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            // If it's Owned, at least one invalid sequence was replaced.
            if let std::borrow::Cow::Owned(_) = cow {
                warn!("Invalid UTF-8 replaced in {}", what);
            }
            Ok(cow.into_owned())
        }
    }
}

/// Reads the input file into an ordered line sequence, dropping empty lines.
pub fn read_lines(path: &Path, encoding: EncodingMode) -> GrepResult<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => GrepError::file_not_found(path),
        std::io::ErrorKind::PermissionDenied => GrepError::permission_denied(path),
        _ => GrepError::IoError(e),
    })?;

    let contents = decode_bytes(&bytes, &path.display().to_string(), encoding)?;

    let lines: Vec<String> = contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    debug!("read {} non-empty lines from {}", lines.len(), path.display());
    Ok(lines)
}
