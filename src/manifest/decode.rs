//! Newline-delimited manifest decoding.

use super::FileRecord;
use crate::concurrency::CancelFlag;
use crate::error::ApiError;

/// Lines decoded between two cancellation checkpoints
pub const DECODE_CHUNK_LINES: usize = 4096;

/// Decode a `pkg_version` payload into records.
///
/// Blank lines are skipped. Any line that is not a valid record fails the whole
/// payload with [`ApiError::Decode`]. The cancel flag is checked after every
/// chunk of [`DECODE_CHUNK_LINES`] lines.
pub fn decode_manifest(payload: &str, cancel: &CancelFlag) -> Result<Vec<FileRecord>, ApiError> {
    let mut records = Vec::new();
    let mut in_chunk = 0usize;

    for (index, line) in payload.lines().enumerate() {
        let line = line.trim();
        if !line.is_empty() {
            let record: FileRecord = serde_json::from_str(line)
                .map_err(|e| ApiError::Decode(format!("line {}: {}", index + 1, e)))?;
            records.push(record);
        }

        in_chunk += 1;
        if in_chunk == DECODE_CHUNK_LINES {
            in_chunk = 0;
            cancel.check()?;
        }
    }

    cancel.check()?;
    Ok(records)
}
