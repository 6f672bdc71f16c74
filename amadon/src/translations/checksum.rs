//! MD5 checksum calculation for archive verification.
//!
//! The translation catalog publishes MD5 digests, so both on-disk archives and
//! freshly downloaded payloads are hashed with the same algorithm.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::error::{TranslationError, TranslationResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the MD5 checksum of a file.
///
/// # Returns
///
/// The lowercase hexadecimal digest of the file contents.
///
/// # Errors
///
/// Returns `ReadFailed` if the file cannot be opened or read.
pub fn calculate_file_checksum(path: &Path) -> TranslationResult<String> {
    let mut file = File::open(path).map_err(|e| TranslationError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| TranslationError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        context.consume(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", context.compute()))
}

/// Calculate the MD5 checksum of an in-memory payload.
pub fn calculate_bytes_checksum(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Compare two hex digests, ignoring case and surrounding whitespace.
pub fn checksums_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

/// Verify that a payload matches an expected checksum.
///
/// `label` names the payload in the resulting error (usually the archive
/// file name).
pub fn verify_bytes(label: &str, data: &[u8], expected: &str) -> TranslationResult<()> {
    let actual = calculate_bytes_checksum(data);
    if !checksums_match(expected, &actual) {
        return Err(TranslationError::ChecksumMismatch {
            filename: label.to_string(),
            expected: expected.trim().to_ascii_lowercase(),
            actual,
        });
    }
    Ok(())
}
