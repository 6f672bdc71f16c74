//! Amadon - translation packages for the Amadon reader
//!
//! This library downloads, verifies and extracts the translation archives the
//! reader displays, and keeps the user's three translation slots consistent
//! with the published catalog.

pub mod cleanup;
pub mod config;
pub mod logging;
pub mod translations;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_not_empty() {
        assert!(!VERSION.is_empty(), "Version should not be empty");
    }
}
