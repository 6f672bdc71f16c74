//! Remote fetching for translation archives and the catalog.
//!
//! This module provides:
//! - The `Transport` seam with a blocking `reqwest` implementation (`http`)
//! - Validate-then-publish downloads with atomic rename (`fetcher`)
//! - Retry policy with exponential backoff and progress events (`retry`)
//!
//! # Architecture
//!
//! ```text
//! Fetcher<T: Transport>
//!         │
//!         ├── Transport (trait)
//!         │       └── HttpTransport
//!         │
//!         ├── checksum::verify_bytes (before anything touches disk)
//!         │
//!         └── RetryPolicy + FetchEvent (used by the verification workflow)
//! ```

mod fetcher;
mod http;
mod retry;

pub use fetcher::{partial_path, publish_atomically, Fetcher};
pub use http::{HttpTransport, Transport, DEFAULT_TIMEOUT_SECS};
pub use retry::{FailureKind, FetchEvent, RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};

#[cfg(test)]
pub(crate) use fetcher::test_support;
