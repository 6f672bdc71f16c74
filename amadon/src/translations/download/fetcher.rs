//! Validate-then-publish downloads.
//!
//! A payload is held in memory until it has been checked against the expected
//! checksum. Only then is it written to a hidden sibling file and renamed over
//! the destination, so readers of the destination never see a partial or
//! unverified file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;

use super::http::Transport;
use super::retry::{FailureKind, FetchEvent, RetryPolicy};
use crate::translations::checksum::verify_bytes;
use crate::translations::error::{TranslationError, TranslationResult};

/// Downloads resources through a [`Transport`] and publishes them atomically.
#[derive(Debug, Clone)]
pub struct Fetcher<T> {
    transport: T,
}

impl<T: Transport> Fetcher<T> {
    /// Create a fetcher over the given transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Download `url` and publish it at `dest` (single attempt).
    ///
    /// When `expected_checksum` is given and does not match, `dest` is left
    /// exactly as it was.
    ///
    /// # Returns
    ///
    /// The number of bytes published.
    pub fn fetch_to(
        &self,
        url: &str,
        dest: &Path,
        expected_checksum: Option<&str>,
    ) -> TranslationResult<u64> {
        let body = self.transport.get(url)?;

        if let Some(expected) = expected_checksum {
            verify_bytes(&file_label(dest), &body, expected)?;
        }

        publish_atomically(dest, &body)?;
        Ok(body.len() as u64)
    }

    /// Download with retries and exponential backoff.
    ///
    /// Every attempt and its outcome is reported through `on_event`. After the
    /// last failed attempt any leftover temporary file is removed and the last
    /// error is returned.
    pub fn fetch_with_retry(
        &self,
        url: &str,
        dest: &Path,
        expected_checksum: Option<&str>,
        policy: &RetryPolicy,
        on_event: &mut dyn FnMut(FetchEvent),
    ) -> TranslationResult<u64> {
        let mut last_error = None;

        for attempt in 1..=policy.max_attempts {
            if attempt > 1 {
                let delay = policy.delay_before(attempt);
                on_event(FetchEvent::Backoff { delay });
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }

            on_event(FetchEvent::Attempt {
                attempt,
                max_attempts: policy.max_attempts,
                url: url.to_string(),
            });

            match self.fetch_to(url, dest, expected_checksum) {
                Ok(bytes) => {
                    tracing::info!(url, attempt, bytes, "Download published");
                    on_event(FetchEvent::Succeeded { attempt, bytes });
                    return Ok(bytes);
                }
                Err(e) => {
                    let kind = FailureKind::of(&e);
                    tracing::warn!(url, attempt, %kind, error = %e, "Download attempt failed");
                    on_event(FetchEvent::Failed {
                        attempt,
                        kind,
                        error: e.to_string(),
                    });
                    last_error = Some(e);
                }
            }
        }

        remove_partial(dest);
        on_event(FetchEvent::GaveUp {
            attempts: policy.max_attempts,
        });
        tracing::error!(url, attempts = policy.max_attempts, "Download gave up");

        Err(last_error.unwrap_or_else(|| TranslationError::DownloadFailed {
            url: url.to_string(),
            reason: "no attempts made".to_string(),
        }))
    }
}

/// Hidden sibling used while writing `dest`.
pub fn partial_path(dest: &Path) -> PathBuf {
    let name = format!(".{}.part", file_label(dest));
    match dest.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Write `data` next to `dest` and rename it into place.
pub fn publish_atomically(dest: &Path, data: &[u8]) -> TranslationResult<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| TranslationError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp = partial_path(dest);
    let result = write_synced(&temp, data).and_then(|()| {
        fs::rename(&temp, dest).map_err(|e| TranslationError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })
    });

    if result.is_err() {
        fs::remove_file(&temp).ok();
    }
    result
}

fn write_synced(path: &Path, data: &[u8]) -> TranslationResult<()> {
    let write = || -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(data)?;
        file.sync_all()
    };
    write().map_err(|e| TranslationError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

fn remove_partial(dest: &Path) {
    let temp = partial_path(dest);
    if temp.exists() {
        fs::remove_file(&temp).ok();
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}


#[cfg(test)]
mod tests {
    use super::test_support::ScriptedTransport;
    use super::*;
    use crate::translations::checksum::calculate_bytes_checksum;
    use tempfile::TempDir;

    const URL: &str = "https://example.com/TR001.gz";

    #[test]
    fn test_fetch_publishes_verified_payload() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("TR001.gz");
        let checksum = calculate_bytes_checksum(b"payload");
        let fetcher = Fetcher::new(ScriptedTransport::new().ok(URL, b"payload"));

        let bytes = fetcher.fetch_to(URL, &dest, Some(&checksum)).unwrap();

        assert_eq!(bytes, 7);
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn test_integrity_failure_leaves_destination_untouched() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("TR001.gz");
        fs::write(&dest, b"previous").unwrap();
        let fetcher = Fetcher::new(ScriptedTransport::new().ok(URL, b"tampered"));

        let result = fetcher.fetch_to(URL, &dest, Some("d41d8cd98f00b204e9800998ecf8427e"));

        assert!(matches!(result, Err(TranslationError::ChecksumMismatch { .. })));
        assert_eq!(fs::read(&dest).unwrap(), b"previous");
    }

    #[test]
    fn test_integrity_failure_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("TR001.gz");
        let fetcher = Fetcher::new(ScriptedTransport::new().ok(URL, b"tampered"));

        assert!(fetcher.fetch_to(URL, &dest, Some("00")).is_err());
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn test_retry_recovers_after_http_error() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("TR001.gz");
        let fetcher = Fetcher::new(
            ScriptedTransport::new()
                .status(URL, 503)
                .ok(URL, b"payload"),
        );
        let mut events = Vec::new();

        let bytes = fetcher
            .fetch_with_retry(URL, &dest, None, &RetryPolicy::immediate(3), &mut |e: FetchEvent| {
                events.push(e)
            })
            .unwrap();

        assert_eq!(bytes, 7);
        assert_eq!(fetcher.transport().requests().len(), 2);
        assert!(matches!(
            events[1],
            FetchEvent::Failed {
                attempt: 1,
                kind: FailureKind::Http,
                ..
            }
        ));
        assert!(matches!(events.last(), Some(FetchEvent::Succeeded { attempt: 2, .. })));
    }

    #[test]
    fn test_retry_gives_up_after_max_attempts() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("TR001.gz");
        let transport = ScriptedTransport::new()
            .ok(URL, b"bad1")
            .ok(URL, b"bad2")
            .ok(URL, b"bad3")
            .ok(URL, b"never requested");
        let fetcher = Fetcher::new(transport);
        let mut events = Vec::new();

        let result = fetcher.fetch_with_retry(
            URL,
            &dest,
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3"),
            &RetryPolicy::immediate(3),
            &mut |e: FetchEvent| events.push(e),
        );

        assert!(matches!(result, Err(TranslationError::ChecksumMismatch { .. })));
        assert_eq!(fetcher.transport().requests().len(), 3);
        assert!(!dest.exists());
        assert_eq!(events.last(), Some(&FetchEvent::GaveUp { attempts: 3 }));
        let backoffs = events
            .iter()
            .filter(|e| matches!(e, FetchEvent::Backoff { .. }))
            .count();
        assert_eq!(backoffs, 2);
    }

    #[test]
    fn test_partial_path_is_hidden_sibling() {
        let path = partial_path(Path::new("/srv/doc_sources/TR001.gz"));
        assert_eq!(path, PathBuf::from("/srv/doc_sources/.TR001.gz.part"));
    }
}
