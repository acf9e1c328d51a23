use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    error::{DriveError, Result},
    remote::{ByteStream, RemoteFilesystem},
};

/// Default attempt cap for a single download
pub const DEFAULT_MAX_ATTEMPTS: u32 = 40;

/// How many times to try a download and how long to wait in between
///
/// The default makes 40 attempts back to back. Setting `base_delay`
/// enables exponential backoff, doubling after every failure up to
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::ZERO,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Delay before the attempt following failed attempt number `failed` (1-based)
    pub fn delay_after(&self, failed: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(failed.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// A successful download together with the number of attempts it took
pub struct Download {
    pub stream: ByteStream,
    pub attempts: u32,
}

/// Downloads files, retrying every failure until the policy is exhausted
pub struct Downloader {
    remote: Arc<dyn RemoteFilesystem>,
    policy: RetryPolicy,
}

impl Downloader {
    pub fn new(remote: Arc<dyn RemoteFilesystem>) -> Self {
        Self::with_policy(remote, RetryPolicy::default())
    }

    pub fn with_policy(remote: Arc<dyn RemoteFilesystem>, policy: RetryPolicy) -> Self {
        Self { remote, policy }
    }

    /// Open the content of `file_id`
    ///
    /// Every error from the backend is treated as transient. After
    /// `max_attempts` failures the last one is returned inside
    /// `DriveError::DownloadExhausted`.
    pub async fn download(&self, file_id: &str) -> Result<Download> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.remote.download(file_id).await {
                Ok(stream) => {
                    debug!(file_id, attempt, "download started");
                    return Ok(Download {
                        stream,
                        attempts: attempt,
                    });
                }
                Err(e) if attempt >= max_attempts => {
                    warn!(file_id, attempt, max_attempts, error = %e, "download failed, giving up");
                    return Err(DriveError::DownloadExhausted {
                        file_id: file_id.to_string(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(file_id, attempt, max_attempts, error = %e, "download failed, retrying");
                    let delay = self.policy.delay_after(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
