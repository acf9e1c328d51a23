use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::{
    downloader::{RetryPolicy, DEFAULT_MAX_ATTEMPTS},
    error::{DriveError, Result},
};

/// Download a uniquely named file from a Google Drive folder tree
#[derive(Debug, Clone, Parser)]
#[command(name = "drive-fetch", version)]
pub struct Args {
    /// Exact name of the file to download
    #[arg(short, long)]
    pub file_name: String,

    /// Local directory the file is written to
    #[arg(short, long, default_value = "./")]
    pub output_dir: PathBuf,

    /// Id of the Drive folder to search from
    #[arg(short, long)]
    pub target_dir: String,

    /// OAuth client secret file downloaded from the Google Cloud console
    #[arg(short, long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Where the authorized user token is cached
    #[arg(long, default_value = "token.json")]
    pub token_file: PathBuf,

    #[arg(short, long, default_value = "INFO")]
    pub log_level: tracing::Level,

    /// Download attempts before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Base delay between download attempts, doubled after each failure
    #[arg(long, default_value_t = 0)]
    pub retry_delay_ms: u64,
}

impl Args {
    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::default().with_max_attempts(self.max_attempts);
        if self.retry_delay_ms == 0 {
            return policy;
        }
        policy.with_backoff(Duration::from_millis(self.retry_delay_ms), policy.max_delay)
    }
}

/// Settings for the Drive HTTP client
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Base URL of the Drive v3 REST API
    pub(crate) base_url: String,
    /// Entries requested per `files.list` page
    pub(crate) page_size: u32,
    pub(crate) timeout: Duration,
    pub(crate) user_agent: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
            page_size: 100,
            timeout: Duration::from_secs(60),
            user_agent: concat!("drive-fetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl DriveConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at another endpoint (used against local mock servers)
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Drive accepts 1..=1000; other values are clamped
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 1000);
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the underlying HTTP client
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .build()
            .map_err(|e| DriveError::InvalidConfig {
                message: format!("Unable to build HTTP client: {e}"),
            })
    }
}
