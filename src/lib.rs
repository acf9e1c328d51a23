pub mod auth;
pub mod config;
pub mod downloader;
pub mod drive;
pub mod error;
pub mod fetcher;
pub mod locator;
pub mod mime;
pub mod remote;
pub mod types;

pub use auth::{AuthorizedClient, ClientSecret, Token};
pub use config::{Args, DriveConfig};
pub use downloader::{Download, Downloader, RetryPolicy};
pub use drive::DriveClient;
pub use error::{DriveError, Result};
pub use fetcher::{folder_link, FileFetcher};
pub use locator::FileLocator;
pub use remote::{ByteStream, RemoteFilesystem};
pub use types::{FetchReport, FileMetadata, SearchHit};
