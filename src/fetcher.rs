use std::path::{Component, Path};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::{
    downloader::{Downloader, RetryPolicy},
    error::{DriveError, Result},
    locator::FileLocator,
    remote::{ByteStream, RemoteFilesystem},
    types::{FetchReport, SearchHit},
};

/// Browser link to a Drive folder
pub fn folder_link(folder_id: &str) -> String {
    format!("https://drive.google.com/drive/folders/{folder_id}")
}

/// Finds a uniquely named file below a folder and saves it locally
pub struct FileFetcher {
    locator: FileLocator,
    downloader: Downloader,
}

impl FileFetcher {
    pub fn new(remote: Arc<dyn RemoteFilesystem>, policy: RetryPolicy) -> Self {
        Self {
            locator: FileLocator::new(remote.clone()),
            downloader: Downloader::with_policy(remote, policy),
        }
    }

    /// Resolve `name` to exactly one downloadable file below `root_folder_id`
    ///
    /// Zero hits is `NoMatch`, several is `Ambiguous` (carrying every parent
    /// folder id), and a Drive-native hit is `UnsupportedMimeType`.
    pub async fn resolve(&self, root_folder_id: &str, name: &str) -> Result<SearchHit> {
        let mut hits = self.locator.locate(root_folder_id, name).await?;

        let hit = match hits.len() {
            0 => {
                return Err(DriveError::NoMatch {
                    name: name.to_string(),
                })
            }
            1 => hits.remove(0),
            _ => {
                return Err(DriveError::Ambiguous {
                    name: name.to_string(),
                    parent_folder_ids: hits.into_iter().map(|h| h.parent_folder_id).collect(),
                })
            }
        };

        if hit.file.is_drive_native() {
            return Err(DriveError::UnsupportedMimeType {
                name: hit.file.name,
                mime_type: hit.file.mime_type,
            });
        }

        Ok(hit)
    }

    /// Resolve `name`, download it and write it to `output_dir/name`
    ///
    /// `name` must be usable as a single local file name; this is checked
    /// before anything is searched.
    pub async fn fetch_to(
        &self,
        root_folder_id: &str,
        name: &str,
        output_dir: &Path,
    ) -> Result<FetchReport> {
        check_local_name(name)?;
        let hit = self.resolve(root_folder_id, name).await?;
        info!(file_id = %hit.file.id, parent = %hit.parent_folder_id, "found {name}");

        let download = self.downloader.download(&hit.file.id).await?;
        let path = output_dir.join(name);
        let bytes_written = write_stream(download.stream, &path).await?;

        Ok(FetchReport {
            path,
            bytes_written,
            attempts: download.attempts,
        })
    }
}

/// Reject names that would escape `output_dir` or name a directory
fn check_local_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single && !name.chars().any(std::path::is_separator) {
        return Ok(());
    }
    Err(DriveError::InvalidConfig {
        message: format!("{name:?} cannot be used as a local file name"),
    })
}

/// Copy `stream` into a new file at `path`, removing the file if the copy fails
async fn write_stream(stream: ByteStream, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;

    match copy_stream(stream, &mut file).await {
        Ok(written) => Ok(written),
        Err(e) => {
            drop(file);
            if let Err(remove_err) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %remove_err, "could not remove partial file");
            }
            Err(e)
        }
    }
}

async fn copy_stream(mut stream: ByteStream, file: &mut tokio::fs::File) -> Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
