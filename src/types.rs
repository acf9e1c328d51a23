use serde::{Deserialize, Serialize};

use crate::mime;

/// Metadata of a single Drive entry, as returned by the files API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Drive file id
    #[serde(default)]
    pub id: String,
    /// Display name of the file or folder
    #[serde(default)]
    pub name: String,
    /// Mime type reported by Drive
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
}

impl FileMetadata {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Shorthand for a folder entry
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, mime::FOLDER_MIME_TYPE)
    }

    pub fn is_folder(&self) -> bool {
        mime::is_folder(&self.mime_type)
    }

    pub fn is_drive_native(&self) -> bool {
        mime::is_drive_native(&self.mime_type)
    }

    /// Entries without an id carry nothing we can list or download
    pub fn is_blank(&self) -> bool {
        self.id.is_empty()
    }
}

/// A file whose name matched, together with the folder it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub parent_folder_id: String,
    pub file: FileMetadata,
}

/// Outcome of a completed fetch
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// Where the file was written
    pub path: std::path::PathBuf,
    pub bytes_written: u64,
    /// Download attempts used, including the successful one
    pub attempts: u32,
}

/// One page of a `files.list` response
#[derive(Debug, Deserialize)]
pub(crate) struct FileListPage {
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub files: Vec<Option<FileMetadata>>,
}
