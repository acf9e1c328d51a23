use thiserror::Error;

/// Errors that can occur while searching or downloading from Drive
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Drive entry not found: {id}")]
    NotFound { id: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited by Drive: {message}")]
    RateLimited { message: String },

    #[error("Drive API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authorization failed: {message}")]
    Auth { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No file named {name} was found")]
    NoMatch { name: String },

    #[error("{} files named {name} exist in different folders", .parent_folder_ids.len())]
    Ambiguous {
        name: String,
        parent_folder_ids: Vec<String>,
    },

    #[error("{name} is a Drive-native file ({mime_type}) and cannot be downloaded as raw bytes")]
    UnsupportedMimeType { name: String, mime_type: String },

    #[error("Download of {file_id} failed after {attempts} attempts: {source}")]
    DownloadExhausted {
        file_id: String,
        attempts: u32,
        #[source]
        source: Box<DriveError>,
    },
}

impl DriveError {
    /// Whether the error comes from resolving the target name rather than
    /// from a failing operation.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            DriveError::NoMatch { .. }
                | DriveError::Ambiguous { .. }
                | DriveError::UnsupportedMimeType { .. }
        )
    }
}

/// Result type alias for Drive operations
pub type Result<T> = std::result::Result<T, DriveError>;
