//! Drive mime type classification.
//!
//! See <https://developers.google.com/drive/api/guides/mime-types>.

/// Prefix shared by every Drive-native type (Docs, Sheets, Slides, folders...)
pub const DRIVE_NATIVE_PREFIX: &str = "application/vnd.google-apps";

/// Mime type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Returns true for cloud-only types that have no raw byte representation
pub fn is_drive_native(mime_type: &str) -> bool {
    mime_type.contains(DRIVE_NATIVE_PREFIX)
}

pub fn is_folder(mime_type: &str) -> bool {
    mime_type == FOLDER_MIME_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_native_types() {
        assert!(is_drive_native("application/vnd.google-apps.document"));
        assert!(is_drive_native("application/vnd.google-apps.folder"));
        assert!(is_drive_native("application/vnd.google-apps.spreadsheet"));
    }

    #[test]
    fn test_regular_types() {
        assert!(!is_drive_native("image/png"));
        assert!(!is_drive_native("text/plain"));
        assert!(!is_drive_native(""));
    }

    #[test]
    fn test_folder_detection() {
        assert!(is_folder(FOLDER_MIME_TYPE));
        assert!(!is_folder("application/vnd.google-apps.document"));
        assert!(!is_folder("inode/directory"));
    }
}
