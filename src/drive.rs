use std::sync::Arc;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::{
    auth::AuthorizedClient,
    config::DriveConfig,
    error::{DriveError, Result},
    remote::{ByteStream, RemoteFilesystem},
    types::{FileListPage, FileMetadata},
};

/// Only the fields the locator needs
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";

/// 403 reasons Drive uses for quota problems; every other 403 is a denial
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// Error envelope of a Drive API response
#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    errors: Vec<ApiErrorReason>,
}

#[derive(Deserialize)]
struct ApiErrorReason {
    #[serde(default)]
    reason: String,
}

/// Google Drive v3 backed remote filesystem
///
/// Uses the REST API directly:
/// - `files.list` with a parent query for folder listings
/// - `files.get?alt=media` for raw downloads
#[derive(Clone)]
pub struct DriveClient {
    auth: Arc<AuthorizedClient>,
    config: DriveConfig,
}

impl DriveClient {
    pub fn new(auth: Arc<AuthorizedClient>, config: DriveConfig) -> Self {
        Self { auth, config }
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.config.base_url)
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.config.base_url, file_id)
    }

    /// Map non-success statuses to errors, passing successful responses through
    async fn check(&self, response: Response, id: &str) -> Result<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(DriveError::NotFound { id: id.to_string() }),
            StatusCode::UNAUTHORIZED => Err(DriveError::Auth {
                message: response.text().await.unwrap_or_default(),
            }),
            status => {
                let message = response.text().await.unwrap_or_default();
                if is_rate_limit_error(status, &message) {
                    Err(DriveError::RateLimited { message })
                } else {
                    Err(DriveError::Api {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
        }
    }
}

/// Build the `q` expression selecting the children of `folder_id`
fn parents_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents")
}

/// 429 is always a quota problem; 403 only when the body names a rate limit reason
fn is_rate_limit_error(status: StatusCode, body: &str) -> bool {
    match status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => serde_json::from_str::<ApiErrorBody>(body)
            .map(|body| {
                body.error
                    .errors
                    .iter()
                    .any(|e| RATE_LIMIT_REASONS.contains(&e.reason.as_str()))
            })
            .unwrap_or(false),
        _ => false,
    }
}

#[async_trait]
impl RemoteFilesystem for DriveClient {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<FileMetadata>> {
        let url = self.files_url();
        let query = parents_query(folder_id);
        let page_size = self.config.page_size.to_string();

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.as_str()));
            }

            let response = self.auth.get(&url).await?.query(&params).send().await?;
            let page: FileListPage = self.check(response, folder_id).await?.json().await?;
            files.extend(page.files.into_iter().flatten());

            match page.next_page_token {
                Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                    return Err(DriveError::Api {
                        status: StatusCode::OK.as_u16(),
                        message: format!("Listing of {folder_id} repeated page token {token}"),
                    });
                }
                Some(token) if !token.is_empty() => {
                    debug!(folder_id, fetched = files.len(), "fetching next page");
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(files)
    }

    async fn download(&self, file_id: &str) -> Result<ByteStream> {
        let url = self.file_url(file_id);

        let response = self
            .auth
            .get(&url)
            .await?
            .query(&[("alt", "media")])
            .send()
            .await?;
        let response = self.check(response, file_id).await?;

        Ok(Box::pin(response.bytes_stream().map_err(DriveError::from)))
    }

    fn identifier(&self) -> String {
        format!("gdrive://{}", self.config.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parents_query() {
        assert_eq!(parents_query("1ZwI27D9Qs"), "'1ZwI27D9Qs' in parents");
    }

    #[test]
    fn test_parents_query_escapes_quotes() {
        assert_eq!(parents_query("a'b"), r"'a\'b' in parents");
        assert_eq!(parents_query(r"a\b"), r"'a\\b' in parents");
    }

    #[test]
    fn test_rate_limit_statuses() {
        let quota = r#"{"error":{"errors":[{"reason":"userRateLimitExceeded"}],"code":403}}"#;
        assert!(is_rate_limit_error(StatusCode::FORBIDDEN, quota));
        assert!(is_rate_limit_error(StatusCode::TOO_MANY_REQUESTS, ""));
        assert!(!is_rate_limit_error(StatusCode::INTERNAL_SERVER_ERROR, quota));
    }

    #[test]
    fn test_forbidden_without_quota_reason_is_not_rate_limit() {
        let denied = r#"{"error":{"errors":[{"reason":"insufficientFilePermissions"}]}}"#;
        assert!(!is_rate_limit_error(StatusCode::FORBIDDEN, denied));
        assert!(!is_rate_limit_error(StatusCode::FORBIDDEN, "Forbidden"));
        assert!(!is_rate_limit_error(StatusCode::FORBIDDEN, ""));
    }
}
