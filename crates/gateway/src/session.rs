//! Browser session cookie and per-session state

use axum::{
    extract::FromRequestParts,
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    response::Response,
};
use fuelforge_common::{errors::AppError, SessionStore, SESSION_COOKIE};
use fuelforge_ingestion::Report;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// What the session remembers between the upload and the download
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Changes on every upload, so a report built from older files can be told apart
    #[serde(default)]
    pub upload_id: Option<Uuid>,
    pub invoice_filenames: Vec<String>,
    pub docket_filenames: Vec<String>,
    pub report: Option<Report>,
}

/// Session id taken from the cookie, or freshly minted when absent
#[derive(Debug, Clone, Copy)]
pub struct SessionId {
    pub id: Uuid,
    pub is_new: bool,
}

impl SessionId {
    /// Add the `Set-Cookie` header when the browser does not have the cookie yet
    pub fn attach(&self, response: &mut Response) -> Result<(), AppError> {
        if self.is_new {
            let value = HeaderValue::from_str(&session_cookie(self.id)).map_err(|e| {
                AppError::Internal {
                    message: format!("Invalid session cookie: {}", e),
                }
            })?;
            response.headers_mut().append(SET_COOKIE, value);
        }
        Ok(())
    }

    /// Directory receiving this session's uploads
    pub fn upload_dir(&self, uploads_dir: impl AsRef<Path>) -> PathBuf {
        uploads_dir.as_ref().join(self.id.to_string())
    }
}

impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match session_from_headers(&parts.headers) {
            Some(id) => SessionId { id, is_new: false },
            None => SessionId {
                id: Uuid::new_v4(),
                is_new: true,
            },
        })
    }
}

/// Find the session id among the request's cookies
fn session_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// Delete `uploads/<session id>/` directories whose session no longer exists.
/// Directories modified within `grace` are kept, since an upload writes its
/// files before it saves the session.
pub async fn sweep_orphaned_uploads(
    uploads_dir: &Path,
    sessions: &dyn SessionStore<SessionState>,
    grace: Duration,
) -> Result<usize, AppError> {
    let mut entries = match tokio::fs::read_dir(uploads_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let Some(id) = entry
            .file_name()
            .to_str()
            .and_then(|name| Uuid::parse_str(name).ok())
        else {
            continue;
        };

        let metadata = entry.metadata().await?;
        if !metadata.is_dir() {
            continue;
        }
        let age = metadata.modified()?.elapsed().unwrap_or_default();
        if age < grace || sessions.load(id).await?.is_some() {
            continue;
        }

        tokio::fs::remove_dir_all(entry.path()).await?;
        removed += 1;
    }

    Ok(removed)
}

/// `Set-Cookie` value for a session id
pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}; HttpOnly; SameSite=Lax; Path=/", SESSION_COOKIE, id)
}
