//! Upload handler

use axum::{
    extract::{
        multipart::{Multipart, MultipartError},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use fuelforge_common::{
    errors::{AppError, Result},
    metrics, ALLOWED_EXTENSION,
};
use std::io;
use tracing::{info, warn};
use uuid::Uuid;

use crate::session::{SessionId, SessionState};
use crate::AppState;

/// Which form field a file arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadKind {
    Invoice,
    Docket,
}

impl UploadKind {
    fn from_field(name: &str) -> Option<Self> {
        match name {
            "invoices" => Some(UploadKind::Invoice),
            "dockets" => Some(UploadKind::Docket),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            UploadKind::Invoice => "invoice",
            UploadKind::Docket => "docket",
        }
    }
}

/// Accept invoice and docket PDFs, then send the browser on to processing
pub async fn upload_files(
    State(state): State<AppState>,
    session: SessionId,
    mut multipart: Multipart,
) -> Result<Response> {
    // A new upload replaces everything the session uploaded before
    let dir = session.upload_dir(&state.config.storage.uploads_dir);
    match tokio::fs::remove_dir_all(&dir).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }
    tokio::fs::create_dir_all(&dir).await?;

    let mut invoices: Vec<String> = Vec::new();
    let mut dockets: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, &state))?
    {
        let Some(kind) = field.name().and_then(UploadKind::from_field) else {
            continue;
        };
        // Browsers submit an empty part for a file input left blank
        let original = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        let Some(file_name) = secure_filename(&original).filter(|name| allowed_file(name)) else {
            warn!(file = %original, kind = kind.label(), "Rejected upload");
            metrics::record_upload(kind.label(), false);
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, &state))?;
        tokio::fs::write(dir.join(&file_name), &bytes).await?;
        metrics::record_upload(kind.label(), true);

        let names = match kind {
            UploadKind::Invoice => &mut invoices,
            UploadKind::Docket => &mut dockets,
        };
        if !names.contains(&file_name) {
            names.push(file_name);
        }
    }

    info!(
        session = %session.id,
        invoices = invoices.len(),
        dockets = dockets.len(),
        "Files uploaded"
    );

    let session_state = SessionState {
        upload_id: Some(Uuid::new_v4()),
        invoice_filenames: invoices,
        docket_filenames: dockets,
        report: None,
    };
    state.sessions.save(session.id, &session_state).await?;

    let mut response = Redirect::to("/process_files").into_response();
    session.attach(&mut response)?;
    Ok(response)
}

fn multipart_error(err: MultipartError, state: &AppState) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge {
            limit: state.config.server.max_upload_bytes,
        }
    } else {
        AppError::InvalidFormat {
            message: err.body_text(),
        }
    }
}

/// Whether a file name carries the accepted extension (case-insensitive)
pub fn allowed_file(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(ALLOWED_EXTENSION))
}

/// Reduce a client-supplied file name to a safe basename.
/// Returns `None` when nothing usable is left.
pub fn secure_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']).to_string();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
