//! Processing and download handlers

use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{Html, IntoResponse, Redirect, Response},
};
use fuelforge_common::errors::{AppError, Result};
use fuelforge_ingestion::{KnowledgeBase, Report};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::session::SessionId;
use crate::views;
use crate::AppState;

const CSV_FILENAME: &str = "combined_invoice_data.csv";

/// Process the session's uploads and render the three sheets
pub async fn process_files(State(state): State<AppState>, session: SessionId) -> Result<Response> {
    let session_state = state.sessions.load(session.id).await?.unwrap_or_default();
    if session_state.invoice_filenames.is_empty() {
        return Err(AppError::NoInvoices);
    }

    let dir = session.upload_dir(&state.config.storage.uploads_dir);
    let invoices: Vec<PathBuf> = session_state
        .invoice_filenames
        .iter()
        .map(|name| dir.join(name))
        .collect();
    let dockets: Vec<PathBuf> = session_state
        .docket_filenames
        .iter()
        .map(|name| dir.join(name))
        .collect();

    let processor = state.processor.clone();
    let calendar_path = state.config.financial_calendar_path();
    let vendor_path = state.config.vendor_lookup_path();

    let report = tokio::task::spawn_blocking(move || -> Result<Report> {
        let knowledge = KnowledgeBase::load(&calendar_path, &vendor_path)?;
        Ok(processor.process(&invoices, &dockets, &knowledge))
    })
    .await
    .map_err(|e| AppError::Internal {
        message: format!("Processing task failed: {}", e),
    })??;

    if report.is_empty() {
        return Err(AppError::NoResults);
    }

    info!(
        session = %session.id,
        invoices = report.checklist.len(),
        deliveries = report.fuel_tracking.len(),
        "Report ready"
    );

    let page = views::results_page(&report);
    if !store_report(&state, session.id, session_state.upload_id, report).await? {
        warn!(session = %session.id, "Uploads changed during processing, reprocessing");
        return Ok(Redirect::to("/process_files").into_response());
    }

    let mut response = Html(page).into_response();
    session.attach(&mut response)?;
    Ok(response)
}

/// Save the report unless another upload replaced the session's files meanwhile.
/// Returns whether the report was stored.
pub(crate) async fn store_report(
    state: &AppState,
    id: Uuid,
    upload_id: Option<Uuid>,
    report: Report,
) -> Result<bool> {
    let mut latest = state.sessions.load(id).await?.unwrap_or_default();
    if latest.upload_id != upload_id {
        return Ok(false);
    }

    latest.report = Some(report);
    state.sessions.save(id, &latest).await?;
    Ok(true)
}

/// The session's report as one CSV attachment
pub async fn download_combined_csv(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<Response> {
    let report = state
        .sessions
        .load(session.id)
        .await?
        .and_then(|s| s.report)
        .ok_or(AppError::NoSessionData)?;

    let csv = report.to_combined_csv().map_err(AppError::from)?;

    Ok((
        [
            (CONTENT_TYPE, "text/csv".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename={}", CSV_FILENAME),
            ),
        ],
        csv,
    )
        .into_response())
}
