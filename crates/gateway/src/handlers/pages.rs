//! Static page handlers

use axum::{extract::State, response::Html};

use crate::views;
use crate::AppState;

/// Upload form
pub async fn index() -> Html<String> {
    Html(views::index_page())
}

/// Deployment notes for the running instance
pub async fn deployment(State(state): State<AppState>) -> Html<String> {
    Html(views::deployment_page(&state.config))
}
