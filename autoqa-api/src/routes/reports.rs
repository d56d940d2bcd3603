//! Report Listing Route
//!
//! `GET /` returns the dashboard page model. Anonymous visitors get empty
//! lists. For signed-in users both tables are read through the bucketed
//! cache; a failure in one list is reported as a flash message and does not
//! affect the other.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use autoqa_core::{sort_by_timestamp_desc, CoreError, Row};
use autoqa_storage::{CachedTableReader, StorageError};

use crate::config::AppConfig;
use crate::session::SessionHandle;
use crate::state::AppState;

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageCategory {
    Error,
}

/// User-visible notice rendered above the lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub msg: String,
    pub category: MessageCategory,
}

impl FlashMessage {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            category: MessageCategory::Error,
        }
    }
}

/// Why a report list could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Order(#[from] CoreError),
}

/// Everything the dashboard page renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexPage {
    pub authenticated: bool,
    /// Newest first.
    pub platform_reports: Vec<Row>,
    /// Scan order.
    pub hullscrubber_reports: Vec<Row>,
    pub messages: Vec<FlashMessage>,
}

/// GET /
pub async fn index(State(state): State<AppState>, session: SessionHandle) -> Json<IndexPage> {
    let authenticated = session.is_authenticated().await;
    Json(build_index_page(&state.reports, &state.config, authenticated).await)
}

/// Assemble the page model; never fails.
pub async fn build_index_page(
    reader: &CachedTableReader,
    config: &AppConfig,
    authenticated: bool,
) -> IndexPage {
    let mut page = IndexPage {
        authenticated,
        ..IndexPage::default()
    };
    if !authenticated {
        return page;
    }

    let (platform, hullscrubber) = tokio::join!(
        platform_reports(reader, &config.results_table),
        reader.read(&config.hullscrubber_table),
    );

    match platform {
        Ok(rows) => page.platform_reports = rows,
        Err(e) => page
            .messages
            .push(FlashMessage::error(format!("Unable to fetch platform reports.\n{}", e))),
    }

    match hullscrubber {
        Ok(rows) => page.hullscrubber_reports = rows.as_ref().clone(),
        Err(e) => page.messages.push(FlashMessage::error(format!(
            "Unable to fetch hullscrubber reports.\n{}",
            e
        ))),
    }

    page
}

async fn platform_reports(
    reader: &CachedTableReader,
    table: &str,
) -> Result<Vec<Row>, ListingError> {
    let rows = reader.read(table).await?;
    sort_by_timestamp_desc(&rows).map_err(|e| {
        tracing::warn!(table, error = %e, "Platform rows cannot be ordered");
        ListingError::from(e)
    })
}

/// Create the report listing routes under `stage`.
///
/// With a stage the bare prefix (`/prod`) serves the index too.
pub fn create_router(stage: &str) -> Router<AppState> {
    let router = Router::new().route(&format!("{}/", stage), get(index));
    if stage.is_empty() {
        router
    } else {
        router.route(stage, get(index))
    }
}
