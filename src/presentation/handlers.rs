// HTTP request handlers
use crate::application::engine_service::EngineError;
use crate::application::history_sync::SyncError;
use crate::application::sync_engine::{EngineSnapshot, View};
use crate::domain::chart::ChartDataset;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::Stream;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct ChartResponse {
    #[serde(flatten)]
    pub dataset: ChartDataset,
    pub state_axis_labels: [&'static str; 3],
    pub shareable: bool,
}

impl From<ChartDataset> for ChartResponse {
    fn from(dataset: ChartDataset) -> Self {
        let shareable = dataset.is_shareable();
        Self {
            dataset,
            state_axis_labels: ChartDataset::state_axis_labels(),
            shareable,
        }
    }
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub started: bool,
    pub minutes: u32,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Connection, session and live activity state
pub async fn get_status(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.snapshot().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(e),
    }
}

/// Last reduced history dataset
pub async fn get_chart(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.chart().await {
        Ok(dataset) => Json(ChartResponse::from(dataset)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Sync ranges offered to the user
pub async fn list_presets(State(state): State<Arc<AppState>>) -> Json<Vec<u32>> {
    Json(state.sync_presets.clone())
}

/// Start a history sync for the last `minutes`
pub async fn request_sync(
    Path(minutes): Path<u32>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.engine.request_sync(minutes).await {
        Ok(true) => (
            StatusCode::ACCEPTED,
            Json(SyncResponse {
                started: true,
                minutes,
            }),
        )
            .into_response(),
        Ok(false) => (
            StatusCode::CONFLICT,
            Json(SyncResponse {
                started: false,
                minutes,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Switch between the live and history screens
pub async fn select_view(
    Path(view): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let view = match view.parse::<View>() {
        Ok(view) => view,
        Err(message) => return error_body(StatusCode::BAD_REQUEST, message),
    };

    match state.engine.select_view(view).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Attach the recorder; a repeated connect leaves the current link up
pub async fn connect(State(state): State<Arc<AppState>>) -> Response {
    state.device.reconnect();
    match state.engine.connect(Arc::new(state.device.clone())).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Drop the recorder link
pub async fn disconnect(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.disconnect().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Server-sent events carrying every published snapshot
pub async fn live_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut snapshots = state.engine.snapshots();

    let stream = async_stream::stream! {
        loop {
            let snapshot: EngineSnapshot = snapshots.borrow_and_update().clone();
            yield Event::default().event("snapshot").json_data(&snapshot);
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn error_response(error: EngineError) -> Response {
    let status = match &error {
        EngineError::Sync(SyncError::InvalidRange) => StatusCode::BAD_REQUEST,
        EngineError::Sync(SyncError::AlreadySyncing(_)) => StatusCode::CONFLICT,
        EngineError::Sync(SyncError::CommandWrite(_)) | EngineError::Transport(_) => {
            StatusCode::BAD_GATEWAY
        }
        EngineError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
    };
    tracing::warn!("Request failed: {}", error);
    error_body(status, error.to_string())
}

fn error_body(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}
