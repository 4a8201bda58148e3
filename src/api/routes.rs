use axum::{
    body::Bytes,
    routing::post,
    Router,
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use tower_http::cors::{CorsLayer, Any};
use std::time::Instant;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::api::models::FetchEventsRequest;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/fetch-events", post(fetch_events_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn fetch_events_handler(State(state): State<AppState>, body: Bytes) -> Response {
    info!("Processing fetch-events request");
    let start_time = Instant::now();

    let result = match parse_request(&body) {
        Ok(req) => state.events.fetch_events(req.run_input).await,
        Err(err) => Err(err),
    };

    let elapsed = start_time.elapsed();
    match result {
        Ok(events) => {
            info!(events = events.len(), ?elapsed, "Fetched events");
            Json(events).into_response()
        }
        Err(err) => {
            error!(error = %err, ?elapsed, "Failed to fetch events");
            err.into_response()
        }
    }
}

/// An empty body means "use the default actor input".
fn parse_request(body: &[u8]) -> Result<FetchEventsRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FetchEventsRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| AppError::ConfigError(format!("Invalid request body: {}", e)))
}
