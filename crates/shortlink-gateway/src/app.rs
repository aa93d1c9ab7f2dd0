use std::time::Duration;

use axum::http::StatusCode;
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::handlers::{create_link_handler, ping_handler, redirect_handler};
use crate::state::AppState;

/// Path under which short links resolve. The default short-link prefix ends with it.
pub const LINK_PATH: &str = "/api/v1/url";

pub struct App {}

impl App {
    /// Builds the router. Requests running longer than `request_timeout` are
    /// answered with 504 and their in-flight backend call is dropped.
    pub fn router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/ping", get(ping_handler))
            .route(LINK_PATH, post(create_link_handler))
            .route(&format!("{LINK_PATH}/{{token}}"), get(redirect_handler))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                request_timeout,
            ))
            .layer(map_response(timeout_body))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// The timeout layer answers with an empty body; give it the usual error shape.
async fn timeout_body(response: Response) -> Response {
    if response.status() == StatusCode::GATEWAY_TIMEOUT {
        return AppError::Timeout.into_response();
    }
    response
}
