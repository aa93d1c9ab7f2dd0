use crate::error::{AppError, Result};
use crate::model::{CreateLinkRequest, CreateLinkResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use shortlink_core::Token;
use tracing::{debug, info};

/// `POST /api/v1/url` with `{"link": "..."}`.
pub async fn create_link_handler(
    State(state): State<AppState>,
    request: std::result::Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<Json<CreateLinkResponse>> {
    let Json(request) = request.map_err(|rejection| {
        debug!(error = %rejection, "rejected create request body");
        AppError::BadRequest
    })?;

    let link = request.link.trim();
    if link.is_empty() {
        return Err(AppError::BadRequest);
    }

    let created = state.shortener().create_short_link(link).await?;
    info!(token = %created.link.token, "short link created");

    Ok(Json(created.into()))
}

/// `GET /api/v1/url/{token}` answers with a `302 Found` to the original URL.
pub async fn redirect_handler(
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let token = Token::new(token);
    let original_link = state.shortener().get_full_link(&token).await?;
    debug!(token = %token, "redirecting");

    Ok((StatusCode::FOUND, [(header::LOCATION, original_link)]))
}
