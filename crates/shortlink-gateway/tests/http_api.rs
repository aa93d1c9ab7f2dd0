use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use jiff::SignedDuration;
use shortlink_core::{CreatedLink, LinkError, Shortener, StorageError, Token};
use shortlink_gateway::model::{CreateLinkResponse, ErrorResponse};
use shortlink_gateway::{App, AppState};
use shortlink_generator::{HashTokenGenerator, HashTokenGeneratorSettings};
use shortlink_service::{LinkService, LinkServiceSettings};
use shortlink_storage::InMemoryLinkStore;
use tower::ServiceExt;

const PREFIX: &str = "http://localhost:8080/api/v1/url/";

fn app() -> Router {
    let generator =
        HashTokenGenerator::new(HashTokenGeneratorSettings::builder().build()).unwrap();
    let settings = LinkServiceSettings::builder()
        .short_link_prefix(PREFIX)
        .link_ttl(SignedDuration::from_hours(24))
        .build();
    let service = LinkService::new(InMemoryLinkStore::new(), generator, settings).unwrap();

    App::router(AppState::new(Arc::new(service)), Duration::from_secs(5))
}

/// Fails every call with the given storage error.
struct FailingShortener(StorageError);

#[async_trait]
impl Shortener for FailingShortener {
    async fn create_short_link(&self, _original_link: &str) -> Result<CreatedLink, LinkError> {
        Err(LinkError::Storage(self.0.clone()))
    }

    async fn get_full_link(&self, _token: &Token) -> Result<String, LinkError> {
        Err(LinkError::Storage(self.0.clone()))
    }
}

/// Answers every call after `delay`.
struct SlowShortener(Duration);

#[async_trait]
impl Shortener for SlowShortener {
    async fn create_short_link(&self, _original_link: &str) -> Result<CreatedLink, LinkError> {
        tokio::time::sleep(self.0).await;
        Err(LinkError::NotFound)
    }

    async fn get_full_link(&self, _token: &Token) -> Result<String, LinkError> {
        tokio::time::sleep(self.0).await;
        Ok("https://example.com".to_string())
    }
}

fn failing_app(err: StorageError) -> Router {
    App::router(
        AppState::new(Arc::new(FailingShortener(err))),
        Duration::from_secs(5),
    )
}

fn create_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/url")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn assert_error(response: axum::response::Response, status: StatusCode, message: &str) {
    assert_eq!(response.status(), status);
    let body: ErrorResponse = body_json(response).await;
    assert_eq!(body.status, status.as_u16());
    assert_eq!(body.message, message);
}

#[tokio::test]
async fn ping_answers_pong() {
    let response = app().oneshot(get_request("/ping")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: String = body_json(response).await;
    assert_eq!(body, "pong");
}

#[tokio::test]
async fn create_returns_short_link() {
    let response = app()
        .oneshot(create_request(
            r#"{"link": "https://www.example.com/page1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: CreateLinkResponse = body_json(response).await;
    assert_eq!(body.token, "VZvG8PSsrp");
    assert_eq!(
        body.short_link,
        "http://localhost:8080/api/v1/url/VZvG8PSsrp"
    );
}

#[tokio::test]
async fn created_link_redirects_to_original() {
    let app = app();

    let response = app
        .clone()
        .oneshot(create_request(r#"{"link": "https://example.com/a?b=c"}"#))
        .await
        .unwrap();
    let created: CreateLinkResponse = body_json(response).await;

    let response = app
        .oneshot(get_request(&format!("/api/v1/url/{}", created.token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com/a?b=c"
    );
}

#[tokio::test]
async fn unknown_token_is_404() {
    let response = app()
        .oneshot(get_request("/api/v1/url/doesnotexist"))
        .await
        .unwrap();

    assert_error(response, StatusCode::NOT_FOUND, "link not found").await;
}

#[tokio::test]
async fn invalid_url_is_400() {
    let response = app()
        .oneshot(create_request(r#"{"link": "not a url"}"#))
        .await
        .unwrap();

    assert_error(response, StatusCode::BAD_REQUEST, "url is not valid").await;
}

#[tokio::test]
async fn url_with_newline_is_400() {
    let app = app();

    let response = app
        .clone()
        .oneshot(create_request(r#"{"link": "https://example.com/a\nb"}"#))
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "url is not valid").await;

    // The cleaned-up form is a different link and still works end to end.
    let response = app
        .clone()
        .oneshot(create_request(r#"{"link": "https://example.com/ab"}"#))
        .await
        .unwrap();
    let created: CreateLinkResponse = body_json(response).await;
    let response = app
        .oneshot(get_request(&format!("/api/v1/url/{}", created.token)))
        .await
        .unwrap();
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com/ab"
    );
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out_with_504() {
    let app = App::router(
        AppState::new(Arc::new(SlowShortener(Duration::from_secs(10)))),
        Duration::from_millis(500),
    );

    let response = app.oneshot(get_request("/api/v1/url/abc")).await.unwrap();

    assert_error(response, StatusCode::GATEWAY_TIMEOUT, "request timed out").await;
}

#[tokio::test]
async fn malformed_body_is_400() {
    for body in [r#"{"url": "https://example.com"}"#, "not json", r#"{"link": "  "}"#] {
        let response = app().oneshot(create_request(body)).await.unwrap();
        assert_error(response, StatusCode::BAD_REQUEST, "bad request").await;
    }
}

#[tokio::test]
async fn token_conflict_is_409() {
    let response = failing_app(StorageError::Conflict("abc".to_string()))
        .oneshot(create_request(r#"{"link": "https://example.com"}"#))
        .await
        .unwrap();

    assert_error(response, StatusCode::CONFLICT, "unable to create link").await;
}

#[tokio::test]
async fn storage_failure_is_500() {
    let response = failing_app(StorageError::Unavailable("down".to_string()))
        .oneshot(get_request("/api/v1/url/abc"))
        .await
        .unwrap();

    assert_error(
        response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error",
    )
    .await;
}
