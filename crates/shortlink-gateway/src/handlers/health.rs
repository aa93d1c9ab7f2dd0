use axum::Json;

pub async fn ping_handler() -> Json<&'static str> {
    Json("pong")
}
