use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use shortlink_core::CreatedLink;

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub link: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLinkResponse {
    pub short_link: String,
    pub token: String,
    pub expires_at: Timestamp,
}

impl From<CreatedLink> for CreateLinkResponse {
    fn from(created: CreatedLink) -> Self {
        Self {
            short_link: created.short_link,
            token: created.link.token.into_string(),
            expires_at: created.link.expires_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}
