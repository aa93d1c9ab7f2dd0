use crate::token::Token;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored mapping from a token to the URL it shortens.
///
/// Links are never updated in place. They are created once and later removed,
/// either by the reconciler or by the backend's own TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// The original URL that was shortened.
    pub original_link: String,
    /// Token derived from `original_link`.
    pub token: Token,
    /// When the mapping stops resolving.
    pub expires_at: Timestamp,
}

impl Link {
    /// Whether the link is expired at `now`.
    ///
    /// A link is live strictly before `expires_at`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// The externally visible short link for this mapping.
    pub fn short_link(&self, prefix: &str) -> String {
        self.token.to_url(prefix)
    }
}

/// A link together with its display URL, as returned to callers on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedLink {
    pub link: Link,
    pub short_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn link(expires_at: Timestamp) -> Link {
        Link {
            original_link: "https://example.com".to_string(),
            token: Token::new("abc"),
            expires_at,
        }
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let at = Timestamp::from_second(100).unwrap();
        let link = link(at);

        assert!(!link.is_expired_at(at - SignedDuration::from_millis(1)));
        assert!(link.is_expired_at(at));
        assert!(link.is_expired_at(at + SignedDuration::from_secs(1)));
    }

    #[test]
    fn short_link_uses_prefix() {
        let link = link(Timestamp::from_second(100).unwrap());
        assert_eq!(link.short_link("http://sh.rt/"), "http://sh.rt/abc");
    }
}
