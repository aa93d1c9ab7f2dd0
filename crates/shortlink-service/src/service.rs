use crate::error::ServiceConfigError;
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use shortlink_core::{
    Clock, CreatedLink, InvalidUrlReason, Link, LinkError, LinkRepository, ReverseLookup,
    Shortener, SystemClock, Token,
};
use shortlink_generator::TokenGenerator;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

/// Settings shared by every call of a [`LinkService`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct LinkServiceSettings {
    /// Prepended to a token to form the short link, e.g. `http://localhost:8080/api/v1/url/`.
    #[builder(setter(into))]
    pub short_link_prefix: String,
    /// How long a new link stays live.
    pub link_ttl: SignedDuration,
}

/// Creates and resolves short links against any [`LinkRepository`].
///
/// The service holds no locks and no per-call state. When the repository
/// supports lookup by original URL, creating the same link twice returns the
/// first mapping. Otherwise every call writes a new record.
///
/// Two concurrent creations of the same URL may both miss the lookup and
/// both write. What happens then is up to the backend: the relational store
/// rejects the second insert with `Conflict`, the key-value store keeps the
/// last write.
#[derive(Debug, Clone)]
pub struct LinkService<R, G, C = SystemClock> {
    repository: Arc<R>,
    generator: Arc<G>,
    clock: C,
    short_link_prefix: String,
    link_ttl: SignedDuration,
}

impl<R: LinkRepository, G: TokenGenerator> LinkService<R, G> {
    pub fn new(
        repository: R,
        generator: G,
        settings: LinkServiceSettings,
    ) -> Result<Self, ServiceConfigError> {
        Self::with_clock(repository, generator, settings, SystemClock)
    }
}

impl<R: LinkRepository, G: TokenGenerator, C: Clock> LinkService<R, G, C> {
    /// Creates a service that stamps expiry times from `clock`.
    pub fn with_clock(
        repository: R,
        generator: G,
        settings: LinkServiceSettings,
        clock: C,
    ) -> Result<Self, ServiceConfigError> {
        if !settings.link_ttl.is_positive() {
            return Err(ServiceConfigError::ZeroTtl);
        }

        let capabilities = repository.capabilities();
        if !capabilities.reverse_lookup {
            warn!("repository cannot look links up by original url, creation is not idempotent");
        }

        Ok(Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            clock,
            short_link_prefix: settings.short_link_prefix,
            link_ttl: settings.link_ttl,
        })
    }

    pub fn short_link_prefix(&self) -> &str {
        &self.short_link_prefix
    }

    /// Accepts absolute URLs the parser takes verbatim. Tabs and newlines are
    /// dropped by the parser but would stay in the stored link.
    fn validate_url(original_link: &str) -> Result<(), LinkError> {
        let invalid = |source: InvalidUrlReason| LinkError::InvalidUrl {
            input: original_link.to_string(),
            source,
        };

        if original_link.chars().any(|c| c.is_ascii_control()) {
            return Err(invalid(InvalidUrlReason::ControlCharacter));
        }

        url::Url::parse(original_link)
            .map(|_| ())
            .map_err(|e| invalid(e.into()))
    }

    fn created(&self, link: Link) -> CreatedLink {
        let short_link = link.short_link(&self.short_link_prefix);
        CreatedLink { link, short_link }
    }

    async fn find_existing(&self, original_link: &str) -> Result<Option<Link>, LinkError> {
        if !self.repository.capabilities().reverse_lookup {
            return Ok(None);
        }

        match self.repository.get_by_original(original_link).await? {
            ReverseLookup::Found(link) => Ok(Some(link)),
            ReverseLookup::Missing => Ok(None),
            ReverseLookup::Unsupported => {
                debug!(
                    original_link,
                    "reverse lookup unsupported by repository, creating a new link"
                );
                Ok(None)
            }
        }
    }

    /// Returns a short link for `original_link`, reusing a live mapping when
    /// the repository can find one.
    pub async fn create_short_link(&self, original_link: &str) -> Result<CreatedLink, LinkError> {
        Self::validate_url(original_link)?;

        let token = self.generator.generate(original_link);

        if let Some(existing) = self.find_existing(original_link).await? {
            debug!(token = %existing.token, "reusing live link");
            return Ok(self.created(existing));
        }

        let now = self.clock.now();
        let link = Link {
            original_link: original_link.to_string(),
            token,
            expires_at: now.checked_add(self.link_ttl).unwrap_or(Timestamp::MAX),
        };

        self.repository.store(&link).await?;
        debug!(token = %link.token, expires_at = %link.expires_at, "created link");

        Ok(self.created(link))
    }

    /// Resolves `token` to the URL it shortens.
    pub async fn get_full_link(&self, token: &Token) -> Result<String, LinkError> {
        trace!(token = %token, "resolving link");

        match self.repository.get_by_token(token).await? {
            Some(link) => Ok(link.original_link),
            None => Err(LinkError::NotFound),
        }
    }
}

#[async_trait]
impl<R: LinkRepository, G: TokenGenerator, C: Clock> Shortener for LinkService<R, G, C> {
    async fn create_short_link(&self, original_link: &str) -> Result<CreatedLink, LinkError> {
        LinkService::create_short_link(self, original_link).await
    }

    async fn get_full_link(&self, token: &Token) -> Result<String, LinkError> {
        LinkService::get_full_link(self, token).await
    }
}
