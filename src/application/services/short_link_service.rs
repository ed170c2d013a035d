//! Short link creation and resolution service.

use std::sync::Arc;

use serde_json::json;
use url::Url;

use crate::domain::clock::Clock;
use crate::domain::entities::{ShortLink, ShortLinkId};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkPerformer, finish};
use crate::error::AppError;
use crate::utils::code_generator::ShortLinkIdGenerator;

/// Service turning long token-bearing URLs into compact redeemable ids.
///
/// Long URLs are stored verbatim: `resolve(shorten(u)) == u`.
pub struct ShortLinkService {
    uow_performer: Arc<dyn UnitOfWorkPerformer>,
    id_generator: Arc<dyn ShortLinkIdGenerator>,
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl ShortLinkService {
    pub fn new(
        uow_performer: Arc<dyn UnitOfWorkPerformer>,
        id_generator: Arc<dyn ShortLinkIdGenerator>,
        clock: Arc<dyn Clock>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            uow_performer,
            id_generator,
            clock,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Stores `long_url` under a fresh id inside `uow` and returns the short URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `long_url` is not an absolute http(s) URL.
    /// Returns [`AppError::Internal`] if the id generator is exhausted.
    /// Returns [`AppError::Conflict`] if the generated id is already taken.
    pub async fn shorten(&self, uow: &dyn UnitOfWork, long_url: &str) -> Result<String, AppError> {
        validate_long_url(long_url)?;

        let id = self.id_generator.generate()?;
        let short_link = ShortLink::new(id, long_url.to_string(), self.clock.now());
        uow.short_links().save(&short_link).await?;

        tracing::debug!(short_link_id = %short_link.id, "Short link created");
        Ok(self.short_url(&short_link.id))
    }

    /// Returns the long URL stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no short link has this id.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn resolve(&self, id: &str) -> Result<String, AppError> {
        let uow = self.uow_performer.begin().await?;
        let outcome = Self::find_long_url(uow.as_ref(), &ShortLinkId::from(id)).await;
        finish(uow, outcome).await
    }

    /// Builds `{base_url}/api/to/{id}`.
    pub fn short_url(&self, id: &ShortLinkId) -> String {
        format!("{}/api/to/{}", self.base_url, id)
    }

    async fn find_long_url(uow: &dyn UnitOfWork, id: &ShortLinkId) -> Result<String, AppError> {
        uow.short_links()
            .get_by_id(id)
            .await?
            .map(|short_link| short_link.long_url)
            .ok_or_else(|| {
                AppError::not_found("short link not found", json!({ "short_link_id": id }))
            })
    }
}

fn validate_long_url(long_url: &str) -> Result<(), AppError> {
    let parsed = Url::parse(long_url).map_err(|e| {
        AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::bad_request(
            "Only HTTP and HTTPS URLs can be shortened",
            json!({ "scheme": scheme }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{
        Ending, MockedPerformer, MockedUnitOfWork, ending_of,
    };
    use crate::domain::clock::FixedClock;
    use crate::utils::code_generator::{DeterministicShortLinkIdGenerator, MockShortLinkIdGenerator};
    use chrono::Utc;

    fn service(
        performer: MockedPerformer,
        generator: Arc<dyn ShortLinkIdGenerator>,
    ) -> ShortLinkService {
        ShortLinkService::new(
            Arc::new(performer),
            generator,
            Arc::new(FixedClock(Utc::now())),
            "https://immersion.example.com/",
        )
    }

    #[tokio::test]
    async fn test_shorten_saves_and_returns_short_url() {
        let mut uow = MockedUnitOfWork::new();
        uow.short_links
            .expect_save()
            .withf(|link| {
                link.id.as_str() == "abc123" && link.long_url == "https://front.example.com/x?jwt=t"
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = service(
            MockedPerformer::unused(),
            Arc::new(DeterministicShortLinkIdGenerator::new(["abc123"])),
        );

        let short_url = service
            .shorten(&uow, "https://front.example.com/x?jwt=t")
            .await
            .unwrap();

        assert_eq!(short_url, "https://immersion.example.com/api/to/abc123");
    }

    #[tokio::test]
    async fn test_shorten_rejects_non_http_url() {
        let mut uow = MockedUnitOfWork::new();
        uow.short_links.expect_save().times(0);

        let mut generator = MockShortLinkIdGenerator::new();
        generator.expect_generate().times(0);

        let service = service(MockedPerformer::unused(), Arc::new(generator));

        for url in ["not-a-url", "javascript:alert(1)"] {
            let err = service.shorten(&uow, url).await.unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }));
        }
    }

    #[tokio::test]
    async fn test_shorten_fails_when_generator_exhausted() {
        let mut uow = MockedUnitOfWork::new();
        uow.short_links.expect_save().times(0);

        let service = service(
            MockedPerformer::unused(),
            Arc::new(DeterministicShortLinkIdGenerator::default()),
        );

        let err = service
            .shorten(&uow, "https://front.example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_resolve_returns_long_url() {
        let mut uow = MockedUnitOfWork::new();
        uow.short_links
            .expect_get_by_id()
            .withf(|id| id.as_str() == "abc123")
            .times(1)
            .returning(|id| {
                Ok(Some(ShortLink::new(
                    id.clone(),
                    "https://front.example.com/long".to_string(),
                    Utc::now(),
                )))
            });
        let ending = uow.ending();

        let service = service(
            MockedPerformer::new(uow),
            Arc::new(DeterministicShortLinkIdGenerator::default()),
        );

        assert_eq!(
            service.resolve("abc123").await.unwrap(),
            "https://front.example.com/long"
        );
        assert_eq!(ending_of(&ending), Some(Ending::Committed));
    }

    #[tokio::test]
    async fn test_resolve_unknown_id_is_not_found() {
        let mut uow = MockedUnitOfWork::new();
        uow.short_links
            .expect_get_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = service(
            MockedPerformer::new(uow),
            Arc::new(DeterministicShortLinkIdGenerator::default()),
        );

        let err = service.resolve("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(err.message(), "short link not found");
    }
}
