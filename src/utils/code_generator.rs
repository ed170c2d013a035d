//! Short link id generation.
//!
//! Production ids are 16 random bytes encoded as URL-safe base64 (128 bits
//! of entropy), wide enough that concurrent callers never coordinate and a
//! collision is treated as impossible: there is no check-and-retry loop.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::domain::entities::ShortLinkId;
use crate::error::AppError;
use base64::Engine as _;
use serde_json::json;

/// Length of random bytes before base64 encoding.
const ID_LENGTH_BYTES: usize = 16;

/// Produces fresh short link ids.
#[cfg_attr(test, mockall::automock)]
pub trait ShortLinkIdGenerator: Send + Sync {
    /// Returns a new id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] when no id can be produced (entropy
    /// source failure, or a deterministic generator running out of ids).
    fn generate(&self) -> Result<ShortLinkId, AppError>;
}

/// Cryptographically random id generator backed by `getrandom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomShortLinkIdGenerator;

impl ShortLinkIdGenerator for RandomShortLinkIdGenerator {
    fn generate(&self) -> Result<ShortLinkId, AppError> {
        let mut buffer = [0u8; ID_LENGTH_BYTES];

        getrandom::fill(&mut buffer).map_err(|e| {
            AppError::internal(
                "Failed to generate short link id",
                json!({ "reason": e.to_string() }),
            )
        })?;

        Ok(ShortLinkId::new(
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer),
        ))
    }
}

/// Hands out pre-seeded ids in order and fails once they are used up.
#[derive(Debug, Default)]
pub struct DeterministicShortLinkIdGenerator {
    ids: Mutex<VecDeque<ShortLinkId>>,
}

impl DeterministicShortLinkIdGenerator {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: Mutex::new(ids.into_iter().map(ShortLinkId::new).collect()),
        }
    }

    /// Appends more ids to the queue.
    pub fn add_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(ids.into_iter().map(ShortLinkId::new));
    }
}

impl ShortLinkIdGenerator for DeterministicShortLinkIdGenerator {
    fn generate(&self) -> Result<ShortLinkId, AppError> {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| AppError::internal("No more short link ids available", json!({})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_id_has_expected_length() {
        let id = RandomShortLinkIdGenerator.generate().unwrap();
        assert_eq!(id.as_str().len(), 22);
    }

    #[test]
    fn test_random_id_url_safe_characters() {
        let id = RandomShortLinkIdGenerator.generate().unwrap();
        assert!(
            id.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert!(!id.as_str().contains('='));
    }

    #[test]
    fn test_random_ids_are_unique() {
        let generator = RandomShortLinkIdGenerator;
        let ids: HashSet<_> = (0..1000).map(|_| generator.generate().unwrap()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_deterministic_generator_returns_ids_in_order() {
        let generator = DeterministicShortLinkIdGenerator::new(["first", "second"]);

        assert_eq!(generator.generate().unwrap().as_str(), "first");
        assert_eq!(generator.generate().unwrap().as_str(), "second");
    }

    #[test]
    fn test_deterministic_generator_exhausts() {
        let generator = DeterministicShortLinkIdGenerator::new(["only"]);
        generator.generate().unwrap();

        let err = generator.generate().unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
        assert!(err.to_string().contains("No more short link ids"));

        generator.add_ids(["refill"]);
        assert_eq!(generator.generate().unwrap().as_str(), "refill");
    }
}
