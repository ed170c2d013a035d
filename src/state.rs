use std::sync::Arc;

use crate::application::services::{MagicLinkRenewalService, ShortLinkService};
use crate::domain::unit_of_work::UnitOfWorkPerformer;

/// Shared handler state. Every field is behind an `Arc`, cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub uow_performer: Arc<dyn UnitOfWorkPerformer>,
    pub short_link_service: Arc<ShortLinkService>,
    pub renewal_service: Arc<MagicLinkRenewalService>,
}

impl AppState {
    pub fn new(
        uow_performer: Arc<dyn UnitOfWorkPerformer>,
        short_link_service: Arc<ShortLinkService>,
        renewal_service: Arc<MagicLinkRenewalService>,
    ) -> Self {
        Self {
            uow_performer,
            short_link_service,
            renewal_service,
        }
    }
}
