//! Rate limiting middleware using token bucket algorithm.
//!
//! Applied to the renewal endpoint only: each accepted request sends emails,
//! so it is the one route worth throttling per client.

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Replenishment period of one renewal request, in seconds.
const RENEWAL_PERIOD_SECONDS: u64 = 6;
const RENEWAL_BURST: u32 = 10;

/// Rate limiter keyed by the socket peer address.
///
/// # Limits
///
/// - **Rate**: 1 request every 6 seconds
/// - **Burst**: 10 requests
///
/// Requests exceeding the limit receive `429 Too Many Requests`. The router
/// must be served with `into_make_service_with_connect_info::<SocketAddr>`.
pub fn layer() -> GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>
{
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(RENEWAL_PERIOD_SECONDS)
            .burst_size(RENEWAL_BURST)
            .finish()
            .expect("renewal quota is non-zero"),
    );

    GovernorLayer::new(governor_conf)
}

/// Same limits as [`layer`], keyed by the client IP announced by a trusted
/// reverse proxy (`X-Forwarded-For`, `X-Real-IP`, `Forwarded`), falling back
/// to the peer address.
pub fn proxied_layer()
-> GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(RENEWAL_PERIOD_SECONDS)
            .burst_size(RENEWAL_BURST)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("renewal quota is non-zero"),
    );

    GovernorLayer::new(governor_conf)
}
