mod common;

use std::sync::Arc;

#[tokio::test]
async fn test_health_endpoint_success() {
    let server = common::test_server(Arc::new(common::seeded_performer()));

    let response = server.get("/health").await;

    response.assert_status_ok();

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["database"]["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_endpoint_reports_unavailable_database() {
    let server = common::test_server(Arc::new(common::UnavailablePerformer));

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), 503);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["database"]["status"], "error");
}
