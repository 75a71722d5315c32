use axum::response::Response;
use serde::Serialize;

use crate::helpers::respond_success;

/// The service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "conferenti-admin-api";

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    service: &'static str,
}

/// Reports that the service is up. No token required.
pub async fn check() -> Response {
    respond_success(
        Health {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            service: SERVICE_NAME,
        },
        Some("Conferenti Admin Api is Healthy"),
    )
}
