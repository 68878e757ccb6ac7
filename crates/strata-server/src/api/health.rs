//! `GET /health` (spec §6).

use actix_web::{get, web, HttpResponse};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: String,
    service: &'static str,
    version: &'static str,
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthBody {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: "strata-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[get("/metrics")]
pub async fn metrics() -> HttpResponse {
    use prometheus::{Encoder, TextEncoder};
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok().content_type(encoder.format_type()).body(buffer)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(metrics);
}
