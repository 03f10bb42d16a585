use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use tracing::trace;

use crate::api::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: i64,
    pub mode: String,
    pub sink: &'static str,
    pub tracked_fingerprints: usize,
    pub reports_in_flight: usize,
    pub failed_reports: u64,
}

/// Liveness only: upstream sinks are never probed here.
pub struct HealthService;

impl HealthService {
    pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
        trace!("Received health check request");

        let uptime = state.clock.utc_now() - state.started_at;
        HttpResponse::Ok()
            .insert_header(("Cache-Control", "no-store"))
            .json(HealthResponse {
                status: "healthy",
                uptime_secs: uptime.num_seconds().max(0),
                mode: state.mode.to_string(),
                sink: state.sink_name,
                tracked_fingerprints: state.gate.tracked(),
                reports_in_flight: state.reporter.in_flight(),
                failed_reports: state.reporter.failures(),
            })
    }
}

pub fn health_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(HealthService::health_check))
        .route("/health", web::head().to(HealthService::health_check));
}
