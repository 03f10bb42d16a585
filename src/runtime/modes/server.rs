//! Server mode
//!
//! actix-web 自带 SIGINT/SIGTERM 处理：收到信号后停止接收新连接并等待
//! 进行中的请求，之后再等待后台的点击写入。

use std::time::Duration;

use actix_web::{App, HttpServer, web};
use anyhow::{Context, Result};
use tracing::info;

use crate::api::{self, middleware::RequestIdMiddleware};
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// Run the HTTP server until a shutdown signal arrives.
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: StaticConfig) -> Result<()> {
    let state = web::Data::new(lifetime::startup::prepare_server_startup(&config)?);
    let mode = state.mode;

    let workers = config.server.workers.clamp(1, 32);
    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    info!("Using {} workers for the server", workers);

    let app_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .app_data(app_state.clone())
            .configure(api::configure(mode))
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(5000))
    .shutdown_timeout(10)
    .workers(workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?;

    info!("Starting server at http://{} ({} mode)", bind_address, mode);
    server.run().await.context("HTTP server error")?;

    info!("Server stopped, flushing click log...");
    lifetime::shutdown::finish_pending_reports(&state.reporter).await;
    Ok(())
}
