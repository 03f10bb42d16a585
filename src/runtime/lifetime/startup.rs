//! Server startup: build every component from the static configuration

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::AppState;
use crate::config::{IdentityMode, SinkKind, StaticConfig};
use crate::sink::create_sink;
use crate::tracking::SystemClock;

pub fn prepare_server_startup(config: &StaticConfig) -> Result<AppState> {
    config
        .validate()
        .context("Configuration validation failed")?;

    let tracking = &config.tracking;
    let sink = create_sink(&config.sink, tracking.sink_timeout_secs);

    if config.sink.kind == SinkKind::InMemory {
        warn!("Using in-memory sink: clicks are only written to the log");
    }
    info!(
        "Click sink: {} ({}/{})",
        sink.name(),
        config.sink.doc_id,
        config.sink.table_id
    );
    info!(
        "Dedup: strategy={} window={}s expiry={}",
        tracking.strategy,
        tracking.effective_window_secs(),
        tracking.expiry
    );
    if config.lookup.enabled {
        let (doc_id, table_id) = config.lookup_table();
        info!(
            "SOP lookup enabled: {}/{} (cache {}s)",
            doc_id, table_id, config.lookup.cache_ttl_secs
        );
    }
    match config.identity.mode {
        IdentityMode::Query => info!("Identity from query parameters"),
        IdentityMode::Oauth => info!(
            "Identity from Google OAuth, callback {}",
            config.identity.google.redirect_uri
        ),
    }

    Ok(AppState::new(config, sink, Arc::new(SystemClock)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_config_starts() {
        let state = prepare_server_startup(&StaticConfig::default()).unwrap();
        assert_eq!(state.sink_name, "in_memory");
        assert!(state.resolver.is_none());
        assert!(state.provider.is_none());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = StaticConfig::default();
        config.sink.kind = SinkKind::Coda;
        assert!(prepare_server_startup(&config).is_err());
    }
}
