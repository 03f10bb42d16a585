//! Shared handler state, built once at startup

use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::{Cookie, SameSite};
use chrono::{DateTime, FixedOffset, Utc};

use crate::config::{FingerprintStrategy, IdentityMode, StaticConfig};
use crate::identity::{GoogleProvider, IdentityProvider, SessionStore};
use crate::resolver::TargetResolver;
use crate::sink::{TableRef, TableSink};
use crate::tracking::{
    BotFilter, ClickGate, ClickReporter, Clock, MemoryClickGate, reporting_zone,
};

/// Settings the click pipeline reads on every request.
#[derive(Debug, Clone)]
pub struct TrackingSettings {
    pub strategy: FingerprintStrategy,
    pub token_max_age_secs: u64,
    pub zone: FixedOffset,
}

/// Session cookie attributes
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
    pub max_age: Duration,
}

impl SessionCookie {
    pub fn build(&self, session_id: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), session_id);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        // 必须是 Lax：从 Google 回跳是跨站的顶级导航
        cookie.set_same_site(SameSite::Lax);
        cookie.set_max_age(actix_web::cookie::time::Duration::seconds(
            self.max_age.as_secs() as i64,
        ));
        cookie
    }
}

pub struct AppState {
    pub mode: IdentityMode,
    pub tracking: TrackingSettings,
    pub clock: Arc<dyn Clock>,
    pub gate: Arc<dyn ClickGate>,
    pub bots: BotFilter,
    pub reporter: Arc<ClickReporter>,
    /// `None` unless `lookup.enabled`
    pub resolver: Option<TargetResolver>,
    pub sessions: SessionStore,
    pub cookie: SessionCookie,
    /// `None` unless `identity.mode = "oauth"`
    pub provider: Option<Arc<dyn IdentityProvider>>,
    pub sink_name: &'static str,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire every component from the loaded configuration.
    pub fn new(config: &StaticConfig, sink: Arc<dyn TableSink>, clock: Arc<dyn Clock>) -> Self {
        let tracking = &config.tracking;
        let sink_timeout = Duration::from_secs(tracking.sink_timeout_secs);

        let gate: Arc<dyn ClickGate> = Arc::new(MemoryClickGate::new(
            Duration::from_secs(tracking.effective_window_secs()),
            tracking.expiry,
            Arc::clone(&clock),
        ));

        let reporter = Arc::new(ClickReporter::new(
            Arc::clone(&sink),
            TableRef::new(&config.sink.doc_id, &config.sink.table_id),
            config.sink.columns.clone(),
            sink_timeout,
        ));

        let resolver = config.lookup.enabled.then(|| {
            let (doc_id, table_id) = config.lookup_table();
            TargetResolver::new(
                Arc::clone(&sink),
                TableRef::new(doc_id, table_id),
                &config.lookup,
            )
        });

        let provider = match config.identity.mode {
            IdentityMode::Oauth => Some(Arc::new(GoogleProvider::new(
                config.identity.google.clone(),
                sink_timeout,
            )) as Arc<dyn IdentityProvider>),
            IdentityMode::Query => None,
        };

        let session_ttl = Duration::from_secs(config.identity.session_ttl_secs);

        Self {
            mode: config.identity.mode,
            tracking: TrackingSettings {
                strategy: tracking.strategy,
                token_max_age_secs: tracking.token_max_age_secs,
                zone: reporting_zone(tracking.reporting_utc_offset_hours),
            },
            started_at: clock.utc_now(),
            clock,
            gate,
            bots: BotFilter::new(&tracking.bot_signatures),
            reporter,
            resolver,
            sessions: SessionStore::new(session_ttl),
            cookie: SessionCookie {
                name: config.identity.cookie_name.clone(),
                secure: config.identity.cookie_secure,
                max_age: session_ttl,
            },
            provider,
            sink_name: sink.name(),
        }
    }

    /// Replace the identity provider (custom IdP or tests).
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = SessionCookie {
            name: "soplink_session".into(),
            secure: true,
            max_age: Duration::from_secs(3600),
        }
        .build("abc".into());

        assert_eq!(cookie.name(), "soplink_session");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(
            cookie.max_age(),
            Some(actix_web::cookie::time::Duration::seconds(3600))
        );
    }
}
