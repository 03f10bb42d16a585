//! Google OAuth 2.0 (authorization code)

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};
use ureq::Agent;
use url::Url;

use super::{Identity, IdentityProvider};
use crate::config::GoogleOAuthConfig;
use crate::errors::{Result, SoplinkError};

const SCOPES: &str = "openid email profile";

pub struct GoogleProvider {
    agent: Agent,
    config: GoogleOAuthConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    name: Option<String>,
}

impl GoogleProvider {
    pub fn new(config: GoogleOAuthConfig, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent, config }
    }

    /// 同步执行，在 spawn_blocking 中调用
    fn exchange_sync(agent: Agent, config: GoogleOAuthConfig, code: String) -> Result<Identity> {
        let token: TokenResponse = agent
            .post(&config.token_url)
            .send_form([
                ("code", code.as_str()),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])?
            .into_body()
            .read_json()?;

        let info: UserInfo = agent
            .get(&config.userinfo_url)
            .header("Authorization", format!("Bearer {}", token.access_token))
            .call()?
            .into_body()
            .read_json()?;

        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| SoplinkError::identity_provider("userinfo response has no email"))?;

        Ok(Identity {
            email,
            name: info.name.unwrap_or_default(),
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str, login_hint: Option<&str>) -> Result<String> {
        let mut url = Url::parse(&self.config.auth_url).map_err(|e| {
            SoplinkError::config(format!(
                "invalid auth_url '{}': {}",
                self.config.auth_url, e
            ))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", SCOPES)
                .append_pair("access_type", "offline")
                .append_pair("state", state);
            if let Some(hint) = login_hint.filter(|h| !h.is_empty()) {
                query.append_pair("login_hint", hint);
            }
        }

        Ok(url.into())
    }

    async fn exchange(&self, code: &str) -> Result<Identity> {
        let agent = self.agent.clone();
        let config = self.config.clone();
        let code = code.to_string();

        let identity = tokio::task::spawn_blocking(move || Self::exchange_sync(agent, config, code))
            .await
            .map_err(|e| SoplinkError::identity_provider(format!("exchange task failed: {}", e)))?
            .inspect_err(|e| warn!("Google code exchange failed: {}", e))?;

        debug!("Google identity resolved: {}", identity.email);
        Ok(identity)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
