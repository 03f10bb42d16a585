//! 用户身份（OAuth 模式）
//!
//! - `google`: Google 授权码流程
//! - `session`: 会话存储（pending 点击 + 已登录身份）

pub mod google;
pub mod session;

use serde::{Deserialize, Serialize};

pub use google::GoogleProvider;
pub use session::{PendingAuth, SessionData, SessionStore};

use crate::errors::Result;
use crate::tracking::Actor;

/// Authenticated user as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl Identity {
    pub fn actor(&self) -> Actor {
        Actor::new(Some(&self.email), Some(&self.name))
    }
}

/// Authorization-code identity provider.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent page URL the browser is sent to.
    fn authorize_url(&self, state: &str, login_hint: Option<&str>) -> Result<String>;

    /// Exchange an authorization code for the user's identity.
    async fn exchange(&self, code: &str) -> Result<Identity>;

    fn name(&self) -> &'static str;
}
