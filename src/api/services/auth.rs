//! OAuth 模式下的点击流程
//!
//! `/` 保存点击并跳转到登录页 → `/auth/google/callback` 换取身份 → `/go` 记录并跳转

use actix_web::http::header::{CACHE_CONTROL, LOCATION};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::redirect::{RedirectService, user_agent};
use crate::api::state::AppState;
use crate::errors::{Result, SoplinkError};
use crate::tracking::{Actor, ClickParams};

pub const CALLBACK_PATH: &str = "/auth/google/callback";
pub const GO_PATH: &str = "/go";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// set by the provider when the user cancels consent
    pub error: Option<String>,
}

fn found(location: &str) -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::Found();
    builder
        .insert_header((LOCATION, location.to_string()))
        .insert_header((CACHE_CONTROL, "no-store"));
    builder
}

fn session_id(req: &HttpRequest, state: &AppState) -> Option<String> {
    req.cookie(&state.cookie.name).map(|c| c.value().to_string())
}

/// 每次使用会话都重新下发 cookie，让浏览器端的过期时间跟服务端的空闲 TTL 一起顺延
fn with_session_cookie(mut response: HttpResponse, state: &AppState, id: String) -> HttpResponse {
    if let Err(e) = response.add_cookie(&state.cookie.build(id)) {
        warn!("Failed to set session cookie: {}", e);
    }
    response
}

pub struct AuthService;

impl AuthService {
    /// `GET /`：已登录直接处理，否则保存点击并跳转到登录页
    pub async fn start(
        req: HttpRequest,
        query: web::Query<ClickParams>,
        state: web::Data<AppState>,
    ) -> Result<HttpResponse> {
        let params = query.into_inner();
        RedirectService::precheck(&state, &params)?;

        // 爬虫和链接预览不走登录，也不创建会话
        let ua = user_agent(&req);
        if state.bots.is_bot(ua) {
            let redirect =
                RedirectService::process_click(&state, &params, Actor::unknown(), ua).await?;
            return Ok(redirect.into_response());
        }

        let cookie_id = session_id(&req, &state);
        let (id, session) = state.sessions.get_or_create(cookie_id.as_deref());

        let identity = session.lock().identity.clone();
        if let Some(identity) = identity {
            session.lock().current = Some(params.clone());
            let redirect =
                RedirectService::process_click(&state, &params, identity.actor(), ua).await?;
            return Ok(with_session_cookie(redirect.into_response(), &state, id));
        }

        let provider = state
            .provider
            .as_ref()
            .ok_or_else(|| SoplinkError::config("identity provider not configured"))?;

        // 链接里的 user 只用来预选账号，记录的身份仍以登录结果为准
        let login_hint = params.user.clone().filter(|u| u.contains('@'));
        let login_state = session.lock().begin_auth(params);
        let login_url = provider.authorize_url(&login_state, login_hint.as_deref())?;
        debug!("Redirecting to {} login", provider.name());

        Ok(found(&login_url).cookie(state.cookie.build(id)).finish())
    }

    /// `GET /auth/google/callback`
    pub async fn callback(
        req: HttpRequest,
        query: web::Query<CallbackQuery>,
        state: web::Data<AppState>,
    ) -> Result<HttpResponse> {
        let query = query.into_inner();
        if let Some(error) = query.error {
            info!("Login cancelled by provider: {}", error);
            return Err(SoplinkError::client_request("Login was cancelled"));
        }
        let (Some(code), Some(returned_state)) = (query.code, query.state) else {
            return Err(SoplinkError::client_request("Missing code or state"));
        };

        let session = session_id(&req, &state)
            .and_then(|id| state.sessions.get(&id))
            .ok_or_else(|| SoplinkError::session("session expired, open the link again"))?;

        let click = session.lock().take_pending(&returned_state).inspect_err(|e| {
            warn!("OAuth callback rejected: {}", e.message());
        })?;

        let provider = state
            .provider
            .as_ref()
            .ok_or_else(|| SoplinkError::config("identity provider not configured"))?;
        let identity = provider.exchange(&code).await?;

        info!("User signed in: {}", identity.email);
        session.lock().complete_auth(identity, click);

        Ok(found(GO_PATH).finish())
    }

    /// `GET /go`：用会话身份处理当前点击
    pub async fn go(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
        let session = session_id(&req, &state)
            .and_then(|id| state.sessions.get(&id).map(|session| (id, session)));
        let Some((id, session)) = session else {
            return Ok(found("/").finish());
        };

        let (identity, current) = {
            let data = session.lock();
            (data.identity.clone(), data.current.clone())
        };
        let Some(identity) = identity else {
            return Ok(found("/").finish());
        };
        let params =
            current.ok_or_else(|| SoplinkError::client_request("No pending click for this session"))?;

        let redirect =
            RedirectService::process_click(&state, &params, identity.actor(), user_agent(&req))
                .await?;
        Ok(with_session_cookie(redirect.into_response(), &state, id))
    }
}

/// Routes for OAuth identity mode
pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(AuthService::start))
        .route(CALLBACK_PATH, web::get().to(AuthService::callback))
        .route(GO_PATH, web::get().to(AuthService::go));
}
