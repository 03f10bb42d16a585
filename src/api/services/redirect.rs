//! Redirect-and-log
//!
//! 每个请求只会走到以下结果之一：
//! - 参数错误 / SOP 不存在 / 查询失败 → 错误响应，不跳转
//! - 爬虫 → 307，不去重不记录
//! - 重复点击、缺少或过期的 token → 302，不记录
//! - 首次点击 → 302，后台写入一行

use actix_web::http::StatusCode;
use actix_web::http::header::{CACHE_CONTROL, LOCATION, USER_AGENT};
use actix_web::{HttpRequest, HttpResponse, web};
use strum::AsRefStr;
use tracing::{debug, info};

use crate::api::state::AppState;
use crate::errors::{Result, SoplinkError};
use crate::tracking::{Actor, ClickEvent, ClickParams, Fingerprint};
use crate::utils::normalize_target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ClickOutcome {
    BotPassthrough,
    DuplicatePassthrough,
    /// token strategy without a usable `ts`
    Untracked,
    Logged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub outcome: ClickOutcome,
}

impl Redirect {
    pub fn status(&self) -> StatusCode {
        match self.outcome {
            ClickOutcome::BotPassthrough => StatusCode::TEMPORARY_REDIRECT,
            _ => StatusCode::FOUND,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::build(self.status())
            .insert_header((LOCATION, self.location))
            .insert_header((CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Target and canonical SOP for one click.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedClick {
    sop_key: String,
    sop_label: Option<String>,
    target: String,
}

pub struct RedirectService;

impl RedirectService {
    /// `GET /` in query-identity mode
    pub async fn handle_track(
        req: HttpRequest,
        query: web::Query<ClickParams>,
        state: web::Data<AppState>,
    ) -> Result<HttpResponse> {
        let params = query.into_inner();
        let actor = params.query_actor();
        let redirect = Self::process_click(&state, &params, actor, user_agent(&req)).await?;
        Ok(redirect.into_response())
    }

    /// Cheap checks done before anything else, also used before an OAuth round trip.
    pub fn precheck(state: &AppState, params: &ClickParams) -> Result<()> {
        if params.sop().is_none() {
            return Err(SoplinkError::client_request("Missing sop parameter"));
        }
        if params.raw_target().is_none() && state.resolver.is_none() {
            return Err(SoplinkError::client_request("Missing target URL"));
        }
        Ok(())
    }

    /// Run one click through resolution, bot filter, dedup and reporting.
    pub async fn process_click(
        state: &AppState,
        params: &ClickParams,
        actor: Actor,
        user_agent: Option<&str>,
    ) -> Result<Redirect> {
        Self::precheck(state, params)?;
        let click = Self::resolve(state, params).await?;

        if state.bots.is_bot(user_agent) {
            debug!(
                "Bot passthrough: sop={} ua={}",
                click.sop_key,
                user_agent.unwrap_or_default()
            );
            return Ok(Self::finish(click, ClickOutcome::BotPassthrough, None));
        }

        let fingerprint = Fingerprint::derive(
            state.tracking.strategy,
            &actor,
            &click.sop_key,
            params.token(),
            state.tracking.token_max_age_secs,
            state.clock.utc_now(),
        );

        let key = match fingerprint {
            Fingerprint::Key(key) => key,
            skipped => {
                info!(
                    "Click not recorded ({:?}): sop={} actor={}",
                    skipped, click.sop_key, actor.id
                );
                return Ok(Self::finish(click, ClickOutcome::Untracked, None));
            }
        };

        if !state.gate.try_acquire(&key) {
            return Ok(Self::finish(
                click,
                ClickOutcome::DuplicatePassthrough,
                Some(&key),
            ));
        }

        let event = ClickEvent::new(
            &click.sop_key,
            click.sop_label.as_deref(),
            &click.target,
            &actor,
            state.clock.utc_now(),
            state.tracking.zone,
        );
        // 不等待写入结果
        let _ = state.reporter.report(event);

        Ok(Self::finish(click, ClickOutcome::Logged, Some(&key)))
    }

    async fn resolve(state: &AppState, params: &ClickParams) -> Result<ResolvedClick> {
        let sop = params
            .sop()
            .ok_or_else(|| SoplinkError::client_request("Missing sop parameter"))?;

        if let Some(raw) = params.raw_target() {
            return Ok(ResolvedClick {
                sop_key: sop.to_string(),
                sop_label: params.sop_name().map(String::from),
                target: normalize_target(raw)?,
            });
        }

        let resolver = state
            .resolver
            .as_ref()
            .ok_or_else(|| SoplinkError::client_request("Missing target URL"))?;
        let row = resolver.resolve(sop).await?;

        // 表里的目标同样要求 http/https；非法目标视为数据源问题
        let target = normalize_target(&row.target).map_err(|e| {
            SoplinkError::upstream_lookup(format!("SOP '{}' has an unusable target: {}", row.key, e))
        })?;

        Ok(ResolvedClick {
            sop_label: row.label.or_else(|| params.sop_name().map(String::from)),
            sop_key: row.key,
            target,
        })
    }

    fn finish(click: ResolvedClick, outcome: ClickOutcome, fingerprint: Option<&str>) -> Redirect {
        info!(
            outcome = outcome.as_ref(),
            fingerprint = fingerprint.unwrap_or("-"),
            "Redirect sop={} -> {}",
            click.sop_key,
            click.target
        );
        Redirect {
            location: click.target,
            outcome,
        }
    }
}

pub fn user_agent(req: &HttpRequest) -> Option<&str> {
    req.headers().get(USER_AGENT).and_then(|h| h.to_str().ok())
}

/// Tracking route for query-identity mode
pub fn redirect_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(RedirectService::handle_track));
}
