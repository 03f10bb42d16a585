//! Dedup fingerprint derivation

use chrono::{DateTime, Utc};

use super::event::Actor;
use crate::config::FingerprintStrategy;

/// 毫秒时间戳的下限（约 1973 年），小于它的数字按秒处理
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// Key to hand to the click gate.
    Key(String),
    /// `token` strategy without a `ts` parameter.
    MissingToken,
    /// `ts` is a timestamp older than the configured max age.
    ExpiredToken,
}

impl Fingerprint {
    pub fn derive(
        strategy: FingerprintStrategy,
        actor: &Actor,
        sop_key: &str,
        token: Option<&str>,
        token_max_age_secs: u64,
        now: DateTime<Utc>,
    ) -> Self {
        match strategy {
            FingerprintStrategy::ActorSop => Fingerprint::Key(actor_sop_key(&actor.id, sop_key)),
            FingerprintStrategy::Token => match token {
                None => Fingerprint::MissingToken,
                Some(ts) if token_expired(ts, token_max_age_secs, now) => {
                    Fingerprint::ExpiredToken
                }
                Some(ts) => Fingerprint::Key(ts.to_string()),
            },
        }
    }
}

/// actor id 带长度前缀：id 和 SOP key 里都可能出现分隔符
fn actor_sop_key(actor_id: &str, sop_key: &str) -> String {
    format!("{}:{}-{}", actor_id.len(), actor_id, sop_key)
}

/// Only numeric tokens carry an age; opaque tokens never expire.
fn token_expired(token: &str, max_age_secs: u64, now: DateTime<Utc>) -> bool {
    if max_age_secs == 0 {
        return false;
    }
    let Ok(raw) = token.parse::<i64>() else {
        return false;
    };

    // ts 来自调用方，i64::MIN 也必须能处理
    let issued_ms = if raw.unsigned_abs() >= MILLIS_THRESHOLD.unsigned_abs() {
        raw
    } else {
        raw.saturating_mul(1000)
    };
    let age_ms = now.timestamp_millis().saturating_sub(issued_ms);
    age_ms > (max_age_secs as i64).saturating_mul(1000)
}
