use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// 指纹策略：决定哪些点击被视为"同一次点击"
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FingerprintStrategy {
    /// actor + SOP key, protects against rapid double submission
    #[default]
    ActorSop,
    /// caller-supplied `ts` token, protects against replays of one redirect URL
    Token,
}

impl FingerprintStrategy {
    pub fn default_window_secs(&self) -> u64 {
        match self {
            Self::ActorSop => 3,
            Self::Token => 60,
        }
    }
}

/// 去重窗口的过期策略
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ExpiryPolicy {
    /// Window measured from first sighting; repeats never extend it.
    #[default]
    Fixed,
    /// Every suppressed repeat pushes the expiry out by another window.
    Sliding,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SinkKind {
    Coda,
    #[default]
    InMemory,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IdentityMode {
    /// `user` / `userName` query parameters are trusted as-is
    #[default]
    Query,
    /// Google OAuth login before the click is recorded
    Oauth,
}

/// 静态配置（从 TOML 加载，启动时构建一次，之后显式传递给各组件）
///
/// - server: 监听地址、worker 数量
/// - logging: 日志配置
/// - tracking: 去重、bot 过滤、时区
/// - sink: 点击日志写入的外部表
/// - lookup: 按 SOP key 查找跳转目标
/// - identity: 用户身份来源
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 点击追踪配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default)]
    pub strategy: FingerprintStrategy,
    /// Unset means the strategy default (3s for actor_sop, 60s for token).
    #[serde(default)]
    pub window_secs: Option<u64>,
    #[serde(default)]
    pub expiry: ExpiryPolicy,
    /// Numeric `ts` tokens older than this are ignored. 0 disables the check.
    #[serde(default = "default_token_max_age_secs")]
    pub token_max_age_secs: u64,
    #[serde(default = "default_reporting_utc_offset_hours")]
    pub reporting_utc_offset_hours: i32,
    #[serde(default = "default_sink_timeout_secs")]
    pub sink_timeout_secs: u64,
    #[serde(default = "default_bot_signatures")]
    pub bot_signatures: Vec<String>,
}

impl TrackingConfig {
    pub fn effective_window_secs(&self) -> u64 {
        self.window_secs
            .unwrap_or_else(|| self.strategy.default_window_secs())
    }
}

/// 外部表（Coda）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    #[serde(default = "default_coda_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub doc_id: String,
    #[serde(default)]
    pub table_id: String,
    #[serde(default)]
    pub columns: ColumnConfig,
}

/// 语义字段 → 列 ID 映射，随部署而定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default = "default_col_sop")]
    pub sop: String,
    #[serde(default = "default_col_sop_name")]
    pub sop_name: String,
    #[serde(default = "default_col_target")]
    pub target: String,
    #[serde(default = "default_col_user")]
    pub user: String,
    #[serde(default = "default_col_user_name")]
    pub user_name: String,
    #[serde(default = "default_col_date")]
    pub date: String,
    #[serde(default = "default_col_time")]
    pub time: String,
}

/// SOP key → target 查找配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Falls back to `sink.doc_id` when empty.
    #[serde(default)]
    pub doc_id: String,
    /// Falls back to `sink.table_id` when empty.
    #[serde(default)]
    pub table_id: String,
    #[serde(default)]
    pub key_column: String,
    #[serde(default)]
    pub target_column: String,
    #[serde(default)]
    pub label_column: Option<String>,
    /// 0 disables the lookup cache.
    #[serde(default = "default_lookup_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

/// 身份来源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub mode: IdentityMode,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,
    #[serde(default)]
    pub google: GoogleOAuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleOAuthConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// e.g. https://links.example.com/auth/google/callback
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default = "default_google_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_google_token_url")]
    pub token_url: String,
    #[serde(default = "default_google_userinfo_url")]
    pub userinfo_url: String,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_token_max_age_secs() -> u64 {
    0
}

fn default_reporting_utc_offset_hours() -> i32 {
    8
}

fn default_sink_timeout_secs() -> u64 {
    5
}

pub fn default_bot_signatures() -> Vec<String> {
    [
        "bot",
        "crawler",
        "spider",
        "slurp",
        "facebookexternalhit",
        "embedly",
        "quora link preview",
        "whatsapp",
        "skypeuripreview",
        "bingpreview",
        "google-inspectiontool",
        "headlesschrome",
        "python-requests",
        "curl/",
        "wget/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_coda_base_url() -> String {
    "https://coda.io/apis/v1".to_string()
}

fn default_col_sop() -> String {
    "c-rhlNSZ2BLc".to_string()
}

fn default_col_sop_name() -> String {
    "c-1Hs9TvZi8D".to_string()
}

fn default_col_target() -> String {
    "c-F0C8ROruiq".to_string()
}

fn default_col_user() -> String {
    "c-Bnd91_0ohs".to_string()
}

fn default_col_user_name() -> String {
    "c-uOLRfDdGlm".to_string()
}

fn default_col_date() -> String {
    "c-9RvcvQbDA4".to_string()
}

fn default_col_time() -> String {
    "c-EWB8bbzx0H".to_string()
}

fn default_lookup_cache_ttl_secs() -> u64 {
    30
}

fn default_session_ttl_secs() -> u64 {
    7 * 24 * 3600
}

fn default_cookie_name() -> String {
    "soplink_session".to_string()
}

fn default_cookie_secure() -> bool {
    true
}

fn default_google_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_google_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_google_userinfo_url() -> String {
    "https://www.googleapis.com/oauth2/v2/userinfo".to_string()
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            workers: default_workers(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            strategy: FingerprintStrategy::default(),
            window_secs: None,
            expiry: ExpiryPolicy::default(),
            token_max_age_secs: default_token_max_age_secs(),
            reporting_utc_offset_hours: default_reporting_utc_offset_hours(),
            sink_timeout_secs: default_sink_timeout_secs(),
            bot_signatures: default_bot_signatures(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            base_url: default_coda_base_url(),
            api_key: String::new(),
            doc_id: String::new(),
            table_id: String::new(),
            columns: ColumnConfig::default(),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            sop: default_col_sop(),
            sop_name: default_col_sop_name(),
            target: default_col_target(),
            user: default_col_user(),
            user_name: default_col_user_name(),
            date: default_col_date(),
            time: default_col_time(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            doc_id: String::new(),
            table_id: String::new(),
            key_column: String::new(),
            target_column: String::new(),
            label_column: None,
            cache_ttl_secs: default_lookup_cache_ttl_secs(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            mode: IdentityMode::default(),
            session_ttl_secs: default_session_ttl_secs(),
            cookie_name: default_cookie_name(),
            cookie_secure: default_cookie_secure(),
            google: GoogleOAuthConfig::default(),
        }
    }
}

impl Default for GoogleOAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            auth_url: default_google_auth_url(),
            token_url: default_google_token_url(),
            userinfo_url: default_google_userinfo_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_strategy_window_defaults() {
        let mut tracking = TrackingConfig::default();
        assert_eq!(tracking.effective_window_secs(), 3);

        tracking.strategy = FingerprintStrategy::Token;
        assert_eq!(tracking.effective_window_secs(), 60);

        tracking.window_secs = Some(10);
        assert_eq!(tracking.effective_window_secs(), 10);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!(
            FingerprintStrategy::from_str("actor_sop").unwrap(),
            FingerprintStrategy::ActorSop
        );
        assert_eq!(
            ExpiryPolicy::from_str("SLIDING").unwrap(),
            ExpiryPolicy::Sliding
        );
        assert_eq!(IdentityMode::Oauth.to_string(), "oauth");
        assert!(SinkKind::from_str("postgres").is_err());
    }
}
