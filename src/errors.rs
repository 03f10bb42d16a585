use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

#[derive(Debug, Clone)]
pub enum SoplinkError {
    /// 请求参数缺失或非法 → 400
    ClientRequest(String),
    /// SOP key 在表中不存在 → 404
    NotFound(String),
    /// 解析跳转目标时外部表不可用 → 500（fail closed）
    UpstreamLookup(String),
    /// 写点击日志失败（fail open，不会返回给用户）
    UpstreamLog(String),
    IdentityProvider(String),
    Session(String),
    Config(String),
    Serialization(String),
    Io(String),
}

impl SoplinkError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            SoplinkError::ClientRequest(_) => "E101",
            SoplinkError::NotFound(_) => "E102",
            SoplinkError::UpstreamLookup(_) => "E103",
            SoplinkError::UpstreamLog(_) => "E104",
            SoplinkError::IdentityProvider(_) => "E105",
            SoplinkError::Session(_) => "E106",
            SoplinkError::Config(_) => "E107",
            SoplinkError::Serialization(_) => "E108",
            SoplinkError::Io(_) => "E109",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            SoplinkError::ClientRequest(_) => "Bad Request",
            SoplinkError::NotFound(_) => "SOP Not Found",
            SoplinkError::UpstreamLookup(_) => "Upstream Lookup Error",
            SoplinkError::UpstreamLog(_) => "Upstream Log Error",
            SoplinkError::IdentityProvider(_) => "Identity Provider Error",
            SoplinkError::Session(_) => "Session Error",
            SoplinkError::Config(_) => "Configuration Error",
            SoplinkError::Serialization(_) => "Serialization Error",
            SoplinkError::Io(_) => "IO Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            SoplinkError::ClientRequest(msg)
            | SoplinkError::NotFound(msg)
            | SoplinkError::UpstreamLookup(msg)
            | SoplinkError::UpstreamLog(msg)
            | SoplinkError::IdentityProvider(msg)
            | SoplinkError::Session(msg)
            | SoplinkError::Config(msg)
            | SoplinkError::Serialization(msg)
            | SoplinkError::Io(msg) => msg,
        }
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    /// Text shown to the browser. Upstream details stay in the logs.
    fn public_body(&self) -> &str {
        match self {
            SoplinkError::ClientRequest(msg) | SoplinkError::Session(msg) => msg,
            SoplinkError::NotFound(_) => "Not Found",
            SoplinkError::IdentityProvider(_) => "Login failed, please retry the link",
            _ => "Internal Server Error",
        }
    }
}

impl fmt::Display for SoplinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for SoplinkError {}

impl ResponseError for SoplinkError {
    fn status_code(&self) -> StatusCode {
        match self {
            SoplinkError::ClientRequest(_) | SoplinkError::Session(_) => StatusCode::BAD_REQUEST,
            SoplinkError::NotFound(_) => StatusCode::NOT_FOUND,
            SoplinkError::IdentityProvider(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(("Content-Type", "text/plain; charset=utf-8"))
            .insert_header(("Cache-Control", "no-store"))
            .body(self.public_body().to_string())
    }
}

// 便捷的构造函数
impl SoplinkError {
    pub fn client_request<T: Into<String>>(msg: T) -> Self {
        SoplinkError::ClientRequest(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        SoplinkError::NotFound(msg.into())
    }

    pub fn upstream_lookup<T: Into<String>>(msg: T) -> Self {
        SoplinkError::UpstreamLookup(msg.into())
    }

    pub fn upstream_log<T: Into<String>>(msg: T) -> Self {
        SoplinkError::UpstreamLog(msg.into())
    }

    pub fn identity_provider<T: Into<String>>(msg: T) -> Self {
        SoplinkError::IdentityProvider(msg.into())
    }

    pub fn session<T: Into<String>>(msg: T) -> Self {
        SoplinkError::Session(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        SoplinkError::Config(msg.into())
    }
}

impl From<std::io::Error> for SoplinkError {
    fn from(err: std::io::Error) -> Self {
        SoplinkError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SoplinkError {
    fn from(err: serde_json::Error) -> Self {
        SoplinkError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for SoplinkError {
    fn from(err: config::ConfigError) -> Self {
        SoplinkError::Config(err.to_string())
    }
}

// ureq 只在身份提供方直接使用，sink 走 anyhow
impl From<ureq::Error> for SoplinkError {
    fn from(err: ureq::Error) -> Self {
        SoplinkError::IdentityProvider(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SoplinkError>;
