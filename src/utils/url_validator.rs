//! 跳转目标校验
//!
//! 只允许 http/https，阻止危险协议；兼容被二次编码的 target 参数

use std::borrow::Cow;

use url::Url;

use crate::errors::SoplinkError;

#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    InvalidProtocol(String),
    DangerousProtocol(String),
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "target URL cannot be empty"),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http:// and https:// are allowed",
                proto
            ),
            Self::DangerousProtocol(proto) => {
                write!(f, "Dangerous protocol blocked: {}", proto)
            }
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

impl From<UrlValidationError> for SoplinkError {
    fn from(e: UrlValidationError) -> Self {
        SoplinkError::client_request(e.to_string())
    }
}

const DANGEROUS_PROTOCOLS: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// Undo one extra layer of percent-encoding.
///
/// The query string is decoded once by the framework; links built by
/// spreadsheets are often encoded twice, leaving `https%3A%2F%2F...`.
fn decode_extra_layer(raw: &str) -> Cow<'_, str> {
    if raw.contains("://") {
        return Cow::Borrowed(raw);
    }
    match urlencoding::decode(raw) {
        Ok(decoded) if decoded.contains("://") => Cow::Owned(decoded.into_owned()),
        _ => Cow::Borrowed(raw),
    }
}

/// Normalize and validate a redirect target.
pub fn normalize_target(raw: &str) -> Result<String, UrlValidationError> {
    let decoded = decode_extra_layer(raw.trim());
    let url = decoded.trim();

    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let url_lower = url.to_lowercase();
    if let Some(proto) = DANGEROUS_PROTOCOLS
        .iter()
        .find(|proto| url_lower.starts_with(*proto))
    {
        return Err(UrlValidationError::DangerousProtocol(proto.to_string()));
    }

    if !url_lower.starts_with("http://") && !url_lower.starts_with("https://") {
        let proto = url_lower
            .split(':')
            .next()
            .map(|s| format!("{}:", s))
            .unwrap_or_default();
        return Err(UrlValidationError::InvalidProtocol(proto));
    }

    // Url::parse 会悄悄去掉 tab/换行，但原样返回的字符串要能写进 Location 头
    if url.chars().any(char::is_control) {
        return Err(UrlValidationError::InvalidFormat(
            "control characters in URL".to_string(),
        ));
    }

    Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_targets_unchanged() {
        assert_eq!(
            normalize_target("https://example.com/doc?x=1").unwrap(),
            "https://example.com/doc?x=1"
        );
        assert_eq!(
            normalize_target("  http://localhost:8080 ").unwrap(),
            "http://localhost:8080"
        );
        // 已解码的 URL 中保留的 %2F 不再解码
        assert_eq!(
            normalize_target("https://example.com/a%2Fb").unwrap(),
            "https://example.com/a%2Fb"
        );
    }

    #[test]
    fn test_double_encoded_target() {
        assert_eq!(
            normalize_target("https%3A%2F%2Fexample.com%2Fdoc%3Fid%3D7").unwrap(),
            "https://example.com/doc?id=7"
        );
    }

    #[test]
    fn test_dangerous_protocols() {
        assert!(matches!(
            normalize_target("javascript:alert(1)"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            normalize_target("data:text/html,<script>alert(1)</script>"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
    }

    #[test]
    fn test_invalid_targets() {
        assert!(matches!(
            normalize_target("ftp://example.com"),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
        assert!(matches!(
            normalize_target("example.com/doc"),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
        assert_eq!(normalize_target("  "), Err(UrlValidationError::EmptyUrl));
        assert!(matches!(
            normalize_target("http://"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_control_characters_rejected() {
        for raw in [
            "https://example.com/a\nb",
            "https://example.com/a\tb",
            "https://exa\rmple.com/",
            "https%3A%2F%2Fexample.com%2Fa%0Ab",
        ] {
            assert!(
                matches!(normalize_target(raw), Err(UrlValidationError::InvalidFormat(_))),
                "{raw:?} should be rejected"
            );
        }
        // 非 ASCII 字符仍然允许
        assert_eq!(
            normalize_target("https://example.com/文档").unwrap(),
            "https://example.com/文档"
        );
    }

    #[test]
    fn test_maps_to_client_error() {
        let err: SoplinkError = normalize_target("ftp://x").unwrap_err().into();
        assert!(matches!(err, SoplinkError::ClientRequest(_)));
    }
}
