use serde::{Deserialize, Serialize};

use super::event::Actor;

/// Query parameters of a tracking request.
///
/// 也作为 OAuth 模式下的 pending 状态保存在会话中
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickParams {
    #[serde(default)]
    pub sop: Option<String>,
    #[serde(default, rename = "sopName")]
    pub sop_name: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    /// alias of `target`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, rename = "userName")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

impl ClickParams {
    pub fn sop(&self) -> Option<&str> {
        non_empty(self.sop.as_deref())
    }

    pub fn sop_name(&self) -> Option<&str> {
        non_empty(self.sop_name.as_deref())
    }

    /// `target` wins over `url` when both are given.
    pub fn raw_target(&self) -> Option<&str> {
        non_empty(self.target.as_deref()).or_else(|| non_empty(self.url.as_deref()))
    }

    pub fn token(&self) -> Option<&str> {
        non_empty(self.ts.as_deref())
    }

    /// Actor taken from `user` / `userName` (trusted query identity).
    pub fn query_actor(&self) -> Actor {
        Actor::new(self.user.as_deref(), self.user_name.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::event::UNKNOWN;

    fn parse(query: &str) -> ClickParams {
        actix_web::web::Query::<ClickParams>::from_query(query)
            .unwrap()
            .into_inner()
    }

    #[test]
    fn test_camel_case_names() {
        let params = parse("sop=SOP-1&sopName=Onboarding&user=amy%40example.com&userName=Amy");
        assert_eq!(params.sop(), Some("SOP-1"));
        assert_eq!(params.sop_name(), Some("Onboarding"));
        let actor = params.query_actor();
        assert_eq!(actor.id, "amy@example.com");
        assert_eq!(actor.name, "Amy");
    }

    #[test]
    fn test_target_precedence() {
        let params = parse("target=https%3A%2F%2Fa.example&url=https%3A%2F%2Fb.example");
        assert_eq!(params.raw_target(), Some("https://a.example"));

        let params = parse("target=&url=https%3A%2F%2Fb.example");
        assert_eq!(params.raw_target(), Some("https://b.example"));

        assert_eq!(parse("sop=x").raw_target(), None);
    }

    #[test]
    fn test_blank_values_are_missing() {
        let params = parse("sop=%20%20&ts=");
        assert_eq!(params.sop(), None);
        assert_eq!(params.token(), None);
        assert_eq!(params.query_actor().id, UNKNOWN);
    }
}
