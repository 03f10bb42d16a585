//! Crawler / link-preview detection
//!
//! Bots get redirected but must never reach the click gate or the sink.

use woothee::parser::Parser;

pub struct BotFilter {
    /// lowercase signatures, matched as substrings
    signatures: Vec<String>,
}

impl BotFilter {
    pub fn new<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let signatures = signatures
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { signatures }
    }

    /// A missing User-Agent is treated as a human click.
    pub fn is_bot(&self, user_agent: Option<&str>) -> bool {
        let Some(ua) = user_agent.map(str::trim).filter(|ua| !ua.is_empty()) else {
            return false;
        };

        let lowered = ua.to_lowercase();
        if self.signatures.iter().any(|sig| lowered.contains(sig.as_str())) {
            return true;
        }

        // woothee 能识别不带 "bot" 字样的爬虫
        Parser::new()
            .parse(ua)
            .is_some_and(|result| result.category == "crawler")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_bot_signatures;

    fn filter() -> BotFilter {
        BotFilter::new(default_bot_signatures())
    }

    #[test]
    fn test_known_crawlers() {
        let filter = filter();
        assert!(filter.is_bot(Some(
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"
        )));
        assert!(filter.is_bot(Some(
            "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)"
        )));
        assert!(filter.is_bot(Some("Slackbot-LinkExpanding 1.0 (+https://api.slack.com/robots)")));
        assert!(filter.is_bot(Some("WhatsApp/2.23.20.0")));
    }

    #[test]
    fn test_case_insensitive_match() {
        let filter = BotFilter::new(["LinkPreviewer"]);
        assert!(filter.is_bot(Some("acme-linkpreviewer/3.0")));
    }

    #[test]
    fn test_browsers_are_not_bots() {
        let filter = filter();
        assert!(!filter.is_bot(Some(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
        )));
        assert!(!filter.is_bot(Some(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1"
        )));
        assert!(!filter.is_bot(None));
        assert!(!filter.is_bot(Some("   ")));
    }
}
