//! SOP key → 跳转目标
//!
//! 目标表整表读取后建索引，索引在 Moka 缓存中保留 `cache_ttl_secs`：
//! - key 比较忽略大小写和首尾空白
//! - 重复 key 以第一行为准，目标为空的行被忽略
//! - 并发的缓存未命中只读取一次外部表

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, trace, warn};

use crate::config::LookupConfig;
use crate::errors::{Result, SoplinkError};
use crate::sink::{RowValues, TableRef, TableSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSop {
    /// key as written in the table, e.g. "ABC"
    pub key: String,
    pub target: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LookupColumns {
    key: String,
    target: String,
    label: Option<String>,
}

#[derive(Debug, Default)]
struct SopIndex {
    by_key: HashMap<String, ResolvedSop>,
}

impl SopIndex {
    fn build(rows: &[RowValues], columns: &LookupColumns) -> Self {
        let mut by_key = HashMap::with_capacity(rows.len());

        for row in rows {
            let Some(key) = row.get(&columns.key).map(|k| k.trim()).filter(|k| !k.is_empty())
            else {
                continue;
            };
            let Some(target) = row
                .get(&columns.target)
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
            else {
                trace!("SOP row {} has no target, skipped", key);
                continue;
            };
            let label = columns
                .label
                .as_ref()
                .and_then(|col| row.get(col))
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(String::from);

            by_key
                .entry(normalize_key(key))
                .or_insert_with(|| ResolvedSop {
                    key: key.to_string(),
                    target: target.to_string(),
                    label,
                });
        }

        Self { by_key }
    }
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

pub struct TargetResolver {
    sink: Arc<dyn TableSink>,
    table: TableRef,
    columns: LookupColumns,
    /// `None` when `cache_ttl_secs = 0`
    cache: Option<Cache<TableRef, Arc<SopIndex>>>,
}

impl TargetResolver {
    pub fn new(sink: Arc<dyn TableSink>, table: TableRef, config: &LookupConfig) -> Self {
        let cache = (config.cache_ttl_secs > 0).then(|| {
            Cache::builder()
                .time_to_live(Duration::from_secs(config.cache_ttl_secs))
                .max_capacity(4)
                .build()
        });

        Self {
            sink,
            table,
            columns: LookupColumns {
                key: config.key_column.clone(),
                target: config.target_column.clone(),
                label: config.label_column.clone().filter(|c| !c.is_empty()),
            },
            cache,
        }
    }

    /// Find the row for `sop`.
    ///
    /// Returns `NotFound` for an unknown key and `UpstreamLookup` when the
    /// table cannot be read.
    pub async fn resolve(&self, sop: &str) -> Result<ResolvedSop> {
        let index = self.index().await?;
        index
            .by_key
            .get(&normalize_key(sop))
            .cloned()
            .ok_or_else(|| SoplinkError::not_found(format!("SOP '{}' not found", sop.trim())))
    }

    /// Drop the cached index so the next lookup reads the table again.
    pub async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&self.table).await;
        }
    }

    async fn index(&self) -> Result<Arc<SopIndex>> {
        let Some(cache) = &self.cache else {
            return self.load().await;
        };

        cache
            .try_get_with(self.table.clone(), self.load())
            .await
            .map_err(|e| (*e).clone())
    }

    async fn load(&self) -> Result<Arc<SopIndex>> {
        let rows = self.sink.list_rows(&self.table).await.map_err(|e| {
            warn!("SOP lookup table {} unavailable: {:#}", self.table, e);
            SoplinkError::upstream_lookup(format!("{:#}", e))
        })?;

        let index = SopIndex::build(&rows, &self.columns);
        debug!(
            "SOP index loaded from {}: {} keys ({} rows)",
            self.table,
            index.by_key.len(),
            rows.len()
        );
        Ok(Arc::new(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemorySink;

    fn config(ttl: u64) -> LookupConfig {
        LookupConfig {
            enabled: true,
            key_column: "c-key".into(),
            target_column: "c-url".into(),
            label_column: Some("c-label".into()),
            cache_ttl_secs: ttl,
            ..Default::default()
        }
    }

    fn row(key: &str, url: &str, label: &str) -> RowValues {
        [
            ("c-key".to_string(), key.to_string()),
            ("c-url".to_string(), url.to_string()),
            ("c-label".to_string(), label.to_string()),
        ]
        .into()
    }

    fn setup(ttl: u64) -> (Arc<InMemorySink>, TargetResolver) {
        let sink = Arc::new(InMemorySink::new());
        let table = TableRef::new("doc", "sops");
        sink.seed_rows(
            table.clone(),
            vec![
                row(" ABC ", "https://example.com/doc", "Onboarding"),
                row("abc", "https://example.com/shadowed", ""),
                row("EMPTY", "  ", ""),
                row("XYZ", "https://example.com/xyz", ""),
            ],
        );
        let resolver = TargetResolver::new(sink.clone(), table, &config(ttl));
        (sink, resolver)
    }

    #[tokio::test]
    async fn test_resolve_case_insensitive() {
        let (_, resolver) = setup(30);

        let found = resolver.resolve("abc").await.unwrap();
        assert_eq!(found.key, "ABC");
        assert_eq!(found.target, "https://example.com/doc");
        assert_eq!(found.label.as_deref(), Some("Onboarding"));

        let found = resolver.resolve("  xyz ").await.unwrap();
        assert_eq!(found.key, "XYZ");
        assert_eq!(found.label, None);
    }

    #[tokio::test]
    async fn test_missing_and_empty_targets() {
        let (_, resolver) = setup(30);

        let err = resolver.resolve("nope").await.unwrap_err();
        assert!(matches!(err, SoplinkError::NotFound(_)));

        let err = resolver.resolve("empty").await.unwrap_err();
        assert!(matches!(err, SoplinkError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let (sink, resolver) = setup(0);
        sink.set_failing(true);

        let err = resolver.resolve("abc").await.unwrap_err();
        assert!(matches!(err, SoplinkError::UpstreamLookup(_)));
    }

    #[tokio::test]
    async fn test_cached_index_survives_outage() {
        let (sink, resolver) = setup(30);
        assert!(resolver.resolve("abc").await.is_ok());

        sink.set_failing(true);
        assert!(resolver.resolve("abc").await.is_ok());

        resolver.invalidate().await;
        assert!(matches!(
            resolver.resolve("abc").await.unwrap_err(),
            SoplinkError::UpstreamLookup(_)
        ));
    }
}
