//! Coda REST API v1 sink
//!
//! 使用 ureq（同步）在 spawn_blocking 中调用，全局超时由 Agent 控制

use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace};
use ureq::Agent;
use url::Url;

use super::{Cell, RowValues, TableRef, TableSink};

/// 单页最大行数（Coda 上限 500）
const PAGE_LIMIT: &str = "500";
/// 防止 nextPageToken 异常时无限翻页
const MAX_PAGES: usize = 200;

pub struct CodaSink {
    agent: Agent,
    base_url: String,
    bearer: String,
}

#[derive(Debug, Deserialize)]
struct RowsPage {
    #[serde(default)]
    items: Vec<RowItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RowItem {
    #[serde(default)]
    values: serde_json::Map<String, Value>,
}

impl CodaSink {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.to_string(),
            bearer: format!("Bearer {}", api_key),
        }
    }

    /// `{base}/docs/{doc}/tables/{table}/rows`，ID 会被正确转义
    fn rows_url(&self, table: &TableRef) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid Coda base_url: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Coda base_url cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend([
                "docs",
                table.doc_id.as_str(),
                "tables",
                table.table_id.as_str(),
                "rows",
            ]);
        Ok(url)
    }

    fn append_row_sync(agent: Agent, url: Url, bearer: String, body: Value) -> anyhow::Result<()> {
        let resp = agent
            .post(url.as_str())
            .header("Authorization", bearer.as_str())
            .send_json(&body)
            .with_context(|| format!("Coda append to {} failed", url))?;

        trace!("Coda append accepted with status {}", resp.status());
        Ok(())
    }

    fn list_rows_sync(agent: Agent, base: Url, bearer: String) -> anyhow::Result<Vec<RowValues>> {
        let mut rows = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut url = base.clone();
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("useColumnNames", "false")
                    .append_pair("valueFormat", "simple")
                    .append_pair("limit", PAGE_LIMIT);
                if let Some(ref token) = page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: RowsPage = agent
                .get(url.as_str())
                .header("Authorization", bearer.as_str())
                .call()
                .with_context(|| format!("Coda list rows from {} failed", base))?
                .into_body()
                .read_json()
                .context("Coda list rows response parse failed")?;

            rows.extend(page.items.into_iter().map(|item| {
                item.values
                    .into_iter()
                    .map(|(column, value)| (column, value_to_string(&value)))
                    .collect::<RowValues>()
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(rows),
            }
        }

        Err(anyhow!(
            "Coda list rows from {} exceeded {} pages",
            base,
            MAX_PAGES
        ))
    }
}

/// Flatten a Coda cell value to the text shown in the sheet.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("name"))
            .map(value_to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

#[async_trait::async_trait]
impl TableSink for CodaSink {
    async fn append_row(&self, table: &TableRef, cells: Vec<Cell>) -> anyhow::Result<()> {
        let url = self.rows_url(table)?;
        let body = json!({ "rows": [{ "cells": cells }] });
        let agent = self.agent.clone();
        let bearer = self.bearer.clone();

        debug!("Appending click row to Coda table {}", table);
        tokio::task::spawn_blocking(move || Self::append_row_sync(agent, url, bearer, body))
            .await
            .context("Coda append task panicked")?
    }

    async fn list_rows(&self, table: &TableRef) -> anyhow::Result<Vec<RowValues>> {
        let url = self.rows_url(table)?;
        let agent = self.agent.clone();
        let bearer = self.bearer.clone();

        let rows = tokio::task::spawn_blocking(move || Self::list_rows_sync(agent, url, bearer))
            .await
            .context("Coda list rows task panicked")??;

        debug!("Fetched {} rows from Coda table {}", rows.len(), table);
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "coda"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(base: &str) -> CodaSink {
        CodaSink::new(base, "secret", Duration::from_secs(2))
    }

    #[test]
    fn test_rows_url() {
        let table = TableRef::new("AbCdEf", "grid-x1");
        let url = sink("https://coda.io/apis/v1").rows_url(&table).unwrap();
        assert_eq!(
            url.as_str(),
            "https://coda.io/apis/v1/docs/AbCdEf/tables/grid-x1/rows"
        );

        // 尾部斜杠、需要转义的表名
        let table = TableRef::new("doc", "Click Log");
        let url = sink("https://coda.io/apis/v1/").rows_url(&table).unwrap();
        assert_eq!(
            url.as_str(),
            "https://coda.io/apis/v1/docs/doc/tables/Click%20Log/rows"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let table = TableRef::new("doc", "table");
        assert!(sink("not a url").rows_url(&table).is_err());
    }

    #[test]
    fn test_append_body_shape() {
        let cells = vec![Cell::new("c-1", "SOP-1"), Cell::new("c-2", "Amy")];
        let body = json!({ "rows": [{ "cells": cells }] });
        assert_eq!(
            body,
            json!({"rows": [{"cells": [
                {"column": "c-1", "value": "SOP-1"},
                {"column": "c-2", "value": "Amy"}
            ]}]})
        );
    }

    #[test]
    fn test_page_parsing_and_flattening() {
        let page: RowsPage = serde_json::from_str(
            r#"{
                "items": [
                    {"id": "i-1", "values": {"c-key": " ABC ", "c-url": "https://example.com/doc", "c-n": 3}},
                    {"id": "i-2", "values": {"c-key": ["x", "y"], "c-url": {"url": "https://example.com/y", "name": "Y"}, "c-n": null}}
                ],
                "nextPageToken": "tok"
            }"#,
        )
        .unwrap();

        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
        let first = &page.items[0].values;
        assert_eq!(value_to_string(&first["c-key"]), " ABC ");
        assert_eq!(value_to_string(&first["c-n"]), "3");

        let second = &page.items[1].values;
        assert_eq!(value_to_string(&second["c-key"]), "x, y");
        assert_eq!(value_to_string(&second["c-url"]), "https://example.com/y");
        assert_eq!(value_to_string(&second["c-n"]), "");
    }
}
