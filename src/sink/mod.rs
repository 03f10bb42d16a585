//! External tabular store (the click log and, optionally, the SOP table)
//!
//! - `coda`: Coda REST API v1
//! - `memory`: in-process table, used for local runs and tests
//! - `columns`: semantic field → column id mapping

pub mod coda;
pub mod columns;
pub mod memory;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

pub use coda::CodaSink;
pub use memory::InMemorySink;

use crate::config::{SinkConfig, SinkKind};

/// One cell of an appended row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub column: String,
    pub value: String,
}

impl Cell {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// column id → display value
pub type RowValues = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub doc_id: String,
    pub table_id: String,
}

impl TableRef {
    pub fn new(doc_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            table_id: table_id.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.doc_id, self.table_id)
    }
}

/// 外部表 Sink
#[async_trait::async_trait]
pub trait TableSink: Send + Sync {
    /// Append a single row.
    async fn append_row(&self, table: &TableRef, cells: Vec<Cell>) -> anyhow::Result<()>;

    /// All rows of a table, every page.
    async fn list_rows(&self, table: &TableRef) -> anyhow::Result<Vec<RowValues>>;

    fn name(&self) -> &'static str;
}

/// Build the sink selected by `sink.kind`.
pub fn create_sink(config: &SinkConfig, timeout_secs: u64) -> Arc<dyn TableSink> {
    match config.kind {
        SinkKind::Coda => Arc::new(CodaSink::new(
            &config.base_url,
            &config.api_key,
            std::time::Duration::from_secs(timeout_secs),
        )),
        SinkKind::InMemory => Arc::new(InMemorySink::new()),
    }
}
