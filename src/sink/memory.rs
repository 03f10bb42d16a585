//! In-process table sink
//!
//! 用于本地运行和测试：追加的行保存在内存中，查询表可预先填充
//!
//! 只保留最近的 `capacity` 行，更早的行被丢弃，长时间运行时内存有上限。

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use tracing::info;

use super::{Cell, RowValues, TableRef, TableSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendedRow {
    pub table: TableRef,
    pub cells: Vec<Cell>,
}

impl AppendedRow {
    /// Value written to `column`, if present.
    pub fn value(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.value.as_str())
    }
}

/// 默认保留的最近追加行数
pub const DEFAULT_RETAINED_ROWS: usize = 1000;

pub struct InMemorySink {
    appended: Mutex<VecDeque<AppendedRow>>,
    capacity: usize,
    total: AtomicUsize,
    tables: Mutex<HashMap<TableRef, Vec<RowValues>>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RETAINED_ROWS)
    }
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` appended rows (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            appended: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_RETAINED_ROWS))),
            capacity,
            total: AtomicUsize::new(0),
            tables: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
        }
    }

    /// Replace the rows returned by `list_rows` for `table`.
    pub fn seed_rows(&self, table: TableRef, rows: Vec<RowValues>) {
        self.tables.lock().insert(table, rows);
    }

    /// Retained rows, oldest first.
    pub fn appended(&self) -> Vec<AppendedRow> {
        self.appended.lock().iter().cloned().collect()
    }

    /// Rows appended since startup, including ones no longer retained.
    pub fn append_count(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Make every call fail, simulating an unreachable upstream.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every call, simulating a slow upstream.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    async fn simulate_upstream(&self) -> anyhow::Result<()> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("in-memory sink is set to fail"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TableSink for InMemorySink {
    async fn append_row(&self, table: &TableRef, cells: Vec<Cell>) -> anyhow::Result<()> {
        self.simulate_upstream().await?;

        info!(
            "click row appended to {}: {}",
            table,
            cells
                .iter()
                .map(|c| format!("{}={}", c.column, c.value))
                .collect::<Vec<_>>()
                .join(", ")
        );
        {
            let mut appended = self.appended.lock();
            if appended.len() >= self.capacity {
                appended.pop_front();
            }
            appended.push_back(AppendedRow {
                table: table.clone(),
                cells,
            });
        }
        self.total.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_rows(&self, table: &TableRef) -> anyhow::Result<Vec<RowValues>> {
        self.simulate_upstream().await?;
        Ok(self.tables.lock().get(table).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
