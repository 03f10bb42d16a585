//! Detached click reporter
//!
//! 写入点击日志与跳转解耦：
//! - `report` 立即返回，写入在独立的 tokio 任务中执行
//! - 写入有超时，失败只记录 warn 日志（fail open）
//! - 关闭时 `drain` 等待仍在进行中的写入
//!
//! 任务派发到创建 reporter 时所在的 runtime（主 runtime），
//! 这样 HTTP worker 停止后写入仍能完成。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::event::ClickEvent;
use crate::config::ColumnConfig;
use crate::errors::SoplinkError;
use crate::sink::{TableRef, TableSink};

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }
}

/// 任务结束（包括 panic）时计数减一
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct ClickReporter {
    sink: Arc<dyn TableSink>,
    table: TableRef,
    columns: ColumnConfig,
    timeout: Duration,
    in_flight: Arc<InFlight>,
    failures: Arc<AtomicU64>,
    runtime: Option<Handle>,
}

impl ClickReporter {
    pub fn new(
        sink: Arc<dyn TableSink>,
        table: TableRef,
        columns: ColumnConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            sink,
            table,
            columns,
            timeout,
            in_flight: Arc::new(InFlight::default()),
            failures: Arc::new(AtomicU64::new(0)),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Queue one row. Never blocks the caller and never surfaces an error.
    pub fn report(&self, event: ClickEvent) -> JoinHandle<()> {
        let guard = self.in_flight.enter();
        let sink = Arc::clone(&self.sink);
        let table = self.table.clone();
        let cells = self.columns.cells_for(&event);
        let timeout = self.timeout;
        let failures = Arc::clone(&self.failures);

        let task = async move {
            let _guard = guard;
            let outcome = match tokio::time::timeout(timeout, sink.append_row(&table, cells)).await
            {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(SoplinkError::upstream_log(format!("{:#}", e))),
                Err(_) => Err(SoplinkError::upstream_log(format!(
                    "append timed out after {:?}",
                    timeout
                ))),
            };

            match outcome {
                Ok(()) => debug!(
                    "Click logged to {} sink: sop={} actor={}",
                    sink.name(),
                    event.sop_key,
                    event.actor_id
                ),
                Err(e) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Failed to log click (sop={}, actor={}): {}",
                        event.sop_key,
                        event.actor_id,
                        e.format_simple()
                    );
                }
            }
        };

        match &self.runtime {
            Some(runtime) => runtime.spawn(task),
            None => tokio::spawn(task),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Writes that failed or timed out since startup.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Wait for outstanding writes. Returns `false` if `max_wait` elapsed first.
    pub async fn drain(&self, max_wait: Duration) -> bool {
        let wait_idle = async {
            loop {
                let notified = self.in_flight.idle.notified();
                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(max_wait, wait_idle).await.is_ok()
    }
}
