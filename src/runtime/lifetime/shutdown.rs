use std::time::Duration;

use tracing::{error, info};

use crate::tracking::ClickReporter;

/// 等待未完成写入的最长时间（秒）
const DRAIN_TIMEOUT_SECS: u64 = 10;

/// Let in-flight click writes finish after the server stopped accepting requests.
pub async fn finish_pending_reports(reporter: &ClickReporter) {
    let pending = reporter.in_flight();
    if pending == 0 {
        info!("No pending click writes");
        return;
    }

    info!("Waiting for {} pending click writes...", pending);
    if reporter
        .drain(Duration::from_secs(DRAIN_TIMEOUT_SECS))
        .await
    {
        info!("All pending click writes finished");
    } else {
        error!(
            "Click writes still pending after {} seconds, {} dropped",
            DRAIN_TIMEOUT_SECS,
            reporter.in_flight()
        );
    }
}
