//! Time source used by the click gate and event derivation.
//!
//! Production code uses [`SystemClock`]; tests drive [`ManualClock`] so that
//! window expiry can be asserted without sleeping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync + 'static {
    /// Monotonic instant, used for dedup windows.
    fn now(&self) -> Instant;

    /// Wall-clock time, used for the reported click timestamp.
    fn utc_now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn arc() -> Arc<dyn Clock> {
        Arc::new(SystemClock)
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动时钟：只有调用 `advance` 时间才会前进
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    utc_origin: DateTime<Utc>,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new(utc_origin: DateTime<Utc>) -> Self {
        Self {
            origin: Instant::now(),
            utc_origin,
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let elapsed = *self.elapsed.lock();
        self.utc_origin + chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero())
    }
}
