//! Duplicate-click gate
//!
//! 一次真实点击只允许记录一行：
//! - 指纹首次出现：原子插入并放行
//! - 窗口内再次出现：拒绝（仍然跳转，只是不记录）
//! - 窗口到期后由后台定时任务删除，与请求生命周期无关
//!
//! The check-and-insert runs under the DashMap shard lock for that key, so two
//! concurrent requests with the same fingerprint can never both be admitted.
//! State is process local: with several replicas dedup only holds per replica.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

use super::clock::Clock;
use crate::config::ExpiryPolicy;

/// Capability the redirect handler depends on.
///
/// Swappable for a shared store if cross-replica dedup is ever needed.
pub trait ClickGate: Send + Sync {
    /// `true` if this is the first sighting of `fingerprint` within the window.
    fn try_acquire(&self, fingerprint: &str) -> bool;

    /// Number of fingerprints currently held.
    fn tracked(&self) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct GateEntry {
    first_seen: Instant,
    expires_at: Instant,
}

impl GateEntry {
    fn new(now: Instant, window: Duration) -> Self {
        Self {
            first_seen: now,
            expires_at: now + window,
        }
    }

    #[inline]
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type EntryMap = DashMap<String, GateEntry>;

/// In-memory [`ClickGate`] with per-entry expiry.
pub struct MemoryClickGate {
    entries: Arc<EntryMap>,
    window: Duration,
    policy: ExpiryPolicy,
    clock: Arc<dyn Clock>,
}

impl MemoryClickGate {
    pub fn new(window: Duration, policy: ExpiryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            window,
            policy,
            clock,
        }
    }

    /// When the fingerprint was first admitted, if it is still held.
    pub fn first_seen(&self, fingerprint: &str) -> Option<Instant> {
        let now = self.clock.now();
        self.entries
            .get(fingerprint)
            .filter(|e| e.is_live(now))
            .map(|e| e.first_seen)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// 在后台安排删除；没有 tokio runtime 时只依赖读时过期判断
    fn schedule_removal(&self, fingerprint: String) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            trace!("No runtime, expiry of {} is checked lazily", fingerprint);
            return;
        };

        let entries: Weak<EntryMap> = Arc::downgrade(&self.entries);
        let clock = Arc::clone(&self.clock);
        let mut wait = self.window;

        handle.spawn(async move {
            loop {
                tokio::time::sleep(wait).await;

                // gate 已被释放，没有需要清理的东西
                let Some(entries) = entries.upgrade() else {
                    return;
                };

                let now = clock.now();
                if entries
                    .remove_if(&fingerprint, |_, e| !e.is_live(now))
                    .is_some()
                {
                    trace!("Click gate entry expired: {}", fingerprint);
                    return;
                }

                // sliding 策略下条目可能被续期，按剩余时间再等一轮
                match entries.get(&fingerprint) {
                    Some(e) => {
                        wait = e
                            .expires_at
                            .saturating_duration_since(now)
                            .max(Duration::from_millis(10));
                    }
                    None => return,
                }
            }
        });
    }
}

impl ClickGate for MemoryClickGate {
    fn try_acquire(&self, fingerprint: &str) -> bool {
        let now = self.clock.now();

        let admitted = match self.entries.entry(fingerprint.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    if self.policy == ExpiryPolicy::Sliding {
                        occupied.get_mut().expires_at = now + self.window;
                    }
                    false
                } else {
                    // expired but the removal timer has not fired yet
                    occupied.insert(GateEntry::new(now, self.window));
                    true
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(GateEntry::new(now, self.window));
                true
            }
        };

        if admitted {
            self.schedule_removal(fingerprint.to_string());
        }
        admitted
    }

    fn tracked(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::clock::{ManualClock, SystemClock};

    fn manual_gate(secs: u64, policy: ExpiryPolicy) -> (MemoryClickGate, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let gate = MemoryClickGate::new(
            Duration::from_secs(secs),
            policy,
            clock.clone() as Arc<dyn Clock>,
        );
        (gate, clock)
    }

    #[test]
    fn test_first_acquire_admits_repeat_suppressed() {
        let (gate, _clock) = manual_gate(3, ExpiryPolicy::Fixed);

        assert!(gate.try_acquire("alice@example.com-SOP1"));
        assert!(!gate.try_acquire("alice@example.com-SOP1"));
        assert!(gate.try_acquire("alice@example.com-SOP2"));
        assert_eq!(gate.tracked(), 2);
    }

    #[test]
    fn test_fixed_window_not_extended_by_repeats() {
        let (gate, clock) = manual_gate(3, ExpiryPolicy::Fixed);

        assert!(gate.try_acquire("k"));
        clock.advance(Duration::from_secs(2));
        assert!(!gate.try_acquire("k"));
        clock.advance(Duration::from_secs(2));
        // 4s after first sighting: window from first-seen has elapsed
        assert!(gate.try_acquire("k"));
    }

    #[test]
    fn test_sliding_window_extended_by_repeats() {
        let (gate, clock) = manual_gate(3, ExpiryPolicy::Sliding);

        assert!(gate.try_acquire("k"));
        clock.advance(Duration::from_secs(2));
        assert!(!gate.try_acquire("k"));
        clock.advance(Duration::from_secs(2));
        assert!(!gate.try_acquire("k"));
        clock.advance(Duration::from_secs(4));
        assert!(gate.try_acquire("k"));
    }

    #[test]
    fn test_purge_expired() {
        let (gate, clock) = manual_gate(60, ExpiryPolicy::Fixed);

        gate.try_acquire("a");
        clock.advance(Duration::from_secs(30));
        gate.try_acquire("b");
        clock.advance(Duration::from_secs(31));

        assert_eq!(gate.purge_expired(), 1);
        assert!(gate.first_seen("a").is_none());
        assert!(gate.first_seen("b").is_some());
    }

    #[tokio::test]
    async fn test_removal_timer_fires_after_window() {
        let gate = MemoryClickGate::new(
            Duration::from_millis(50),
            ExpiryPolicy::Fixed,
            SystemClock::arc(),
        );

        assert!(gate.try_acquire("ts-1700000000000"));
        assert_eq!(gate.tracked(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(gate.tracked(), 0);
    }

    #[tokio::test]
    async fn test_removal_timer_follows_sliding_expiry() {
        let gate = MemoryClickGate::new(
            Duration::from_millis(200),
            ExpiryPolicy::Sliding,
            SystemClock::arc(),
        );

        assert!(gate.try_acquire("k"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        // 窗口内再次出现：续期到 ~300ms
        assert!(!gate.try_acquire("k"));

        // 原窗口已过，定时器应按续期后的时间重新等待
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(gate.tracked(), 1);
        assert!(gate.first_seen("k").is_some());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(gate.tracked(), 0);
    }

    #[test]
    fn test_concurrent_acquire_admits_exactly_one() {
        let gate = Arc::new(MemoryClickGate::new(
            Duration::from_secs(3),
            ExpiryPolicy::Fixed,
            SystemClock::arc(),
        ));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || gate.try_acquire("shared"))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
    }
}
