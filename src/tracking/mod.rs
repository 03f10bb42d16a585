//! Click tracking core
//!
//! - `bot`: 爬虫识别
//! - `gate`: 重复点击抑制
//! - `fingerprint`: 去重指纹
//! - `event`: 点击事件与上报时区
//! - `reporter`: 后台写入外部表

pub mod bot;
pub mod clock;
pub mod event;
pub mod fingerprint;
pub mod gate;
pub mod params;
pub mod reporter;

pub use bot::BotFilter;
pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{Actor, ClickEvent, UNKNOWN, reporting_time, reporting_zone};
pub use fingerprint::Fingerprint;
pub use gate::{ClickGate, MemoryClickGate};
pub use params::ClickParams;
pub use reporter::ClickReporter;
