//! Click events
//!
//! 记录到外部表的一行：谁、点了哪个 SOP、跳到哪里、什么时候。
//! 时间按报表时区拆成日期和 12 小时制时间。

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;

pub const UNKNOWN: &str = "Unknown";

/// Who clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: Option<&str>, name: Option<&str>) -> Self {
        Self {
            id: non_empty(id).unwrap_or(UNKNOWN).to_string(),
            name: non_empty(name).unwrap_or(UNKNOWN).to_string(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(None, None)
    }
}

/// One recorded click, exactly as it is written to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickEvent {
    pub sop_key: String,
    pub sop_label: String,
    pub target_url: String,
    pub actor_id: String,
    pub actor_name: String,
    /// YYYY-MM-DD in the reporting zone
    pub date: String,
    /// H:MM:SS AM|PM in the reporting zone
    pub time: String,
}

impl ClickEvent {
    pub fn new(
        sop_key: &str,
        sop_label: Option<&str>,
        target_url: &str,
        actor: &Actor,
        occurred_at: DateTime<Utc>,
        zone: FixedOffset,
    ) -> Self {
        let (date, time) = reporting_time(occurred_at, zone);
        Self {
            sop_key: sop_key.to_string(),
            sop_label: non_empty(sop_label).unwrap_or(UNKNOWN).to_string(),
            target_url: target_url.to_string(),
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            date,
            time,
        }
    }
}

/// Fixed reporting zone from an hour offset, e.g. 8 for UTC+8.
pub fn reporting_zone(offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(offset_hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Split an instant into the date and 12-hour clock strings used in the sheet.
///
/// `2024-01-01T04:00:00Z` at UTC+8 → (`2024-01-01`, `12:00:00 PM`)
pub fn reporting_time(at: DateTime<Utc>, zone: FixedOffset) -> (String, String) {
    let local = at.with_timezone(&zone);
    (
        local.format("%Y-%m-%d").to_string(),
        local.format("%-I:%M:%S %p").to_string(),
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_noon_in_reporting_zone() {
        let (date, time) = reporting_time(utc("2024-01-01T04:00:00Z"), reporting_zone(8));
        assert_eq!(date, "2024-01-01");
        assert_eq!(time, "12:00:00 PM");
    }

    #[test]
    fn test_midnight_rolls_date_forward() {
        let (date, time) = reporting_time(utc("2024-01-01T16:30:05Z"), reporting_zone(8));
        assert_eq!(date, "2024-01-02");
        assert_eq!(time, "12:30:05 AM");
    }

    #[test]
    fn test_afternoon_hour_not_padded() {
        let (date, time) = reporting_time(utc("2024-03-09T09:46:01Z"), reporting_zone(8));
        assert_eq!(date, "2024-03-09");
        assert_eq!(time, "5:46:01 PM");
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let event = ClickEvent::new(
            "SOP-7",
            Some("  "),
            "https://example.com/doc",
            &Actor::new(Some("bob@example.com"), None),
            utc("2024-01-01T04:00:00Z"),
            reporting_zone(8),
        );
        assert_eq!(event.sop_label, UNKNOWN);
        assert_eq!(event.actor_id, "bob@example.com");
        assert_eq!(event.actor_name, UNKNOWN);
        assert_eq!(Actor::unknown().id, UNKNOWN);
    }
}
