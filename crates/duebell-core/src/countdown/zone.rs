//! Escalation zones.
//!
//! ## Thresholds
//!
//! Applied against `remaining = due - now`, first match wins:
//!
//! ```text
//! remaining <= 0        Done      neutral
//! remaining <= 60s      Critical  alert (pulsing)
//! remaining <= 300s     Imminent  alert
//! start known           Warning once now >= start + (due - start) / 2
//! no start              Warning when remaining <= 24h
//! otherwise             Normal    neutral
//! ```

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::selector::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Normal,
    Warning,
    Imminent,
    Critical,
    Done,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Zone::Normal => "normal",
            Zone::Warning => "warning",
            Zone::Imminent => "imminent",
            Zone::Critical => "critical",
            Zone::Done => "done",
        };
        f.write_str(s)
    }
}

/// Display color tag. Rendering is up to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    /// Blue
    Neutral,
    /// Yellow
    Caution,
    /// Red
    Alert,
    /// Red, pulsing
    AlertPulse,
}

impl Zone {
    pub fn color(self) -> Color {
        match self {
            Zone::Normal | Zone::Done => Color::Neutral,
            Zone::Warning => Color::Caution,
            Zone::Imminent => Color::Alert,
            Zone::Critical => Color::AlertPulse,
        }
    }

    /// Zones in which the five-minute notification is due.
    pub fn is_final_stretch(self) -> bool {
        matches!(self, Zone::Imminent | Zone::Critical)
    }
}

/// Zone boundaries, in seconds of remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneThresholds {
    #[serde(default = "default_critical_secs")]
    pub critical_secs: i64,
    #[serde(default = "default_imminent_secs")]
    pub imminent_secs: i64,
    /// Warning threshold for tasks that only have a deadline
    #[serde(default = "default_deadline_warning_secs")]
    pub deadline_warning_secs: i64,
}

fn default_critical_secs() -> i64 {
    60
}
fn default_imminent_secs() -> i64 {
    5 * 60
}
fn default_deadline_warning_secs() -> i64 {
    24 * 60 * 60
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            critical_secs: default_critical_secs(),
            imminent_secs: default_imminent_secs(),
            deadline_warning_secs: default_deadline_warning_secs(),
        }
    }
}

/// Result of classifying a target at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub zone: Zone,
    pub color: Color,
    pub remaining: Duration,
}

impl Classification {
    /// Countdown text: `"Done"` or `"<H>h <MM>m <SS>s left"`.
    pub fn time_text(&self) -> String {
        if self.zone == Zone::Done {
            "Done".to_string()
        } else {
            format_remaining(self.remaining)
        }
    }
}

/// Hours are not wrapped into days.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}h {minutes:02}m {seconds:02}s left")
}

pub fn classify(target: &Target, now: NaiveDateTime, thresholds: &ZoneThresholds) -> Classification {
    let remaining = target.due - now;
    let zone = zone_for(remaining, target.start, target.due, now, thresholds);
    Classification {
        zone,
        color: zone.color(),
        remaining,
    }
}

fn zone_for(
    remaining: Duration,
    start: Option<NaiveDateTime>,
    due: NaiveDateTime,
    now: NaiveDateTime,
    thresholds: &ZoneThresholds,
) -> Zone {
    if remaining <= Duration::zero() {
        return Zone::Done;
    }
    if within(remaining, thresholds.critical_secs) {
        return Zone::Critical;
    }
    if within(remaining, thresholds.imminent_secs) {
        return Zone::Imminent;
    }

    match start {
        Some(start) => {
            let halfway = start + (due - start) / 2;
            if now >= halfway {
                Zone::Warning
            } else {
                Zone::Normal
            }
        }
        None if within(remaining, thresholds.deadline_warning_secs) => Zone::Warning,
        None => Zone::Normal,
    }
}

/// `remaining <= secs`, treating thresholds beyond chrono's range as unbounded.
fn within(remaining: Duration, secs: i64) -> bool {
    match Duration::try_seconds(secs) {
        Some(limit) => remaining <= limit,
        None => secs > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;
    use chrono::{NaiveDate, Utc};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn target(start: Option<NaiveDateTime>, remaining_secs: i64) -> Target {
        let task: Task = serde_json::from_str(r#"{"id":"t","title":"T"}"#).unwrap();
        Target {
            task,
            due: now() + Duration::seconds(remaining_secs),
            start,
        }
    }

    fn zone_of(start: Option<NaiveDateTime>, remaining_secs: i64) -> Zone {
        classify(&target(start, remaining_secs), now(), &ZoneThresholds::default()).zone
    }

    #[test]
    fn oversized_threshold_does_not_panic() {
        let thresholds = ZoneThresholds {
            deadline_warning_secs: 100_000_000_000_000_000,
            ..ZoneThresholds::default()
        };
        let c = classify(&target(None, 48 * 3600), now(), &thresholds);
        assert_eq!(c.zone, Zone::Warning);
    }

    #[test]
    fn done_at_and_after_due() {
        assert_eq!(zone_of(None, 0), Zone::Done);
        assert_eq!(zone_of(None, -30), Zone::Done);
    }

    #[test]
    fn critical_boundary_is_inclusive() {
        assert_eq!(zone_of(None, 1), Zone::Critical);
        assert_eq!(zone_of(None, 60), Zone::Critical);
        assert_eq!(zone_of(None, 61), Zone::Imminent);
    }

    #[test]
    fn imminent_boundary_is_inclusive() {
        assert_eq!(zone_of(None, 299), Zone::Imminent);
        assert_eq!(zone_of(None, 300), Zone::Imminent);
        assert_eq!(zone_of(None, 301), Zone::Warning);
    }

    #[test]
    fn deadline_only_uses_absolute_day_threshold() {
        assert_eq!(zone_of(None, 3601), Zone::Warning);
        assert_eq!(zone_of(None, 86_400), Zone::Warning);
        assert_eq!(zone_of(None, 86_401), Zone::Normal);
    }

    #[test]
    fn started_task_warns_from_halfway() {
        // Window of two hours, one hour elapsed: exactly halfway.
        let halfway = Some(now() - Duration::seconds(3600));
        assert_eq!(zone_of(halfway, 3600), Zone::Warning);

        // 10 minutes in, 3601s to go: before halfway.
        let early = Some(now() - Duration::minutes(10));
        assert_eq!(zone_of(early, 3601), Zone::Normal);

        // Long window ignores the 24h rule entirely.
        let long = Some(now() - Duration::days(1));
        assert_eq!(zone_of(long, 3 * 86_400), Zone::Normal);
    }

    #[test]
    fn final_stretch_ignores_start() {
        let start = Some(now() - Duration::seconds(10));
        assert_eq!(zone_of(start, 200), Zone::Imminent);
        assert_eq!(zone_of(start, 30), Zone::Critical);
    }

    #[test]
    fn colors_follow_zone() {
        assert_eq!(Zone::Done.color(), Color::Neutral);
        assert_eq!(Zone::Normal.color(), Color::Neutral);
        assert_eq!(Zone::Warning.color(), Color::Caution);
        assert_eq!(Zone::Imminent.color(), Color::Alert);
        assert_eq!(Zone::Critical.color(), Color::AlertPulse);
    }

    #[test]
    fn remaining_text_has_no_day_rollover() {
        assert_eq!(format_remaining(Duration::seconds(59)), "0h 00m 59s left");
        assert_eq!(format_remaining(Duration::seconds(3661)), "1h 01m 01s left");
        assert_eq!(
            format_remaining(Duration::seconds(30 * 3600 + 5)),
            "30h 00m 05s left"
        );
    }

    #[test]
    fn custom_thresholds_shift_boundaries() {
        let thresholds = ZoneThresholds {
            critical_secs: 10,
            imminent_secs: 20,
            deadline_warning_secs: 30,
        };
        let at = |secs| classify(&target(None, secs), now(), &thresholds).zone;
        assert_eq!(at(10), Zone::Critical);
        assert_eq!(at(20), Zone::Imminent);
        assert_eq!(at(30), Zone::Warning);
        assert_eq!(at(31), Zone::Normal);
    }
}
