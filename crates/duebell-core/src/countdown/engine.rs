//! Countdown engine: one synchronous tick.
//!
//! The engine does not use internal threads or timers. The caller (or the
//! runner in [`super::runner`]) invokes [`CountdownEngine::tick`] at a fixed
//! cadence of at most one second.
//!
//! ## Per-tick data flow
//!
//! ```text
//! task snapshot -> select_target -> classify -> AlertDriver -> DisplaySnapshot
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::alert::{AlertDriver, AlertPorts, EngineState};
use super::selector::{select_target, Selection};
use super::zone::{classify, Classification, Color, ZoneThresholds};
use crate::events::Event;
use crate::storage::Config;
use crate::task::Task;

/// What the UI shows for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    /// Task title; absent for informational states
    pub title: Option<String>,
    pub time: String,
    pub color: Color,
}

impl DisplaySnapshot {
    pub fn countdown(title: &str, classification: &Classification) -> Self {
        Self {
            title: Some(title.to_string()),
            time: classification.time_text(),
            color: classification.color,
        }
    }

    pub fn informational(selection: &Selection) -> Self {
        let message = match selection {
            Selection::NoActiveTasks => "No active tasks",
            Selection::NoneStartedYet => "No tasks started yet",
            Selection::NoDeadlineSet => "No deadline set",
            Selection::Selected(_) => "",
        };
        Self {
            title: None,
            time: message.to_string(),
            color: Color::Neutral,
        }
    }
}

/// Receives published state. Implemented by the UI collaborator.
pub trait DisplaySink {
    fn on_tick(&mut self, snapshot: &DisplaySnapshot);

    fn on_audio_lock_changed(&mut self, locked: bool);

    fn on_event(&mut self, _event: &Event) {}
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub selection: Selection,
    pub classification: Option<Classification>,
    pub snapshot: DisplaySnapshot,
    pub events: Vec<Event>,
}

impl TickOutcome {
    /// Forward the snapshot and any audio-lock change to a sink.
    pub fn publish<S>(&self, sink: &mut S)
    where
        S: DisplaySink + ?Sized,
    {
        for event in &self.events {
            if let Event::AudioLockChanged { locked, .. } = event {
                sink.on_audio_lock_changed(*locked);
            }
            sink.on_event(event);
        }
        sink.on_tick(&self.snapshot);
    }
}

#[derive(Debug, Clone, Default)]
pub struct CountdownEngine {
    driver: AlertDriver,
    thresholds: ZoneThresholds,
}

impl CountdownEngine {
    pub fn new(thresholds: ZoneThresholds) -> Self {
        Self {
            driver: AlertDriver::new(),
            thresholds,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            driver: AlertDriver::new().with_notification_title(config.notifications.title.clone()),
            thresholds: config.thresholds,
        }
    }

    pub fn state(&self) -> &EngineState {
        self.driver.state()
    }

    pub fn thresholds(&self) -> &ZoneThresholds {
        &self.thresholds
    }

    /// Evaluate one tick against a task snapshot. Never fails; missing
    /// deadlines degrade to informational snapshots.
    pub fn tick<P>(&mut self, tasks: &[Task], now: NaiveDateTime, ports: &mut P) -> TickOutcome
    where
        P: AlertPorts + ?Sized,
    {
        let selection = select_target(tasks, now);
        let classification = selection
            .target()
            .map(|target| classify(target, now, &self.thresholds));

        let output = self
            .driver
            .apply(&selection, classification.as_ref(), now, ports);

        tracing::debug!(
            tasks = tasks.len(),
            zone = ?classification.map(|c| c.zone),
            time = %output.snapshot.time,
            "Countdown tick"
        );

        TickOutcome {
            selection,
            classification,
            snapshot: output.snapshot,
            events: output.events,
        }
    }

    pub fn unlock_audio<P>(&mut self, ports: &mut P, now: NaiveDateTime) -> Vec<Event>
    where
        P: AlertPorts + ?Sized,
    {
        self.driver.unlock_audio(ports, now)
    }

    pub fn shutdown<P>(&mut self, ports: &mut P, now: NaiveDateTime) -> Vec<Event>
    where
        P: AlertPorts + ?Sized,
    {
        self.driver.shutdown(ports, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::alert::RecordingPorts;
    use crate::countdown::zone::Zone;
    use crate::task::TaskDraft;
    use chrono::{Duration, NaiveDate, Utc};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[derive(Default)]
    struct CollectingSink {
        ticks: Vec<DisplaySnapshot>,
        locks: Vec<bool>,
    }

    impl DisplaySink for CollectingSink {
        fn on_tick(&mut self, snapshot: &DisplaySnapshot) {
            self.ticks.push(snapshot.clone());
        }

        fn on_audio_lock_changed(&mut self, locked: bool) {
            self.locks.push(locked);
        }
    }

    #[test]
    fn informational_snapshot_when_empty() {
        let mut engine = CountdownEngine::default();
        let mut ports = RecordingPorts::default();
        let outcome = engine.tick(&[], now(), &mut ports);
        assert_eq!(outcome.selection, Selection::NoActiveTasks);
        assert_eq!(outcome.snapshot.title, None);
        assert_eq!(outcome.snapshot.time, "No active tasks");
    }

    #[test]
    fn countdown_snapshot_text() {
        let due = now() + Duration::seconds(2 * 3600 + 5 * 60 + 9);
        let task = Task::from_draft(
            TaskDraft::new("Essay").ending(due.date(), Some(due.time())),
            Utc::now(),
        );
        let mut engine = CountdownEngine::default();
        let mut ports = RecordingPorts::default();
        let outcome = engine.tick(&[task], now(), &mut ports);
        assert_eq!(outcome.snapshot.title.as_deref(), Some("Essay"));
        assert_eq!(outcome.snapshot.time, "2h 05m 09s left");
        assert_eq!(outcome.classification.map(|c| c.zone), Some(Zone::Warning));
        assert_eq!(outcome.snapshot.color, Color::Caution);
    }

    #[test]
    fn publish_surfaces_audio_lock() {
        let due = now() + Duration::seconds(20);
        let task = Task::from_draft(
            TaskDraft::new("Pitch").ending(due.date(), Some(due.time())),
            Utc::now(),
        );
        let mut engine = CountdownEngine::default();
        let mut ports = RecordingPorts {
            audio_locked: true,
            ..RecordingPorts::default()
        };
        let mut sink = CollectingSink::default();
        engine.tick(&[task], now(), &mut ports).publish(&mut sink);
        assert_eq!(sink.locks, vec![true]);
        assert_eq!(sink.ticks.len(), 1);
    }
}
