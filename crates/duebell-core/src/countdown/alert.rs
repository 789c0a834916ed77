//! Alert driver: the stateful half of the countdown.
//!
//! Turns each tick's selection and classification into side effects on the
//! [`AlertPorts`] with exactly-once-per-transition semantics:
//!
//! - the looping alarm starts once per entry into `Critical` and is stopped
//!   on any tick outside it, on target change, and on shutdown
//! - the five-minute notification fires at most once per [`TargetKey`] for
//!   the lifetime of the driver
//! - a chime plays on zone changes, except into `Critical` (the alarm covers
//!   that) and never on the first zone of a new target
//!
//! Playback failures are not retried per tick. They raise the audio-lock
//! flag, which only [`AlertDriver::unlock_audio`] clears.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::engine::DisplaySnapshot;
use super::selector::{Selection, TargetKey};
use super::zone::{Classification, Zone};
use crate::error::AlertError;
use crate::events::Event;

pub const DEFAULT_NOTIFICATION_TITLE: &str = "5 minutes left";

/// Effect ports supplied by the host. The driver never produces sound or
/// notifications itself.
pub trait AlertPorts {
    /// Start the looping alarm.
    fn play_alarm_loop(&mut self) -> Result<(), AlertError>;

    fn stop_alarm(&mut self);

    fn play_chime_once(&mut self) -> Result<(), AlertError>;

    /// Dispatch a system notification. Permission gating is the host's
    /// concern; the driver calls this regardless.
    fn fire_notification(
        &mut self,
        title: &str,
        body: &str,
        dedupe_key: &str,
    ) -> Result<(), AlertError>;
}

/// Alert bookkeeping, created empty and owned by one driver.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineState {
    pub selected_key: Option<TargetKey>,
    pub last_zone: Option<Zone>,
    pub alarm_active: bool,
    /// Keys whose notification already fired. Never pruned.
    pub notified_keys: HashSet<TargetKey>,
    pub audio_locked: bool,
}

/// What one driver step produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverOutput {
    pub snapshot: DisplaySnapshot,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone)]
pub struct AlertDriver {
    state: EngineState,
    /// Alarm is wanted but its playback attempt was refused.
    alarm_blocked: bool,
    notification_title: String,
}

impl Default for AlertDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertDriver {
    pub fn new() -> Self {
        Self {
            state: EngineState::default(),
            alarm_blocked: false,
            notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
        }
    }

    pub fn with_notification_title(mut self, title: impl Into<String>) -> Self {
        self.notification_title = title.into();
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Run one driver step. `classification` must be present exactly when
    /// `selection` holds a target.
    pub fn apply<P>(
        &mut self,
        selection: &Selection,
        classification: Option<&Classification>,
        now: NaiveDateTime,
        ports: &mut P,
    ) -> DriverOutput
    where
        P: AlertPorts + ?Sized,
    {
        let mut events = Vec::new();

        let new_key = selection.target().map(|t| t.key());
        if new_key != self.state.selected_key || *selection == Selection::NoActiveTasks {
            if new_key != self.state.selected_key {
                tracing::info!(
                    key = ?new_key.as_ref().map(ToString::to_string),
                    "Countdown target changed"
                );
                events.push(Event::TargetChanged {
                    key: new_key.clone(),
                    at: now,
                });
            }
            self.stop_alarm(ports, now, &mut events);
            self.state.last_zone = None;
            self.state.selected_key = new_key;
        }

        let (target, classification) = match (selection, classification) {
            (Selection::Selected(target), Some(c)) => (target, c),
            _ => {
                self.stop_alarm(ports, now, &mut events);
                return DriverOutput {
                    snapshot: DisplaySnapshot::informational(selection),
                    events,
                };
            }
        };
        let zone = classification.zone;
        let key = target.key();

        if zone == Zone::Done {
            self.stop_alarm(ports, now, &mut events);
            self.record_zone(zone, now, &mut events);
            return DriverOutput {
                snapshot: DisplaySnapshot::countdown(&target.task.title, classification),
                events,
            };
        }

        if zone.is_final_stretch() {
            self.notify_once(&key, &target.task.title, ports, now, &mut events);
        }

        if zone == Zone::Critical {
            if !self.state.alarm_active {
                self.start_alarm(&key, ports, now, &mut events);
            }
        } else {
            self.stop_alarm(ports, now, &mut events);
        }

        if let Some(last) = self.state.last_zone {
            if last != zone && zone != Zone::Critical {
                self.chime(zone, ports, now, &mut events);
            }
        }
        self.record_zone(zone, now, &mut events);

        DriverOutput {
            snapshot: DisplaySnapshot::countdown(&target.task.title, classification),
            events,
        }
    }

    /// Explicit user unlock. Clears the audio-lock flag and retries the
    /// alarm once if it should currently be playing.
    pub fn unlock_audio<P>(&mut self, ports: &mut P, now: NaiveDateTime) -> Vec<Event>
    where
        P: AlertPorts + ?Sized,
    {
        let mut events = Vec::new();
        self.set_audio_locked(false, now, &mut events);

        if self.state.alarm_active && self.alarm_blocked {
            match ports.play_alarm_loop() {
                Ok(()) => {
                    self.alarm_blocked = false;
                    if let Some(key) = self.state.selected_key.clone() {
                        tracing::info!(key = %key, "Alarm started after unlock");
                        events.push(Event::AlarmStarted { key, at: now });
                    }
                }
                Err(err) => self.playback_failed(err, now, &mut events),
            }
        }
        events
    }

    /// Stop the alarm for teardown.
    pub fn shutdown<P>(&mut self, ports: &mut P, now: NaiveDateTime) -> Vec<Event>
    where
        P: AlertPorts + ?Sized,
    {
        let mut events = Vec::new();
        self.stop_alarm(ports, now, &mut events);
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn record_zone(&mut self, zone: Zone, now: NaiveDateTime, events: &mut Vec<Event>) {
        if self.state.last_zone != Some(zone) {
            tracing::debug!(from = ?self.state.last_zone, to = %zone, "Zone changed");
            events.push(Event::ZoneChanged {
                from: self.state.last_zone,
                to: zone,
                at: now,
            });
        }
        self.state.last_zone = Some(zone);
    }

    fn notify_once<P>(
        &mut self,
        key: &TargetKey,
        task_title: &str,
        ports: &mut P,
        now: NaiveDateTime,
        events: &mut Vec<Event>,
    ) where
        P: AlertPorts + ?Sized,
    {
        if !self.state.notified_keys.insert(key.clone()) {
            return;
        }
        let dedupe_key = key.to_string();
        match ports.fire_notification(&self.notification_title, task_title, &dedupe_key) {
            Ok(()) => {
                tracing::info!(key = %dedupe_key, "Notification fired");
                events.push(Event::NotificationFired {
                    key: key.clone(),
                    title: self.notification_title.clone(),
                    body: task_title.to_string(),
                    at: now,
                });
            }
            Err(err) => {
                tracing::debug!(key = %dedupe_key, error = %err, "Notification skipped");
            }
        }
    }

    fn start_alarm<P>(
        &mut self,
        key: &TargetKey,
        ports: &mut P,
        now: NaiveDateTime,
        events: &mut Vec<Event>,
    ) where
        P: AlertPorts + ?Sized,
    {
        self.state.alarm_active = true;
        match ports.play_alarm_loop() {
            Ok(()) => {
                self.alarm_blocked = false;
                tracing::info!(key = %key, "Alarm started");
                events.push(Event::AlarmStarted {
                    key: key.clone(),
                    at: now,
                });
            }
            Err(err) => {
                self.alarm_blocked = true;
                self.playback_failed(err, now, events);
            }
        }
    }

    fn stop_alarm<P>(&mut self, ports: &mut P, now: NaiveDateTime, events: &mut Vec<Event>)
    where
        P: AlertPorts + ?Sized,
    {
        if !self.state.alarm_active {
            return;
        }
        ports.stop_alarm();
        self.state.alarm_active = false;
        self.alarm_blocked = false;
        tracing::info!("Alarm stopped");
        events.push(Event::AlarmStopped { at: now });
    }

    fn chime<P>(&mut self, zone: Zone, ports: &mut P, now: NaiveDateTime, events: &mut Vec<Event>)
    where
        P: AlertPorts + ?Sized,
    {
        match ports.play_chime_once() {
            Ok(()) => {
                tracing::info!(zone = %zone, "Chime played");
                events.push(Event::ChimePlayed { zone, at: now });
            }
            Err(err) => self.playback_failed(err, now, events),
        }
    }

    fn playback_failed(&mut self, err: AlertError, now: NaiveDateTime, events: &mut Vec<Event>) {
        match err {
            AlertError::AudioLocked => {
                tracing::warn!("Audio playback locked; waiting for user unlock");
                self.set_audio_locked(true, now, events);
            }
            other => tracing::warn!(error = %other, "Audio playback failed"),
        }
    }

    fn set_audio_locked(&mut self, locked: bool, now: NaiveDateTime, events: &mut Vec<Event>) {
        if self.state.audio_locked != locked {
            self.state.audio_locked = locked;
            events.push(Event::AudioLockChanged { locked, at: now });
        }
    }
}

/// Port double that records invocations instead of producing sound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingPorts {
    pub alarm_starts: usize,
    pub alarm_stops: usize,
    pub chimes: usize,
    /// `(title, body, dedupe_key)` per dispatched notification
    pub notifications: Vec<(String, String, String)>,
    /// Refuse audio with [`AlertError::AudioLocked`]
    pub audio_locked: bool,
    /// Refuse notifications with [`AlertError::NotificationUnavailable`]
    pub notifications_unavailable: bool,
}

impl AlertPorts for RecordingPorts {
    fn play_alarm_loop(&mut self) -> Result<(), AlertError> {
        if self.audio_locked {
            return Err(AlertError::AudioLocked);
        }
        self.alarm_starts += 1;
        Ok(())
    }

    fn stop_alarm(&mut self) {
        self.alarm_stops += 1;
    }

    fn play_chime_once(&mut self) -> Result<(), AlertError> {
        if self.audio_locked {
            return Err(AlertError::AudioLocked);
        }
        self.chimes += 1;
        Ok(())
    }

    fn fire_notification(
        &mut self,
        title: &str,
        body: &str,
        dedupe_key: &str,
    ) -> Result<(), AlertError> {
        if self.notifications_unavailable {
            return Err(AlertError::NotificationUnavailable);
        }
        self.notifications
            .push((title.to_string(), body.to_string(), dedupe_key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::selector::Target;
    use crate::countdown::zone::{classify, ZoneThresholds};
    use crate::task::Task;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn task(id: &str, title: &str) -> Task {
        serde_json::from_value(serde_json::json!({ "id": id, "title": title })).unwrap()
    }

    fn selected(id: &str, due: NaiveDateTime) -> Selection {
        Selection::Selected(Target {
            task: task(id, "Ship release"),
            due,
            start: None,
        })
    }

    /// Drive one tick the way the engine does.
    fn step(
        driver: &mut AlertDriver,
        selection: &Selection,
        now: NaiveDateTime,
        ports: &mut RecordingPorts,
    ) -> DriverOutput {
        let classification = selection
            .target()
            .map(|t| classify(t, now, &ZoneThresholds::default()));
        driver.apply(selection, classification.as_ref(), now, ports)
    }

    #[test]
    fn alarm_starts_once_per_critical_entry() {
        let mut driver = AlertDriver::new();
        let mut ports = RecordingPorts::default();
        let due = t0() + Duration::seconds(60);
        let sel = selected("a", due);

        for s in 0..30 {
            step(&mut driver, &sel, t0() + Duration::seconds(s), &mut ports);
        }
        assert_eq!(ports.alarm_starts, 1);
        assert!(driver.state().alarm_active);

        // Deadline pushed out by an edit of the same key would be a new key,
        // so leave Critical by moving time backwards instead.
        step(&mut driver, &sel, t0() - Duration::seconds(120), &mut ports);
        assert!(!driver.state().alarm_active);
        assert_eq!(ports.alarm_stops, 1);

        for s in 0..5 {
            step(&mut driver, &sel, t0() + Duration::seconds(s), &mut ports);
        }
        assert_eq!(ports.alarm_starts, 2);
    }

    #[test]
    fn alarm_stops_when_done() {
        let mut driver = AlertDriver::new();
        let mut ports = RecordingPorts::default();
        let due = t0() + Duration::seconds(30);
        let sel = selected("a", due);

        step(&mut driver, &sel, t0(), &mut ports);
        let out = step(&mut driver, &sel, due, &mut ports);
        assert_eq!(out.snapshot.time, "Done");
        assert!(!driver.state().alarm_active);
        assert_eq!(ports.alarm_stops, 1);
    }

    #[test]
    fn notification_fires_once_per_key() {
        let mut driver = AlertDriver::new();
        let mut ports = RecordingPorts::default();
        let due = t0() + Duration::seconds(300);
        let sel = selected("a", due);

        for s in 0..299 {
            step(&mut driver, &sel, t0() + Duration::seconds(s), &mut ports);
        }
        assert_eq!(ports.notifications.len(), 1);
        let (title, body, key) = &ports.notifications[0];
        assert_eq!(title, DEFAULT_NOTIFICATION_TITLE);
        assert_eq!(body, "Ship release");
        assert_eq!(key, "a@2024-06-01T12:05:00");

        // Switching away and back does not re-arm the same key.
        step(&mut driver, &Selection::NoActiveTasks, t0(), &mut ports);
        step(&mut driver, &sel, t0() + Duration::seconds(10), &mut ports);
        assert_eq!(ports.notifications.len(), 1);
    }

    #[test]
    fn unavailable_notifications_are_silent() {
        let mut driver = AlertDriver::new();
        let mut ports = RecordingPorts {
            notifications_unavailable: true,
            ..RecordingPorts::default()
        };
        let sel = selected("a", t0() + Duration::seconds(200));
        let out = step(&mut driver, &sel, t0(), &mut ports);
        assert!(out
            .events
            .iter()
            .all(|e| !matches!(e, Event::NotificationFired { .. })));
        assert!(driver.state().notified_keys.contains(&sel.target().unwrap().key()));
    }

    #[test]
    fn chime_on_escalation_but_not_into_critical() {
        let mut driver = AlertDriver::new();
        let mut ports = RecordingPorts::default();
        let due = t0() + Duration::seconds(400);
        let sel = selected("a", due);

        // Warning: first zone of a new target, no chime.
        step(&mut driver, &sel, t0(), &mut ports);
        assert_eq!(ports.chimes, 0);

        // Warning -> Imminent
        step(&mut driver, &sel, t0() + Duration::seconds(150), &mut ports);
        assert_eq!(ports.chimes, 1);

        // Imminent -> Critical: alarm instead of chime
        step(&mut driver, &sel, t0() + Duration::seconds(350), &mut ports);
        assert_eq!(ports.chimes, 1);
        assert_eq!(ports.alarm_starts, 1);
    }

    #[test]
    fn target_change_resets_state() {
        let mut driver = AlertDriver::new();
        let mut ports = RecordingPorts::default();
        let a = selected("a", t0() + Duration::seconds(30));
        step(&mut driver, &a, t0(), &mut ports);
        assert!(driver.state().alarm_active);

        let b = selected("b", t0() + Duration::hours(2));
        let out = step(&mut driver, &b, t0(), &mut ports);
        assert!(!driver.state().alarm_active);
        assert_eq!(ports.alarm_stops, 1);
        assert_eq!(ports.chimes, 0);
        assert_eq!(driver.state().selected_key, b.target().map(|t| t.key()));
        assert!(matches!(out.events[0], Event::TargetChanged { .. }));
    }

    #[test]
    fn display_only_states_clear_tracking() {
        let mut driver = AlertDriver::new();
        let mut ports = RecordingPorts::default();
        step(&mut driver, &selected("a", t0() + Duration::seconds(30)), t0(), &mut ports);

        let out = step(&mut driver, &Selection::NoneStartedYet, t0(), &mut ports);
        assert_eq!(out.snapshot.title, None);
        assert!(!driver.state().alarm_active);
        assert_eq!(driver.state().selected_key, None);
        assert_eq!(driver.state().last_zone, None);
    }

    #[test]
    fn locked_audio_is_flagged_and_not_retried_per_tick() {
        let mut driver = AlertDriver::new();
        let mut ports = RecordingPorts {
            audio_locked: true,
            ..RecordingPorts::default()
        };
        let sel = selected("a", t0() + Duration::seconds(30));

        let out = step(&mut driver, &sel, t0(), &mut ports);
        assert!(driver.state().audio_locked);
        assert!(out
            .events
            .contains(&Event::AudioLockChanged { locked: true, at: t0() }));

        let out = step(&mut driver, &sel, t0() + Duration::seconds(1), &mut ports);
        assert!(out.events.is_empty());
        assert_eq!(ports.alarm_starts, 0);

        ports.audio_locked = false;
        let events = driver.unlock_audio(&mut ports, t0() + Duration::seconds(2));
        assert!(!driver.state().audio_locked);
        assert_eq!(ports.alarm_starts, 1);
        assert!(events.iter().any(|e| matches!(e, Event::AlarmStarted { .. })));
    }

    #[test]
    fn unlock_does_not_restart_a_playing_alarm() {
        let mut driver = AlertDriver::new();
        let mut ports = RecordingPorts::default();
        step(&mut driver, &selected("a", t0() + Duration::seconds(30)), t0(), &mut ports);
        driver.unlock_audio(&mut ports, t0());
        assert_eq!(ports.alarm_starts, 1);
    }

    #[test]
    fn shutdown_silences_alarm() {
        let mut driver = AlertDriver::new();
        let mut ports = RecordingPorts::default();
        step(&mut driver, &selected("a", t0() + Duration::seconds(30)), t0(), &mut ports);
        let events = driver.shutdown(&mut ports, t0());
        assert_eq!(events, vec![Event::AlarmStopped { at: t0() }]);
        assert_eq!(ports.alarm_stops, 1);
    }
}
