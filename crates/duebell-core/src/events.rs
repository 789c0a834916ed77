use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::countdown::{TargetKey, Zone};

/// Every side effect or state change the alert driver performs produces an
/// Event. The UI may render them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The tracked (task, due) pair changed, or tracking stopped.
    TargetChanged {
        key: Option<TargetKey>,
        at: NaiveDateTime,
    },
    ZoneChanged {
        from: Option<Zone>,
        to: Zone,
        at: NaiveDateTime,
    },
    AlarmStarted {
        key: TargetKey,
        at: NaiveDateTime,
    },
    AlarmStopped {
        at: NaiveDateTime,
    },
    ChimePlayed {
        zone: Zone,
        at: NaiveDateTime,
    },
    /// Five-minute notification dispatched for this key.
    NotificationFired {
        key: TargetKey,
        title: String,
        body: String,
        at: NaiveDateTime,
    },
    /// Audio playback became blocked, or was unlocked by the user.
    AudioLockChanged {
        locked: bool,
        at: NaiveDateTime,
    },
}
