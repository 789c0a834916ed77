//! Engine loop actor.
//!
//! A single tokio task owns the engine, the task source, the effect ports and
//! the display sink. Ticks and collaborator commands are handled on that one
//! task, so a tick never observes a half-applied mutation.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::alert::AlertPorts;
use super::clock::Clock;
use super::engine::{CountdownEngine, DisplaySink};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::task::recurrence::{toggle_complete, ToggleOutcome};
use crate::task::TaskSource;

/// Buffer size for the command channel between EngineHandle and the loop.
const COMMAND_CHANNEL_BUFFER: usize = 32;

/// Reference cadence.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub enum EngineCommand {
    ToggleComplete {
        task_id: String,
        response: oneshot::Sender<Result<ToggleOutcome>>,
    },
    UnlockAudio {
        response: oneshot::Sender<()>,
    },
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

/// Everything the loop owns besides the engine itself.
pub struct EngineParts<S, P, K, C> {
    pub source: S,
    pub ports: P,
    pub sink: K,
    pub clock: C,
}

/// Handle for controlling a running engine loop.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        build_command: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(build_command(response_tx))
            .await
            .map_err(|_| CoreError::EngineStopped)?;
        response_rx.await.map_err(|_| CoreError::EngineStopped)
    }

    /// Toggle a task's completion between ticks, spawning its successor if
    /// it recurs.
    pub async fn toggle_complete(&self, task_id: impl Into<String>) -> Result<ToggleOutcome> {
        let task_id = task_id.into();
        self.request(|response| EngineCommand::ToggleComplete { task_id, response })
            .await?
    }

    /// Forward an explicit user unlock gesture to the alert driver.
    pub async fn unlock_audio(&self) -> Result<()> {
        self.request(|response| EngineCommand::UnlockAudio { response })
            .await
    }

    /// Stop the loop. Once this returns no further tick fires and the alarm
    /// has been stopped.
    pub async fn cancel(&self) -> Result<()> {
        self.request(|response| EngineCommand::Shutdown { response })
            .await
    }

    pub fn is_running(&self) -> bool {
        !self.command_tx.is_closed()
    }
}

/// Spawn the engine loop. The join handle yields the task source back once
/// the loop has stopped.
pub fn spawn_engine<S, P, K, C>(
    engine: CountdownEngine,
    parts: EngineParts<S, P, K, C>,
    tick_interval: Duration,
) -> (EngineHandle, JoinHandle<S>)
where
    S: TaskSource + Send + 'static,
    P: AlertPorts + Send + 'static,
    K: DisplaySink + Send + 'static,
    C: Clock + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_BUFFER);
    let join = tokio::spawn(run(engine, parts, tick_interval, command_rx));
    (EngineHandle { command_tx }, join)
}

async fn run<S, P, K, C>(
    mut engine: CountdownEngine,
    mut parts: EngineParts<S, P, K, C>,
    tick_interval: Duration,
    mut command_rx: mpsc::Receiver<EngineCommand>,
) -> S
where
    S: TaskSource,
    P: AlertPorts,
    K: DisplaySink,
    C: Clock,
{
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(interval_ms = tick_interval.as_millis() as u64, "Countdown engine started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let tasks = parts.source.task_snapshot();
                let now = parts.clock.now();
                engine.tick(&tasks, now, &mut parts.ports).publish(&mut parts.sink);
            }

            command = command_rx.recv() => {
                match command {
                    Some(EngineCommand::ToggleComplete { task_id, response }) => {
                        let result = toggle_complete(&mut parts.source, &task_id, Utc::now());
                        if let Err(ref e) = result {
                            tracing::warn!(task_id = %task_id, error = %e, "Toggle complete failed");
                        }
                        let _ = response.send(result);
                    }
                    Some(EngineCommand::UnlockAudio { response }) => {
                        let events = engine.unlock_audio(&mut parts.ports, parts.clock.now());
                        forward(&events, &mut parts.sink);
                        let _ = response.send(());
                    }
                    Some(EngineCommand::Shutdown { response }) => {
                        let events = engine.shutdown(&mut parts.ports, parts.clock.now());
                        forward(&events, &mut parts.sink);
                        tracing::info!("Countdown engine stopped");
                        let _ = response.send(());
                        break;
                    }
                    None => {
                        // Every handle dropped.
                        let events = engine.shutdown(&mut parts.ports, parts.clock.now());
                        forward(&events, &mut parts.sink);
                        tracing::info!("Countdown engine stopped (handles dropped)");
                        break;
                    }
                }
            }
        }
    }

    parts.source
}

fn forward<K: DisplaySink>(events: &[Event], sink: &mut K) {
    for event in events {
        if let Event::AudioLockChanged { locked, .. } = event {
            sink.on_audio_lock_changed(*locked);
        }
        sink.on_event(event);
    }
}
