//! Live countdown in the terminal.
//!
//! The alarm loop is rendered as a bell on every tick while it is active; a
//! chime is a single bell. Notifications go to stderr.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use duebell_core::countdown::{spawn_engine, Color, EngineParts};
use duebell_core::storage::SoundConfig;
use duebell_core::{
    AlertError, AlertPorts, Config, CountdownEngine, DisplaySink, DisplaySnapshot, SystemClock,
    TaskFile,
};

const BELL: &str = "\x07";

struct TerminalPorts {
    sound: SoundConfig,
    notifications_enabled: bool,
    ringing: Arc<AtomicBool>,
}

impl AlertPorts for TerminalPorts {
    fn play_alarm_loop(&mut self) -> Result<(), AlertError> {
        if self.sound.enabled {
            self.ringing.store(true, Ordering::Relaxed);
        }
        Ok(())
    }

    fn stop_alarm(&mut self) {
        self.ringing.store(false, Ordering::Relaxed);
    }

    fn play_chime_once(&mut self) -> Result<(), AlertError> {
        if self.sound.enabled && self.sound.bell {
            print!("{BELL}");
        }
        Ok(())
    }

    fn fire_notification(
        &mut self,
        title: &str,
        body: &str,
        _dedupe_key: &str,
    ) -> Result<(), AlertError> {
        if !self.notifications_enabled {
            return Err(AlertError::NotificationUnavailable);
        }
        eprintln!("\n[{title}] {body}");
        Ok(())
    }
}

struct TerminalSink {
    bell: bool,
    ringing: Arc<AtomicBool>,
}

impl DisplaySink for TerminalSink {
    fn on_tick(&mut self, snapshot: &DisplaySnapshot) {
        let (open, close) = ansi(snapshot.color);
        let line = match &snapshot.title {
            Some(title) => format!("{title}  {open}{}{close}", snapshot.time),
            None => snapshot.time.clone(),
        };
        let bell = if self.bell && self.ringing.load(Ordering::Relaxed) {
            BELL
        } else {
            ""
        };
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "\r\x1b[2K{line}{bell}");
        let _ = stdout.flush();
    }

    fn on_audio_lock_changed(&mut self, locked: bool) {
        if locked {
            eprintln!("\nSound is blocked; enable audio to hear the alarm.");
        }
    }
}

fn ansi(color: Color) -> (&'static str, &'static str) {
    match color {
        Color::Neutral => ("\x1b[34m", "\x1b[0m"),
        Color::Caution => ("\x1b[33m", "\x1b[0m"),
        Color::Alert => ("\x1b[31m", "\x1b[0m"),
        Color::AlertPulse => ("\x1b[5;31m", "\x1b[0m"),
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let file = TaskFile::open_default()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let ringing = Arc::new(AtomicBool::new(false));
        let parts = EngineParts {
            source: file,
            ports: TerminalPorts {
                sound: config.sound.clone(),
                notifications_enabled: config.notifications.enabled,
                ringing: ringing.clone(),
            },
            sink: TerminalSink {
                bell: config.sound.enabled && config.sound.bell,
                ringing,
            },
            clock: SystemClock,
        };
        let (handle, join) = spawn_engine(
            CountdownEngine::from_config(&config),
            parts,
            config.tick_interval(),
        );

        tokio::signal::ctrl_c().await?;
        handle.cancel().await?;
        join.await?;
        println!();
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
