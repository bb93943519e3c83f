//! Host frame loop.
//!
//! Stands in for a renderer's main loop: a fixed-rate tick drives
//! [`Interpreter::update`] with the real frame delta scaled by the playback
//! speed, and inbound transport lines are executed between frames.
//!
//! ```text
//!   ┌──────────────────────────┐
//!   │  Host::run()             │
//!   │  tokio::select! over:    │
//!   │  • frame interval        │──► Interpreter::update(delta × scale)
//!   │  • inbound lines         │──► Interpreter::execute(line)
//!   │  • SIGINT / SIGTERM      │
//!   └──────────────────────────┘
//! ```

use std::io::{self, Write};
use std::time::Duration;

use log::info;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::script::Interpreter;
use crate::transport::{Inbound, Origin};

pub struct Host {
    pub interp: Interpreter,
    frame: Duration,
    /// Keep running after the console closes (a TCP listener is up).
    serving: bool,
    console_closed: bool,
    quit: bool,
}

impl Host {
    pub fn new(interp: Interpreter, frame_rate: u32) -> Self {
        Self {
            interp,
            frame: Duration::from_secs(1) / frame_rate.max(1),
            serving: false,
            console_closed: false,
            quit: false,
        }
    }

    pub fn set_serving(&mut self, on: bool) {
        self.serving = on;
    }

    pub fn frame(&self) -> Duration {
        self.frame
    }

    /// The loop should end: `quit` was requested, or the console has closed
    /// with nothing left to play and no listener to serve.
    pub fn should_stop(&self) -> bool {
        self.quit || (self.console_closed && !self.serving && self.interp.playback().is_idle())
    }

    /// Handle one inbound transport message.
    pub fn handle(&mut self, msg: Inbound) {
        match msg {
            Inbound::Line { origin, text } => {
                let line = text.trim();
                if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                    info!("{origin}: {line}");
                    self.quit = true;
                    return;
                }
                if let Origin::Network(peer) = origin {
                    info!("{peer}: {line}");
                }
                let _ = self.interp.execute(line);
            }
            Inbound::Closed(Origin::Console) => self.console_closed = true,
            Inbound::Closed(Origin::Network(_)) => {}
        }
    }

    /// Advance one frame by `real` wall-clock time.
    pub fn tick(&mut self, real: Duration) {
        let scaled = real.mul_f64(self.interp.time_scale());
        self.interp.update(scaled);
    }

    /// Print and clear the interpreter's console echo.
    pub fn flush_output(&mut self) {
        let out = self.interp.take_output();
        if out.is_empty() {
            return;
        }
        let stdout = io::stdout();
        let mut guard = stdout.lock();
        for line in out {
            let _ = writeln!(guard, "{line}");
        }
        let _ = guard.flush();
    }

    /// Run until [`Host::should_stop`] or a termination signal.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<Inbound>) -> io::Result<()> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let mut frames = interval(self.frame);
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();

        while !self.should_stop() {
            tokio::select! {
                now = frames.tick() => {
                    self.tick(now.duration_since(last));
                    last = now;
                }
                msg = rx.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => self.console_closed = true,
                },
                _ = sigint.recv() => self.quit = true,
                _ = sigterm.recv() => self.quit = true,
            }
            self.flush_output();
        }

        self.interp.cancel();
        if let Some(path) = self.interp.stop_recording() {
            info!("recording closed: {}", path.display());
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> Inbound {
        Inbound::Line { origin: Origin::Console, text: text.into() }
    }

    #[test]
    fn frame_from_rate() {
        let host = Host::new(Interpreter::default(), 50);
        assert_eq!(host.frame(), Duration::from_millis(20));
    }

    #[test]
    fn quit_and_exit_stop() {
        let mut host = Host::new(Interpreter::default(), 60);
        host.handle(line("define a 1"));
        assert!(!host.should_stop());
        host.handle(line("  EXIT "));
        assert!(host.should_stop());
    }

    #[test]
    fn console_close_waits_for_playback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.sts");
        std::fs::write(&path, "wait duration 1\ndefine done 1\n").unwrap();
        let mut host = Host::new(Interpreter::default(), 60);
        host.interp.play_script(&path).unwrap();
        host.handle(Inbound::Closed(Origin::Console));
        assert!(!host.should_stop());
        host.tick(Duration::from_millis(16));
        host.tick(Duration::from_secs(1));
        assert!(host.interp.vars().contains("done"));
        assert!(host.should_stop());
    }

    #[test]
    fn serving_outlives_console() {
        let mut host = Host::new(Interpreter::default(), 60);
        host.set_serving(true);
        host.handle(Inbound::Closed(Origin::Console));
        assert!(!host.should_stop());
    }

    #[test]
    fn tick_scales_delta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.sts");
        std::fs::write(&path, "wait duration 2\ndefine done 1\n").unwrap();
        let mut host = Host::new(Interpreter::default(), 60);
        host.interp.play_script(&path).unwrap();
        host.tick(Duration::ZERO);
        host.interp.faster().unwrap();
        host.interp.faster().unwrap();
        host.tick(Duration::from_millis(500));
        assert!(host.interp.vars().contains("done"));
    }
}
