//! Command recorder.
//!
//! While recording, every recordable command that executes is written back
//! out as script text, preceded by a synthetic `wait duration <seconds>`
//! line carrying the time since the previous recorded command.  Replaying
//! the file reproduces the original sequence and timing.
//!
//! The accumulator is advanced from the same per-frame clock call that
//! drives playback, whether or not a script is playing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use log::{error, info};

use crate::error::ScriptError;
use crate::var::format_number;

/// File extension for recorded and hand-written scripts.
pub const SCRIPT_EXTENSION: &str = "sts";

/// Default file name for a recording started without one.
pub fn auto_name(dir: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y-%m-%d_%H%M%S");
    dir.join(format!("record_{stamp}.{SCRIPT_EXTENSION}"))
}

/// Render the synthetic wait line for `elapsed`, rounded to milliseconds.
pub fn wait_line(elapsed: Duration) -> String {
    let secs = (elapsed.as_secs_f64() * 1000.0).round() / 1000.0;
    format!("wait duration {}", format_number(secs))
}

// ── Recorder ──────────────────────────────────────────────────────────────────

struct Sink {
    out: Box<dyn Write>,
    /// `None` for caller-supplied writers.
    path: Option<PathBuf>,
}

impl Sink {
    fn label(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from("<recording>"))
    }
}

#[derive(Default)]
pub struct Recorder {
    sink: Option<Sink>,
    since_last: Duration,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("path", &self.sink.as_ref().and_then(|s| s.path.as_ref()))
            .field("since_last", &self.since_last)
            .finish()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.sink.is_some()
    }

    /// Path of the file being recorded, if any.
    pub fn path(&self) -> Option<&Path> {
        self.sink.as_ref().and_then(|s| s.path.as_deref())
    }

    /// Time accumulated since the last recorded command.
    pub fn since_last(&self) -> Duration {
        self.since_last
    }

    /// Open `path` for writing and start recording.
    ///
    /// On failure nothing changes: a recording already in progress carries on,
    /// unless it was writing to `path` itself, in which case it is closed
    /// before the file is reopened.
    pub fn start(&mut self, path: &Path) -> Result<(), ScriptError> {
        if self.path() == Some(path) {
            self.stop();
        }
        let file = File::create(path).map_err(|e| ScriptError::io(path, &e))?;
        self.stop();
        info!("recording to {}", path.display());
        self.sink = Some(Sink { out: Box::new(BufWriter::new(file)), path: Some(path.to_path_buf()) });
        self.since_last = Duration::ZERO;
        Ok(())
    }

    /// Record into an arbitrary writer.
    pub fn start_with_writer(&mut self, out: Box<dyn Write>) {
        self.stop();
        self.sink = Some(Sink { out, path: None });
        self.since_last = Duration::ZERO;
    }

    /// Advance the accumulator by one frame delta.
    pub fn advance(&mut self, delta: Duration) {
        if self.sink.is_some() {
            self.since_last += delta;
        }
    }

    /// Append `line`, preceded by the wait since the previous command.
    /// A no-op while not recording.
    pub fn record(&mut self, line: &str) -> Result<(), ScriptError> {
        let Some(sink) = self.sink.as_mut() else { return Ok(()) };
        let wait = wait_line(self.since_last);
        writeln!(sink.out, "{wait}")
            .and_then(|_| writeln!(sink.out, "{}", line.trim()))
            .map_err(|e| ScriptError::io(sink.label(), &e))?;
        self.since_last = Duration::ZERO;
        Ok(())
    }

    /// Flush and close the sink.  Returns the recorded file, if there was one.
    pub fn stop(&mut self) -> Option<PathBuf> {
        let mut sink = self.sink.take()?;
        if let Err(e) = sink.out.flush() {
            error!("recording: {}: {e}", sink.label().display());
        }
        if let Some(p) = &sink.path {
            info!("recording saved to {}", p.display());
        }
        sink.path
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_line_rounds_to_milliseconds() {
        assert_eq!(wait_line(Duration::from_millis(1500)), "wait duration 1.5");
        assert_eq!(wait_line(Duration::from_micros(2_000_400)), "wait duration 2");
        assert_eq!(wait_line(Duration::ZERO), "wait duration 0");
    }

    #[test]
    fn auto_name_has_timestamp_and_extension() {
        let p = auto_name(Path::new("/rec"));
        let name = p.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("record_"), "{name}");
        assert!(name.ends_with(".sts"), "{name}");
        assert_eq!(p.parent(), Some(Path::new("/rec")));
    }

    #[test]
    fn record_is_noop_when_off() {
        let mut r = Recorder::new();
        r.advance(Duration::from_secs(3));
        assert_eq!(r.record("flag stars on"), Ok(()));
        assert_eq!(r.since_last(), Duration::ZERO);
    }

    #[test]
    fn records_waits_between_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take1.sts");
        let mut r = Recorder::new();
        r.start(&path).unwrap();
        r.advance(Duration::from_millis(250));
        r.record("flag stars on").unwrap();
        r.advance(Duration::from_millis(1000));
        r.advance(Duration::from_millis(500));
        r.record("flag stars off").unwrap();
        assert_eq!(r.stop(), Some(path.clone()));

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            [
                "wait duration 0.25",
                "flag stars on",
                "wait duration 1.5",
                "flag stars off",
            ]
        );
    }

    #[test]
    fn failed_start_keeps_current_recording() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.sts");
        let mut r = Recorder::new();
        r.start(&good).unwrap();
        let bad = dir.path().join("no/such/dir/x.sts");
        assert!(matches!(r.start(&bad), Err(ScriptError::Io { .. })));
        assert_eq!(r.path(), Some(good.as_path()));
    }

    #[test]
    fn restart_on_same_path_starts_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.sts");
        let mut r = Recorder::new();
        r.start(&path).unwrap();
        r.record("flag stars on").unwrap();
        r.start(&path).unwrap();
        r.advance(Duration::from_millis(500));
        r.record("flag fog on").unwrap();
        r.stop();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "wait duration 0.5\nflag fog on\n");
    }
}
