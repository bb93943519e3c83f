//! Playback clock state.
//!
//! [`Playback`] does elapsed-time accounting only; it never sleeps.  The
//! interpreter feeds it every frame delta and asks [`Playback::is_due`]
//! whether the pending wait has been covered, then pulls and dispatches one
//! line and stores that line's wait with [`Playback::set_wait`].  A large
//! delta therefore drains several short-wait lines in a single update.
//!
//! The speed step is bounded to `±MAX_SPEED_STEP` and only scales the
//! multiplier reported by [`Playback::time_scale`]; the host applies it to
//! the deltas it passes in.

use std::fmt;
use std::time::Duration;

use crate::error::ScriptError;

/// Largest number of `faster`/`slower` steps away from normal speed.
pub const MAX_SPEED_STEP: i8 = 2;

// ── PlaybackState ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        })
    }
}

// ── SpeedChange ───────────────────────────────────────────────────────────────

/// Result of a `faster`/`slower` request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedChange {
    pub step: i8,
    pub scale: f64,
    /// The step moved at all (false when already at the bound).
    pub changed: bool,
    /// The step came back to normal speed; paired streams should resync.
    pub back_to_normal: bool,
}

// ── Playback ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Playback {
    state: PlaybackState,
    elapsed: Duration,
    pending_wait: Duration,
    speed_step: i8,
}

impl Playback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Playing and not paused.
    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_idle(&self) -> bool {
        self.state == PlaybackState::Idle
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn pending_wait(&self) -> Duration {
        self.pending_wait
    }

    pub fn speed_step(&self) -> i8 {
        self.speed_step
    }

    /// Multiplier for apparent time: `2^step`.
    pub fn time_scale(&self) -> f64 {
        2f64.powi(self.speed_step as i32)
    }

    /// Enter `Playing` with a fresh clock and normal speed.
    ///
    /// Returns `true` if the speed had to be reset.
    pub fn start(&mut self) -> bool {
        let reset_speed = self.speed_step != 0;
        self.state = PlaybackState::Playing;
        self.elapsed = Duration::ZERO;
        self.pending_wait = Duration::ZERO;
        self.speed_step = 0;
        reset_speed
    }

    /// Back to `Idle` with every counter cleared.  Safe in any state.
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    /// Accumulate a frame delta while running.
    pub fn advance(&mut self, delta: Duration) {
        if self.is_running() {
            self.elapsed += delta;
        }
    }

    /// The pending wait has been covered and the next line may be pulled.
    pub fn is_due(&self) -> bool {
        self.is_running() && self.elapsed >= self.pending_wait
    }

    /// Pay for the pending wait out of the accumulated time.
    pub fn consume_wait(&mut self) {
        self.elapsed = self.elapsed.saturating_sub(self.pending_wait);
        self.pending_wait = Duration::ZERO;
    }

    pub fn set_wait(&mut self, wait: Duration) {
        self.pending_wait = wait;
    }

    /// Flip between `Playing` and `Paused`.
    pub fn toggle_pause(&mut self) -> Result<PlaybackState, ScriptError> {
        self.state = match self.state {
            PlaybackState::Playing => PlaybackState::Paused,
            PlaybackState::Paused => PlaybackState::Playing,
            PlaybackState::Idle => {
                return Err(ScriptError::State("no script is playing".into()));
            }
        };
        Ok(self.state)
    }

    /// Leave `Paused`.  Returns `false` if playback was not paused.
    pub fn resume(&mut self) -> bool {
        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
            true
        } else {
            false
        }
    }

    pub fn faster(&mut self) -> Result<SpeedChange, ScriptError> {
        self.step_speed(1)
    }

    pub fn slower(&mut self) -> Result<SpeedChange, ScriptError> {
        self.step_speed(-1)
    }

    fn step_speed(&mut self, dir: i8) -> Result<SpeedChange, ScriptError> {
        if !self.is_running() {
            return Err(ScriptError::State(format!(
                "speed can only change while playing (currently {})",
                self.state
            )));
        }
        let old = self.speed_step;
        let new = (old + dir).clamp(-MAX_SPEED_STEP, MAX_SPEED_STEP);
        self.speed_step = new;
        Ok(SpeedChange {
            step: new,
            scale: self.time_scale(),
            changed: new != old,
            back_to_normal: new == 0 && old != 0,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn playing() -> Playback {
        let mut p = Playback::new();
        p.start();
        p
    }

    #[test]
    fn idle_does_not_accumulate() {
        let mut p = Playback::new();
        p.advance(ms(100));
        assert_eq!(p.elapsed(), Duration::ZERO);
        assert!(!p.is_due());
    }

    #[test]
    fn due_immediately_after_start() {
        let p = playing();
        assert!(p.is_due());
    }

    #[test]
    fn wait_accounting() {
        let mut p = playing();
        p.advance(ms(16));
        p.consume_wait();
        p.set_wait(ms(500));
        assert!(!p.is_due());
        p.advance(ms(300));
        assert!(!p.is_due());
        p.advance(ms(200));
        assert!(p.is_due());
        p.consume_wait();
        assert_eq!(p.elapsed(), ms(16));
    }

    #[test]
    fn paused_does_not_accumulate() {
        let mut p = playing();
        p.toggle_pause().unwrap();
        p.advance(ms(1000));
        assert_eq!(p.elapsed(), Duration::ZERO);
        assert!(!p.is_due());
        assert!(p.resume());
        assert!(!p.resume());
    }

    #[test]
    fn pause_when_idle_is_error() {
        let mut p = Playback::new();
        assert!(p.toggle_pause().is_err());
    }

    #[test]
    fn speed_bounded_both_ways() {
        let mut p = playing();
        for _ in 0..5 {
            p.faster().unwrap();
        }
        assert_eq!(p.speed_step(), MAX_SPEED_STEP);
        assert!(!p.faster().unwrap().changed);
        assert_eq!(p.time_scale(), 4.0);
        for _ in 0..10 {
            p.slower().unwrap();
        }
        assert_eq!(p.speed_step(), -MAX_SPEED_STEP);
        assert_eq!(p.time_scale(), 0.25);
    }

    #[test]
    fn crossing_back_to_normal_is_reported() {
        let mut p = playing();
        assert!(!p.faster().unwrap().back_to_normal);
        assert!(p.slower().unwrap().back_to_normal);
        assert!(!p.slower().unwrap().back_to_normal);
    }

    #[test]
    fn speed_change_requires_playing() {
        let mut p = playing();
        p.toggle_pause().unwrap();
        assert!(p.faster().is_err());
        let mut idle = Playback::new();
        assert!(idle.slower().is_err());
    }

    #[test]
    fn start_resets_speed() {
        let mut p = playing();
        p.faster().unwrap();
        assert!(p.start());
        assert_eq!(p.speed_step(), 0);
    }

    #[test]
    fn stop_is_always_safe() {
        let mut p = Playback::new();
        p.stop();
        p.stop();
        assert!(p.is_idle());
    }
}
