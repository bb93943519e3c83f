//! Control-flow state: suppression flags and the loop buffer.
//!
//! Suppression is the OR of two independent booleans, `commented` and
//! `if_suppressed`.  There is no stack: `comment` twice followed by one
//! `uncomment` leaves the interpreter unsuppressed, and an `if` inside an
//! `if` simply overwrites the outer state.
//!
//! A loop is declared with a repeat count.  Its first pass runs live while
//! the pulled lines are captured; once `loop end` closes the capture, the
//! clock pulls from the buffer instead of the script until the remaining
//! repeats are used up.

use std::collections::VecDeque;

use log::debug;

use super::source::Line;
use crate::error::ScriptError;

// ── LoopBuffer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// First pass: lines execute live and are appended to the buffer.
    Capturing,
    /// Later passes: lines come from the buffer.
    Replaying,
}

/// Lines captured from a loop's first pass, with a replay cursor.
#[derive(Debug, Clone)]
pub struct LoopBuffer {
    lines: Vec<Line>,
    cursor: usize,
    /// Passes still to run after the one in progress.
    repeat: u32,
    phase: LoopPhase,
    /// Follow-ups spliced in during a replay; served before the next
    /// buffered line and never replayed.
    spliced: VecDeque<Line>,
}

impl LoopBuffer {
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn remaining(&self) -> u32 {
        self.repeat
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ── ControlState ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ControlState {
    commented: bool,
    if_suppressed: bool,
    /// Set by `loop <n>` with `n < 1`: swallow exactly one line.
    skip_next: bool,
    looping: Option<LoopBuffer>,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_suppressed(&self) -> bool {
        self.commented || self.if_suppressed
    }

    pub fn is_commented(&self) -> bool {
        self.commented
    }

    pub fn is_if_suppressed(&self) -> bool {
        self.if_suppressed
    }

    pub fn set_commented(&mut self, on: bool) {
        self.commented = on;
    }

    // ── if ────────────────────────────────────────────────────────────────────

    /// `if <expr>`: a zero value suppresses; a non-zero value leaves the
    /// current state untouched.
    pub fn begin_if(&mut self, value: f64) {
        if value == 0.0 {
            self.if_suppressed = true;
        }
    }

    pub fn flip_if(&mut self) {
        self.if_suppressed = !self.if_suppressed;
    }

    pub fn end_if(&mut self) {
        self.if_suppressed = false;
    }

    // ── one-shot skip ─────────────────────────────────────────────────────────

    /// Consume the pending one-shot skip, if any.
    pub fn take_skip(&mut self) -> bool {
        std::mem::take(&mut self.skip_next)
    }

    pub fn skip_pending(&self) -> bool {
        self.skip_next
    }

    // ── loop ──────────────────────────────────────────────────────────────────

    /// `loop <count>`.
    ///
    /// `count < 1` skips the next line, `count == 1` is a no-op, and larger
    /// counts start capturing with `count - 1` repeats to follow.
    pub fn begin_loop(&mut self, count: f64) -> Result<(), ScriptError> {
        let n = count.trunc();
        if n < 1.0 {
            debug!("loop {count}: skipping next line");
            self.skip_next = true;
        } else if n > 1.0 {
            if self.looping.is_some() {
                return Err(ScriptError::State("nested loops are not supported".into()));
            }
            let repeat = (n - 1.0).min(u32::MAX as f64) as u32;
            debug!("loop: capturing, {repeat} repeats to follow");
            self.looping = Some(LoopBuffer {
                lines: Vec::new(),
                cursor: 0,
                repeat,
                phase: LoopPhase::Capturing,
                spliced: VecDeque::new(),
            });
        }
        Ok(())
    }

    /// `loop end`: close an open capture and start replaying it, or abandon
    /// a replay in progress.
    pub fn end_loop(&mut self) {
        let Some(buf) = self.looping.as_mut() else { return };
        if buf.phase == LoopPhase::Capturing && !buf.lines.is_empty() {
            debug!("loop end: replaying {} lines {} more times", buf.lines.len(), buf.repeat);
            buf.phase = LoopPhase::Replaying;
            buf.cursor = 0;
            return;
        }
        debug!("loop end: discarding loop buffer");
        self.looping = None;
    }

    pub fn is_capturing(&self) -> bool {
        matches!(&self.looping, Some(b) if b.phase == LoopPhase::Capturing)
    }

    pub fn is_replaying(&self) -> bool {
        matches!(&self.looping, Some(b) if b.phase == LoopPhase::Replaying)
    }

    pub fn loop_buffer(&self) -> Option<&LoopBuffer> {
        self.looping.as_ref()
    }

    /// Append a line pulled from the script during the capture pass.
    pub fn capture(&mut self, line: &Line) {
        if let Some(buf) = self.looping.as_mut() {
            if buf.phase == LoopPhase::Capturing {
                buf.lines.push(line.clone());
            }
        }
    }

    /// Pull the next replayed line.
    ///
    /// When the pull empties the buffer, one repeat is used up: the cursor
    /// rewinds if repeats remain, otherwise the loop ends and the next pull
    /// goes back to the script.
    pub fn next_replay(&mut self) -> Option<Line> {
        let buf = self.looping.as_mut()?;
        if buf.phase != LoopPhase::Replaying {
            return None;
        }
        if let Some(line) = buf.spliced.pop_front() {
            return Some(line);
        }
        let line = buf.lines.get(buf.cursor)?.clone();
        buf.cursor += 1;
        if buf.cursor >= buf.lines.len() {
            buf.repeat = buf.repeat.saturating_sub(1);
            if buf.repeat == 0 {
                debug!("loop finished");
                self.looping = None;
            } else {
                buf.cursor = 0;
            }
        }
        Some(line)
    }

    /// Run `lines` next, ahead of the rest of the replay, without adding
    /// them to the buffer.  Does nothing unless a replay is in progress.
    pub fn splice(&mut self, lines: impl IntoIterator<Item = Line>) {
        let Some(buf) = self.looping.as_mut() else { return };
        if buf.phase != LoopPhase::Replaying {
            return;
        }
        let new: Vec<Line> = lines.into_iter().collect();
        for line in new.into_iter().rev() {
            buf.spliced.push_front(line);
        }
    }

    /// Drop the loop buffer and any pending skip.  Suppression flags are kept.
    pub fn clear_loop(&mut self) {
        self.looping = None;
        self.skip_next = false;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
