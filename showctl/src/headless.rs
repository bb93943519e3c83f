//! A stage with no renderer behind it.
//!
//! [`HeadlessStage`] accepts every delegated command, logs it, and reports
//! the wait a real stage would: a `duration` argument on camera moves and
//! frame capture.  Display flags are kept in memory so `flag … toggle`
//! behaves exactly as it would against a live renderer.  Useful for
//! rehearsing and recording shows without the dome.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use log::{debug, info};

use crate::error::ScriptError;
use crate::flag::{bind_fn, Flag, FlagBoard};
use crate::script::interp::seconds;
use crate::script::registry::Opcode;
use crate::script::token::Command;
use crate::stage::{ActionContext, Stage, StageResult};

// ── SharedFlags ───────────────────────────────────────────────────────────────

/// In-memory flag state shared between the stage and the flag board.
#[derive(Debug, Clone, Default)]
pub struct SharedFlags(Rc<RefCell<HashMap<Flag, bool>>>);

impl SharedFlags {
    pub fn get(&self, flag: Flag) -> bool {
        self.0.borrow().get(&flag).copied().unwrap_or(false)
    }

    pub fn set(&self, flag: Flag, on: bool) {
        self.0.borrow_mut().insert(flag, on);
    }

    /// Bind every known flag on `board` to this state.
    pub fn bind_all(&self, board: &mut FlagBoard) {
        for &(_, flag) in Flag::NAMES {
            let (r, w) = (self.clone(), self.clone());
            board.bind(flag, bind_fn(move || r.get(flag), move |on| w.set(flag, on)));
        }
    }

    /// Names of the flags currently on, sorted.
    pub fn enabled(&self) -> Vec<&'static str> {
        let mut on: Vec<_> =
            self.0.borrow().iter().filter(|(_, on)| **on).map(|(f, _)| f.name()).collect();
        on.sort_unstable();
        on
    }
}

// ── HeadlessStage ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct HeadlessStage {
    flags: SharedFlags,
    settings: BTreeMap<String, String>,
    speed: f64,
}

impl Default for HeadlessStage {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessStage {
    pub fn new() -> Self {
        Self { flags: SharedFlags::default(), settings: BTreeMap::new(), speed: 1.0 }
    }

    /// Handle on the flag state, for binding and inspection.
    pub fn flags(&self) -> SharedFlags {
        self.flags.clone()
    }

    fn duration(cmd: &Command, ctx: &ActionContext<'_>) -> Duration {
        seconds(ctx.number(cmd, "duration").unwrap_or(0.0))
    }

    fn log(&self, op: Opcode, cmd: &Command, ctx: &ActionContext<'_>) {
        match cmd.get("filename") {
            Some(f) => info!("{}: {cmd} [{}]", op.capability().name(), ctx.resolve(f).display()),
            None => info!("{}: {cmd}", op.capability().name()),
        }
    }
}

impl Stage for HeadlessStage {
    fn camera(&mut self, op: Opcode, cmd: &Command, ctx: &mut ActionContext<'_>) -> StageResult {
        self.log(op, cmd, ctx);
        Ok(Self::duration(cmd, ctx))
    }

    fn time(&mut self, op: Opcode, cmd: &Command, ctx: &mut ActionContext<'_>) -> StageResult {
        self.log(op, cmd, ctx);
        Ok(Duration::ZERO)
    }

    fn media(&mut self, op: Opcode, cmd: &Command, ctx: &mut ActionContext<'_>) -> StageResult {
        self.log(op, cmd, ctx);
        Ok(Duration::ZERO)
    }

    fn scene(&mut self, op: Opcode, cmd: &Command, ctx: &mut ActionContext<'_>) -> StageResult {
        self.log(op, cmd, ctx);
        Ok(Duration::ZERO)
    }

    fn capture(&mut self, op: Opcode, cmd: &Command, ctx: &mut ActionContext<'_>) -> StageResult {
        self.log(op, cmd, ctx);
        Ok(Self::duration(cmd, ctx))
    }

    fn set(&mut self, key: &str, value: &str, _ctx: &mut ActionContext<'_>) -> Result<(), ScriptError> {
        if value.is_empty() {
            return Err(ScriptError::missing("set", key));
        }
        match self.settings.insert(key.to_owned(), value.to_owned()) {
            Some(old) => info!("set {key}: {old} -> {value}"),
            None => info!("set {key} = {value}"),
        }
        Ok(())
    }

    fn resync(&mut self) {
        debug!("resync media at x{}", self.speed);
    }

    fn speed_changed(&mut self, scale: f64) {
        self.speed = scale;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::token::parse;
    use crate::var::VarStore;
    use std::path::Path;

    #[test]
    fn camera_and_capture_honour_duration() {
        let vars = VarStore::with_seed(0);
        let mut ctx = ActionContext::new(Path::new("/shows"), &vars);
        let mut stage = HeadlessStage::new();
        let cmd = parse("moveto lat 45 lon 10 duration 2.5");
        assert_eq!(stage.perform(Opcode::MoveTo, &cmd, &mut ctx), Ok(Duration::from_millis(2500)));
        let cmd = parse("capture action start duration 1");
        assert_eq!(stage.perform(Opcode::Capture, &cmd, &mut ctx), Ok(Duration::from_secs(1)));
        let cmd = parse("audio action play filename music.ogg duration 30");
        assert_eq!(stage.perform(Opcode::Audio, &cmd, &mut ctx), Ok(Duration::ZERO));
    }

    #[test]
    fn set_keeps_values() {
        let vars = VarStore::with_seed(0);
        let mut ctx = ActionContext::new(Path::new("/shows"), &vars);
        let mut stage = HeadlessStage::new();
        stage.set("sky_brightness", "0.4", &mut ctx).unwrap();
        stage.set("sky_brightness", "0.6", &mut ctx).unwrap();
        assert_eq!(stage.settings.get("sky_brightness").map(String::as_str), Some("0.6"));
        assert!(stage.set("home_planet", "", &mut ctx).is_err());
    }

    #[test]
    fn shared_flags_back_the_board() {
        let stage = HeadlessStage::new();
        let flags = stage.flags();
        let mut board = FlagBoard::new();
        flags.bind_all(&mut board);
        board.set_flag("stars", "on").unwrap();
        board.set_flag("fog", "toggle").unwrap();
        board.set_flag("fog", "toggle").unwrap();
        board.set_flag("asterisms", "on").unwrap();
        assert!(flags.get(Flag::Stars));
        assert!(!flags.get(Flag::Fog));
        assert_eq!(flags.enabled(), ["star_lines", "stars"]);
    }
}
