//! The boundary between the interpreter and the rest of the show.
//!
//! Camera, clock, media, scene and capture commands are not carried out by
//! the interpreter: it resolves the opcode and hands the parsed [`Command`]
//! to the host's [`Stage`] through the method for that command's
//! [`Capability`].  Every method has a default that reports the capability
//! as unsupported, so a host implements only what it has.
//!
//! A handler returns the wait the script should observe before the next
//! line (a camera move that takes two seconds returns two seconds).  It must
//! not block: anything slow is started here and polled by the collaborator
//! on later frames.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ScriptError;
use crate::script::registry::{Capability, Opcode};
use crate::script::token::Command;
use crate::var::VarStore;

/// What a delegated command returns: the wait before the next line.
pub type StageResult = Result<Duration, ScriptError>;

// ── ActionContext ─────────────────────────────────────────────────────────────

/// Services the interpreter lends to a collaborator for one command.
pub struct ActionContext<'a> {
    base_dir: &'a Path,
    vars: &'a VarStore,
    follow_ups: Vec<String>,
    records: Vec<String>,
}

impl<'a> ActionContext<'a> {
    pub fn new(base_dir: &'a Path, vars: &'a VarStore) -> Self {
        Self { base_dir, vars, follow_ups: Vec::new(), records: Vec::new() }
    }

    /// Directory of the script the command came from.
    pub fn base_dir(&self) -> &Path {
        self.base_dir
    }

    /// Resolve an asset path against the script's directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    /// Numeric value of an argument, with variable substitution.
    pub fn eval(&self, token: &str) -> f64 {
        self.vars.eval_double(token)
    }

    /// Numeric argument `key` of `cmd`, if present.
    pub fn number(&self, cmd: &Command, key: &str) -> Option<f64> {
        cmd.get(key).map(|v| self.eval(v))
    }

    /// Splice `text` at the head of the pending script, ahead of the line
    /// after this one.
    pub fn push_front(&mut self, text: impl Into<String>) {
        self.follow_ups.push(text.into());
    }

    /// Ask for `line` to be recorded (when a recording is running).
    pub fn record(&mut self, line: impl Into<String>) {
        self.records.push(line.into());
    }

    /// Requested follow-up lines and recorded lines, in request order.
    pub(crate) fn finish(self) -> (Vec<String>, Vec<String>) {
        (self.follow_ups, self.records)
    }
}

// ── Stage ─────────────────────────────────────────────────────────────────────

fn unsupported(op: Opcode) -> StageResult {
    Err(ScriptError::Unsupported(op.name().to_owned()))
}

/// Capabilities a host provides to the interpreter.
pub trait Stage {
    /// `camera`, `look`, `moveto`, `zoom`, `select`, `deselect`.
    fn camera(&mut self, op: Opcode, _cmd: &Command, _ctx: &mut ActionContext<'_>) -> StageResult {
        unsupported(op)
    }

    /// `date`, `timerate`.
    fn time(&mut self, op: Opcode, _cmd: &Command, _ctx: &mut ActionContext<'_>) -> StageResult {
        unsupported(op)
    }

    /// `audio`, `video`, `image`, `text`.
    fn media(&mut self, op: Opcode, _cmd: &Command, _ctx: &mut ActionContext<'_>) -> StageResult {
        unsupported(op)
    }

    /// `body`, `model`, `landscape`, `constellation`, `nebula`, `skyculture`, `meteors`.
    fn scene(&mut self, op: Opcode, _cmd: &Command, _ctx: &mut ActionContext<'_>) -> StageResult {
        unsupported(op)
    }

    /// `capture`, `screenshot`.
    fn capture(&mut self, op: Opcode, _cmd: &Command, _ctx: &mut ActionContext<'_>) -> StageResult {
        unsupported(op)
    }

    /// One `set <key> <value>` pair.
    fn set(&mut self, key: &str, _value: &str, _ctx: &mut ActionContext<'_>) -> Result<(), ScriptError> {
        Err(ScriptError::Unsupported(format!("set {key}")))
    }

    /// Bring time-sensitive streams (audio, video) back in step with the
    /// script clock after a resume or a return to normal speed.
    fn resync(&mut self) {}

    /// The playback speed multiplier changed.
    fn speed_changed(&mut self, _scale: f64) {}

    /// Route a delegated command to the method for its capability.
    fn perform(&mut self, op: Opcode, cmd: &Command, ctx: &mut ActionContext<'_>) -> StageResult {
        match op.capability() {
            Capability::Camera => self.camera(op, cmd, ctx),
            Capability::Time => self.time(op, cmd, ctx),
            Capability::Media => self.media(op, cmd, ctx),
            Capability::Scene => self.scene(op, cmd, ctx),
            Capability::Capture => self.capture(op, cmd, ctx),
            Capability::Core => unsupported(op),
        }
    }
}

/// A stage with no capabilities.  Flags and core commands still work.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStage;

impl Stage for NullStage {}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::token::parse;

    struct Camera {
        moves: Vec<String>,
    }

    impl Stage for Camera {
        fn camera(&mut self, _op: Opcode, cmd: &Command, ctx: &mut ActionContext<'_>) -> StageResult {
            self.moves.push(cmd.to_line());
            let secs = ctx.number(cmd, "duration").unwrap_or(0.0);
            Ok(Duration::from_secs_f64(secs.max(0.0)))
        }
    }

    #[test]
    fn perform_routes_by_capability() {
        let vars = VarStore::with_seed(0);
        let mut ctx = ActionContext::new(Path::new("/shows"), &vars);
        let mut stage = Camera { moves: Vec::new() };
        let cmd = parse("zoom fov 60 duration 2");
        assert_eq!(stage.perform(Opcode::Zoom, &cmd, &mut ctx), Ok(Duration::from_secs(2)));
        assert_eq!(stage.moves, ["zoom duration 2 fov 60"]);
    }

    #[test]
    fn missing_capability_is_unsupported() {
        let vars = VarStore::with_seed(0);
        let mut ctx = ActionContext::new(Path::new("/shows"), &vars);
        let cmd = parse("audio action play filename a.ogg");
        assert_eq!(
            NullStage.perform(Opcode::Audio, &cmd, &mut ctx),
            Err(ScriptError::Unsupported("audio".into()))
        );
    }

    #[test]
    fn context_resolves_relative_paths_and_variables() {
        let mut vars = VarStore::with_seed(0);
        vars.define("t", "4");
        let ctx = ActionContext::new(Path::new("/shows/intro"), &vars);
        assert_eq!(ctx.resolve("img/logo.png"), PathBuf::from("/shows/intro/img/logo.png"));
        assert_eq!(ctx.resolve("/abs/logo.png"), PathBuf::from("/abs/logo.png"));
        assert_eq!(ctx.eval("t"), 4.0);
    }
}
