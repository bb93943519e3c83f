//! Show script interpreter.
//!
//! The [`Interpreter`] owns every piece of scripting state (registry, flag
//! board, variables, control flow, the playing script, the playback clock
//! and the recorder) and is driven from one thread by two entry points:
//!
//! * [`Interpreter::execute`] runs a single line now.  Console and network
//!   transports call it directly, so they share suppression state with the
//!   playing script.
//! * [`Interpreter::update`] advances the clock by one frame delta and
//!   dispatches every script line whose wait has been covered.
//!
//! Camera, media and other show commands are handed to the host's
//! [`Stage`]; everything in this file is the dispatch shell around them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info, warn};

use super::control::ControlState;
use super::registry::{Opcode, Registry};
use super::source::{is_script_line, Line, Script};
use super::token::{parse, Command};
use crate::error::ScriptError;
use crate::flag::FlagBoard;
use crate::playback::{Playback, PlaybackState, SpeedChange};
use crate::recorder::{auto_name, Recorder, SCRIPT_EXTENSION};
use crate::stage::{ActionContext, NullStage, Stage};
use crate::var::{format_number, VarStore};

/// Signature shared by `VarStore::add` and `VarStore::multiply`.
type VarUpdate = fn(&mut VarStore, &str, &str) -> Result<f64, ScriptError>;

/// Seconds to a wait: negative counts as zero, overflow saturates.
pub(crate) fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

fn resolve_in(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let p = path.as_ref();
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

// ── Interpreter ───────────────────────────────────────────────────────────────

pub struct Interpreter {
    registry: Registry,
    flags: FlagBoard,
    vars: VarStore,
    control: ControlState,
    /// The script being played; `None` while idle.
    script: Option<Script>,
    playback: Playback,
    recorder: Recorder,
    stage: Box<dyn Stage>,
    last_error: Option<ScriptError>,
    /// Console echo (`print` output and `% error` lines), drained by the host.
    pub output: Vec<String>,
    /// Base directory for lines that do not come from a script file.
    script_dir: PathBuf,
    /// Where recordings are written when no absolute path is given.
    record_dir: PathBuf,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("playback", &self.playback)
            .field("control", &self.control)
            .field("recorder", &self.recorder)
            .field("vars", &self.vars.len())
            .finish()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Box::new(NullStage))
    }
}

impl Interpreter {
    pub fn new(stage: Box<dyn Stage>) -> Self {
        Self::with_vars(stage, VarStore::new())
    }

    /// Construct with a prepared variable store (seeded, pre-defined).
    pub fn with_vars(stage: Box<dyn Stage>, vars: VarStore) -> Self {
        Self {
            registry: Registry::new(),
            flags: FlagBoard::new(),
            vars,
            control: ControlState::new(),
            script: None,
            playback: Playback::new(),
            recorder: Recorder::new(),
            stage,
            last_error: None,
            output: Vec::new(),
            script_dir: PathBuf::from("."),
            record_dir: PathBuf::from("."),
        }
    }

    pub fn set_script_dir(&mut self, dir: impl Into<PathBuf>) {
        self.script_dir = dir.into();
    }

    pub fn set_record_dir(&mut self, dir: impl Into<PathBuf>) {
        self.record_dir = dir.into();
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    /// Speed multiplier the host applies to frame deltas.
    pub fn time_scale(&self) -> f64 {
        self.playback.time_scale()
    }

    /// The failure of the most recent `execute` call, if it failed.
    pub fn last_error(&self) -> Option<&ScriptError> {
        self.last_error.as_ref()
    }

    pub fn vars(&self) -> &VarStore {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VarStore {
        &mut self.vars
    }

    pub fn control(&self) -> &ControlState {
        &self.control
    }

    pub fn flags(&self) -> &FlagBoard {
        &self.flags
    }

    /// Where collaborators register their flag bindings.
    pub fn flags_mut(&mut self) -> &mut FlagBoard {
        &mut self.flags
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Lines still pending in the playing script.
    pub fn pending_lines(&self) -> usize {
        self.script.as_ref().map_or(0, Script::len)
    }

    /// Take the accumulated console echo.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn active_base_dir(&self) -> PathBuf {
        match &self.script {
            Some(s) => s.base_dir().to_path_buf(),
            None => self.script_dir.clone(),
        }
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    /// Run one line immediately and return the wait it asks for.
    ///
    /// Relative paths resolve against the playing script's directory, or the
    /// configured script directory while idle.
    pub fn execute(&mut self, text: &str) -> Result<Duration, ScriptError> {
        let line = Line::new(text.trim(), self.active_base_dir());
        self.execute_line(&line)
    }

    fn execute_line(&mut self, line: &Line) -> Result<Duration, ScriptError> {
        self.last_error = None;
        let cmd = parse(&line.text);
        if cmd.is_empty() {
            return Ok(Duration::ZERO);
        }
        if self.control.take_skip() {
            debug!("skip: {}", line.text);
            return Ok(Duration::ZERO);
        }

        let op = self.registry.lookup(&cmd.name);
        let result = match op {
            Some(op) if op.is_structural() => self.dispatch(op, &cmd, line),
            _ if self.control.is_suppressed() => {
                debug!("suppressed: {}", line.text);
                return Ok(Duration::ZERO);
            }
            None => Err(ScriptError::UnknownCommand(cmd.name.clone())),
            Some(op) => {
                debug!("exec: {}", line.text);
                self.dispatch(op, &cmd, line)
            }
        };

        match result {
            Ok(wait) => {
                if op.is_some_and(Opcode::is_recordable) {
                    self.record_command(&line.text);
                }
                Ok(wait)
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    fn report(&mut self, e: &ScriptError) {
        match e {
            ScriptError::Io { .. } => error!("{e}"),
            _ => warn!("{e}"),
        }
        self.output.push(format!("% {e}"));
        self.last_error = Some(e.clone());
    }

    fn dispatch(&mut self, op: Opcode, cmd: &Command, line: &Line) -> Result<Duration, ScriptError> {
        match op {
            Opcode::Comment => {
                self.control.set_commented(true);
                Ok(Duration::ZERO)
            }
            Opcode::Uncomment => {
                self.control.set_commented(false);
                Ok(Duration::ZERO)
            }
            Opcode::Struct => self.exec_struct(cmd),
            Opcode::Define => self.exec_define(cmd),
            Opcode::Undefine => self.exec_undefine(cmd),
            Opcode::Add => self.exec_update(cmd, VarStore::add),
            Opcode::Multiply => self.exec_update(cmd, VarStore::multiply),
            Opcode::Random => self.exec_random(cmd),
            Opcode::Wait => self.exec_wait(cmd),
            Opcode::Script => self.exec_script(cmd, line),
            Opcode::Flag => self.exec_flag(cmd),
            Opcode::Print => self.exec_print(cmd),
            Opcode::Set => self.exec_set(cmd, line),
            _ => self.delegate(op, cmd, line),
        }
    }

    // ── Core commands ─────────────────────────────────────────────────────────

    /// `struct if <expr|else|end>` / `struct loop <count|end>`.
    fn exec_struct(&mut self, cmd: &Command) -> Result<Duration, ScriptError> {
        if let Some(v) = cmd.get("if") {
            match v.to_ascii_lowercase().as_str() {
                "else" => self.control.flip_if(),
                "end" => self.control.end_if(),
                _ => self.control.begin_if(self.vars.eval_double(v)),
            }
        } else if let Some(v) = cmd.get("loop") {
            if self.control.is_suppressed() {
                debug!("suppressed: struct loop {v}");
            } else if v.eq_ignore_ascii_case("end") {
                self.control.end_loop();
            } else {
                self.control.begin_loop(self.vars.eval_double(v))?;
            }
        } else {
            return Err(ScriptError::missing("struct", "if"));
        }
        Ok(Duration::ZERO)
    }

    fn exec_define(&mut self, cmd: &Command) -> Result<Duration, ScriptError> {
        if cmd.args.is_empty() {
            return Err(ScriptError::missing(&cmd.name, "name"));
        }
        for (name, value) in cmd.iter() {
            let x = self.vars.define(name, value);
            debug!("define {name} = {}", format_number(x));
        }
        Ok(Duration::ZERO)
    }

    /// `undefine <name>` or `undefine all`.
    fn exec_undefine(&mut self, cmd: &Command) -> Result<Duration, ScriptError> {
        if cmd.args.is_empty() {
            return Err(ScriptError::missing(&cmd.name, "name"));
        }
        for (name, _) in cmd.iter() {
            if name == "all" {
                self.vars.clear();
            } else if !self.vars.unset(name) {
                return Err(ScriptError::UndefinedVariable(name.to_owned()));
            }
        }
        Ok(Duration::ZERO)
    }

    fn exec_update(&mut self, cmd: &Command, op: VarUpdate) -> Result<Duration, ScriptError> {
        if cmd.args.is_empty() {
            return Err(ScriptError::missing(&cmd.name, "name"));
        }
        for (name, value) in cmd.iter() {
            let x = op(&mut self.vars, name, value)?;
            debug!("{} {name} -> {}", cmd.name, format_number(x));
        }
        Ok(Duration::ZERO)
    }

    /// `random min <a> max <b>`: either bound may be omitted.
    fn exec_random(&mut self, cmd: &Command) -> Result<Duration, ScriptError> {
        if !cmd.has("min") && !cmd.has("max") {
            return Err(ScriptError::missing("random", "min"));
        }
        let (lo, hi) = self.vars.random_bounds();
        let lo = cmd.get("min").map_or(lo, |v| self.vars.eval_double(v));
        let hi = cmd.get("max").map_or(hi, |v| self.vars.eval_double(v));
        self.vars.set_random_bounds(lo, hi);
        Ok(Duration::ZERO)
    }

    /// `wait duration <seconds>`; negative values count as zero.
    fn exec_wait(&mut self, cmd: &Command) -> Result<Duration, ScriptError> {
        let secs = self.vars.eval_double(cmd.require("duration")?);
        Ok(seconds(secs))
    }

    fn exec_script(&mut self, cmd: &Command, line: &Line) -> Result<Duration, ScriptError> {
        let action = cmd.require("action")?;
        match action.to_ascii_lowercase().as_str() {
            "play" => {
                let file = cmd.require("filename")?;
                self.load_and_play(&resolve_in(&line.base_dir, file))?;
            }
            "record" => {
                self.open_recording(cmd.get("filename"))?;
            }
            "cancelrecord" => {
                self.stop_recording();
            }
            "end" | "cancel" => self.cancel(),
            "pause" => {
                self.pause()?;
            }
            "resume" => self.resume()?,
            "faster" => {
                self.faster()?;
            }
            "slower" => {
                self.slower()?;
            }
            _ => return Err(ScriptError::bad("script", "action", action)),
        }
        Ok(Duration::ZERO)
    }

    fn exec_flag(&mut self, cmd: &Command) -> Result<Duration, ScriptError> {
        if cmd.args.is_empty() {
            return Err(ScriptError::missing("flag", "name"));
        }
        for (name, value) in cmd.iter() {
            self.flags.set_flag(name, value)?;
        }
        Ok(Duration::ZERO)
    }

    /// `print text "<msg>"` or `print var <name>`.
    fn exec_print(&mut self, cmd: &Command) -> Result<Duration, ScriptError> {
        let msg = if let Some(text) = cmd.get("text") {
            text.to_owned()
        } else if let Some(name) = cmd.get("var") {
            let value = self
                .vars
                .get(name)
                .ok_or_else(|| ScriptError::UndefinedVariable(name.to_owned()))?;
            format!("{name} = {value}")
        } else {
            return Err(ScriptError::missing(&cmd.name, "text"));
        };
        info!("{msg}");
        self.output.push(msg);
        Ok(Duration::ZERO)
    }

    fn exec_set(&mut self, cmd: &Command, line: &Line) -> Result<Duration, ScriptError> {
        if cmd.args.is_empty() {
            return Err(ScriptError::missing("set", "key"));
        }
        let mut ctx = ActionContext::new(&line.base_dir, &self.vars);
        let mut result = Ok(Duration::ZERO);
        for (key, value) in cmd.iter() {
            if let Err(e) = self.stage.set(key, value, &mut ctx) {
                result = Err(e);
                break;
            }
        }
        let (follow_ups, records) = ctx.finish();
        self.apply_requests(follow_ups, records);
        result
    }

    // ── Delegated commands ────────────────────────────────────────────────────

    fn delegate(&mut self, op: Opcode, cmd: &Command, line: &Line) -> Result<Duration, ScriptError> {
        let mut ctx = ActionContext::new(&line.base_dir, &self.vars);
        let result = self.stage.perform(op, cmd, &mut ctx);
        let (follow_ups, records) = ctx.finish();
        self.apply_requests(follow_ups, records);
        result
    }

    fn apply_requests(&mut self, follow_ups: Vec<String>, records: Vec<String>) {
        if !follow_ups.is_empty() {
            self.add_to_front(&follow_ups.join("\n"));
        }
        for line in records {
            self.record_command(&line);
        }
    }

    // ── Clock ─────────────────────────────────────────────────────────────────

    /// Advance by one frame delta and dispatch every line that has become due.
    ///
    /// Several lines may run in one call when their waits fit in `delta`.
    pub fn update(&mut self, delta: Duration) {
        self.recorder.advance(delta);
        self.playback.advance(delta);

        while self.playback.is_due() {
            self.playback.consume_wait();
            let Some((line, capturable)) = self.pull() else {
                // Exhausted: the trailing wait has already been honoured.
                // Ends even while suppressed.
                self.cancel();
                break;
            };
            let capturing = capturable && self.control.is_capturing();
            let wait = self.execute_line(&line).unwrap_or(Duration::ZERO);
            if capturing && self.control.is_capturing() {
                self.control.capture(&line);
            }
            if !self.playback.is_idle() {
                self.playback.set_wait(wait);
            }
        }
    }

    /// Next line by value: the loop buffer while replaying, else the script.
    /// The flag is set for lines read from the script file, the only ones a
    /// loop's first pass captures.
    fn pull(&mut self) -> Option<(Line, bool)> {
        if let Some(line) = self.control.next_replay() {
            return Some((line, false));
        }
        let script = self.script.as_mut()?;
        let spliced = script.front_is_spliced();
        script.pop_front().map(|l| (l, !spliced))
    }

    // ── Playback control ──────────────────────────────────────────────────────

    /// Load `path` and start playing it.  A relative path resolves against
    /// the script directory.  On failure the current state is untouched.
    pub fn play_script(&mut self, path: &Path) -> Result<(), ScriptError> {
        let path = resolve_in(&self.script_dir, path);
        self.load_and_play(&path).inspect_err(|e| error!("{e}"))
    }

    fn load_and_play(&mut self, path: &Path) -> Result<(), ScriptError> {
        let script = Script::load(path)?;
        info!("playing {} ({} lines)", path.display(), script.len());
        self.script = Some(script);
        self.control.clear_loop();
        if self.playback.start() {
            self.stage.speed_changed(1.0);
        }
        Ok(())
    }

    /// Stop playback and drop the script and loop buffer.  Safe in any state,
    /// including from a handler running inside [`Interpreter::update`].
    pub fn cancel(&mut self) {
        if !self.playback.is_idle() {
            info!("script ended");
        }
        let reset_speed = self.playback.speed_step() != 0;
        self.script = None;
        self.control.clear_loop();
        self.playback.stop();
        if reset_speed {
            self.stage.speed_changed(1.0);
        }
    }

    /// Toggle between playing and paused.
    pub fn pause(&mut self) -> Result<PlaybackState, ScriptError> {
        let state = self.playback.toggle_pause()?;
        if state == PlaybackState::Playing {
            info!("playback resumed");
            self.stage.resync();
        } else {
            info!("playback paused");
        }
        Ok(state)
    }

    pub fn resume(&mut self) -> Result<(), ScriptError> {
        if !self.playback.resume() {
            return Err(ScriptError::State("playback is not paused".into()));
        }
        info!("playback resumed");
        self.stage.resync();
        Ok(())
    }

    pub fn faster(&mut self) -> Result<SpeedChange, ScriptError> {
        let change = self.playback.faster()?;
        self.speed_changed(change);
        Ok(change)
    }

    pub fn slower(&mut self) -> Result<SpeedChange, ScriptError> {
        let change = self.playback.slower()?;
        self.speed_changed(change);
        Ok(change)
    }

    fn speed_changed(&mut self, change: SpeedChange) {
        if change.changed {
            info!("playback speed x{}", change.scale);
            self.stage.speed_changed(change.scale);
        }
        if change.back_to_normal {
            self.stage.resync();
        }
    }

    /// Splice `text` (one or more lines) ahead of everything pending in the
    /// playing script, keeping its order.  During a loop replay the lines go
    /// ahead of the rest of the replay instead.  While idle they run at once.
    pub fn add_to_front(&mut self, text: &str) {
        if self.control.is_replaying() {
            let base = self.active_base_dir();
            let lines = text
                .lines()
                .filter(|l| is_script_line(l))
                .map(|l| Line::new(l.trim(), base.clone()));
            self.control.splice(lines);
            return;
        }
        match self.script.as_mut() {
            Some(script) => script.push_front(text),
            None => {
                for l in text.lines().filter(|l| is_script_line(l)) {
                    let _ = self.execute(l);
                }
            }
        }
    }

    // ── Recording ─────────────────────────────────────────────────────────────

    /// Append `line` to the running recording.  Anything outside the
    /// interpreter (a key press, a UI action) may call this.
    pub fn record_command(&mut self, line: &str) {
        if let Err(e) = self.recorder.record(line) {
            error!("recording: {e}");
            self.output.push(format!("% {e}"));
        }
    }

    /// Start recording to `name` (relative to the record directory, `.sts`
    /// added when there is no extension), or to a timestamped file.
    pub fn start_recording(&mut self, name: Option<&str>) -> Result<PathBuf, ScriptError> {
        self.open_recording(name).inspect_err(|e| error!("{e}"))
    }

    fn open_recording(&mut self, name: Option<&str>) -> Result<PathBuf, ScriptError> {
        let path = match name.filter(|n| !n.is_empty()) {
            Some(n) => {
                let p = resolve_in(&self.record_dir, n);
                if p.extension().is_none() {
                    p.with_extension(SCRIPT_EXTENSION)
                } else {
                    p
                }
            }
            None => auto_name(&self.record_dir),
        };
        self.recorder.start(&path)?;
        Ok(path)
    }

    /// Close the recording.  Returns the file written, if any.
    pub fn stop_recording(&mut self) -> Option<PathBuf> {
        self.recorder.stop()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
