//! Command registry: name → [`Opcode`] lookup.
//!
//! The name table (including aliases) is static data, but each
//! [`Registry`] builds its own lookup map at construction so interpreter
//! instances never share mutable state.

use std::collections::HashMap;
use std::str::FromStr;

// ── Capability ────────────────────────────────────────────────────────────────

/// Which part of the system carries out a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Handled by the interpreter itself (control flow, variables, playback).
    Core,
    /// Camera position, orientation, field of view, selection.
    Camera,
    /// Simulated date and time rate.
    Time,
    /// Audio, video, image and text overlays.
    Media,
    /// Sky objects, models, landscapes.
    Scene,
    /// Screenshots and frame capture.
    Capture,
}

impl Capability {
    pub fn name(self) -> &'static str {
        match self {
            Capability::Core    => "core",
            Capability::Camera  => "camera",
            Capability::Time    => "time",
            Capability::Media   => "media",
            Capability::Scene   => "scene",
            Capability::Capture => "capture",
        }
    }
}

// ── Opcode ────────────────────────────────────────────────────────────────────

/// Every command the interpreter knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Structural (dispatched even while suppressed)
    Comment,
    Uncomment,
    Struct,

    // Variables
    Define,
    Undefine,
    Add,
    Multiply,
    Random,

    // Timing and playback
    Wait,
    Script,

    // Core state
    Flag,
    Print,
    Set,

    // Camera
    Camera,
    Look,
    MoveTo,
    Zoom,
    Select,
    Deselect,

    // Time
    Date,
    TimeRate,

    // Media
    Audio,
    Video,
    Image,
    Text,

    // Scene
    Body,
    Model,
    Landscape,
    Constellation,
    Nebula,
    SkyCulture,
    Meteors,

    // Capture
    Capture,
    Screenshot,
}

impl Opcode {
    /// Command names and aliases, as written in scripts.
    pub const TABLE: &'static [(&'static str, Opcode)] = &[
        ("comment",       Opcode::Comment),
        ("uncomment",     Opcode::Uncomment),
        ("struct",        Opcode::Struct),
        ("define",        Opcode::Define),
        ("undefine",      Opcode::Undefine),
        ("undef",         Opcode::Undefine),
        ("add",           Opcode::Add),
        ("multiply",      Opcode::Multiply),
        ("mult",          Opcode::Multiply),
        ("random",        Opcode::Random),
        ("wait",          Opcode::Wait),
        ("sleep",         Opcode::Wait),
        ("script",        Opcode::Script),
        ("flag",          Opcode::Flag),
        ("print",         Opcode::Print),
        ("echo",          Opcode::Print),
        ("set",           Opcode::Set),
        ("camera",        Opcode::Camera),
        ("look",          Opcode::Look),
        ("lookat",        Opcode::Look),
        ("moveto",        Opcode::MoveTo),
        ("zoom",          Opcode::Zoom),
        ("select",        Opcode::Select),
        ("deselect",      Opcode::Deselect),
        ("date",          Opcode::Date),
        ("timerate",      Opcode::TimeRate),
        ("audio",         Opcode::Audio),
        ("video",         Opcode::Video),
        ("movie",         Opcode::Video),
        ("image",         Opcode::Image),
        ("picture",       Opcode::Image),
        ("text",          Opcode::Text),
        ("body",          Opcode::Body),
        ("planet",        Opcode::Body),
        ("model",         Opcode::Model),
        ("landscape",     Opcode::Landscape),
        ("constellation", Opcode::Constellation),
        ("nebula",        Opcode::Nebula),
        ("dso",           Opcode::Nebula),
        ("skyculture",    Opcode::SkyCulture),
        ("meteors",       Opcode::Meteors),
        ("capture",       Opcode::Capture),
        ("framecapture",  Opcode::Capture),
        ("screenshot",    Opcode::Screenshot),
    ];

    /// Canonical (non-alias) name.
    pub fn name(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(n, _)| *n)
            .unwrap_or("?")
    }

    pub fn capability(self) -> Capability {
        use Opcode::*;
        match self {
            Comment | Uncomment | Struct | Define | Undefine | Add | Multiply | Random
            | Wait | Script | Flag | Print | Set => Capability::Core,
            Camera | Look | MoveTo | Zoom | Select | Deselect => Capability::Camera,
            Date | TimeRate => Capability::Time,
            Audio | Video | Image | Text => Capability::Media,
            Body | Model | Landscape | Constellation | Nebula | SkyCulture | Meteors => {
                Capability::Scene
            }
            Capture | Screenshot => Capability::Capture,
        }
    }

    /// Structural commands are the only ones dispatched while suppressed.
    pub fn is_structural(self) -> bool {
        matches!(self, Opcode::Comment | Opcode::Uncomment | Opcode::Struct)
    }

    /// Whether a successful execution is forwarded to the recorder.
    ///
    /// Control commands are reconstructed by the recorder (waits) or are
    /// meaningless on replay (script control, comments, structure).
    pub fn is_recordable(self) -> bool {
        !matches!(
            self,
            Opcode::Comment | Opcode::Uncomment | Opcode::Struct | Opcode::Wait | Opcode::Script
        )
    }
}

impl FromStr for Opcode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::TABLE
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, op)| *op)
            .ok_or(())
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Instance-owned command lookup table.
#[derive(Debug, Clone)]
pub struct Registry {
    by_name: HashMap<&'static str, Opcode>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self { by_name: Opcode::TABLE.iter().copied().collect() }
    }

    /// Resolve an already lower-cased command name.
    pub fn lookup(&self, name: &str) -> Option<Opcode> {
        self.by_name.get(name).copied()
    }

    /// Number of registered names, aliases included.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_same_opcode() {
        let r = Registry::new();
        assert_eq!(r.lookup("multiply"), Some(Opcode::Multiply));
        assert_eq!(r.lookup("mult"), Some(Opcode::Multiply));
        assert_eq!(r.lookup("movie"), r.lookup("video"));
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(Registry::new().lookup("teleport"), None);
    }

    #[test]
    fn table_has_no_duplicate_names() {
        let r = Registry::new();
        assert_eq!(r.len(), Opcode::TABLE.len());
    }

    #[test]
    fn canonical_name_is_first_entry() {
        assert_eq!(Opcode::Multiply.name(), "multiply");
        assert_eq!(Opcode::Video.name(), "video");
        assert_eq!("LOOKAT".parse::<Opcode>(), Ok(Opcode::Look));
    }

    #[test]
    fn only_comment_uncomment_struct_are_structural() {
        let structural: Vec<_> = Opcode::TABLE
            .iter()
            .filter(|(_, op)| op.is_structural())
            .map(|(n, _)| *n)
            .collect();
        assert_eq!(structural, ["comment", "uncomment", "struct"]);
    }

    #[test]
    fn control_commands_are_not_recorded() {
        assert!(!Opcode::Wait.is_recordable());
        assert!(!Opcode::Script.is_recordable());
        assert!(Opcode::Flag.is_recordable());
        assert!(Opcode::Camera.is_recordable());
    }

    #[test]
    fn capability_groups() {
        assert_eq!(Opcode::Zoom.capability(), Capability::Camera);
        assert_eq!(Opcode::Screenshot.capability(), Capability::Capture);
        assert_eq!(Opcode::Define.capability(), Capability::Core);
    }
}
