//! Boolean display flags and the `flag` sub-dispatcher.
//!
//! Flag state is never cached here.  Each [`Flag`] may be bound to a
//! [`FlagBinding`] supplied by the collaborator that owns the state; a
//! `toggle` reads the current value from that binding before writing the
//! inverse, so the collaborator must apply `set` synchronously for two
//! consecutive toggles to cancel out.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::error::ScriptError;

// ── Flag ──────────────────────────────────────────────────────────────────────

/// A named boolean that scripts switch with `flag <name> <on|off|toggle>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Flag {
    Stars,
    StarNames,
    StarTwinkle,
    StarLines,
    ConstellationDrawing,
    ConstellationNames,
    ConstellationArt,
    ConstellationBoundaries,
    ConstellationPick,
    Planets,
    PlanetNames,
    PlanetOrbits,
    ObjectTrails,
    MoonScaled,
    SunScaled,
    Nebulae,
    NebulaNames,
    BrightNebulae,
    MilkyWay,
    ZodiacalLight,
    Atmosphere,
    Fog,
    Landscape,
    CardinalPoints,
    AzimuthalGrid,
    EquatorialGrid,
    EclipticGrid,
    GalacticGrid,
    EclipticLine,
    EquatorLine,
    MeridianLine,
    GalacticLine,
    VerticalLine,
    TropicLines,
    PrecessionCircle,
    CircumpolarCircle,
    ZenithLine,
    Analemma,
    AriesLine,
    Zodiac,
    NightMode,
    Tracking,
    LockSkyPosition,
    SelectedObjectPointer,
    BodyTrace,
    LightTravelTime,
    ShowFps,
    ShowClock,
    ShowDate,
    ShowFov,
    ShowLatLon,
    ManualZoom,
    ZoomKeys,
    MoveKeys,
    MouseNavigation,
    DomeMode,
}

impl Flag {
    /// Flag names and aliases, as written in scripts.
    pub const NAMES: &'static [(&'static str, Flag)] = &[
        ("stars",                    Flag::Stars),
        ("star_names",               Flag::StarNames),
        ("star_twinkle",             Flag::StarTwinkle),
        ("star_lines",               Flag::StarLines),
        ("asterisms",                Flag::StarLines),
        ("constellation_drawing",    Flag::ConstellationDrawing),
        ("constellation_lines",      Flag::ConstellationDrawing),
        ("constellation_names",      Flag::ConstellationNames),
        ("constellation_art",        Flag::ConstellationArt),
        ("constellation_boundaries", Flag::ConstellationBoundaries),
        ("constellation_pick",       Flag::ConstellationPick),
        ("planets",                  Flag::Planets),
        ("planet_names",             Flag::PlanetNames),
        ("planet_orbits",            Flag::PlanetOrbits),
        ("orbits",                   Flag::PlanetOrbits),
        ("object_trails",            Flag::ObjectTrails),
        ("planet_trails",            Flag::ObjectTrails),
        ("moon_scaled",              Flag::MoonScaled),
        ("sun_scaled",               Flag::SunScaled),
        ("nebulae",                  Flag::Nebulae),
        ("nebula_names",             Flag::NebulaNames),
        ("bright_nebulae",           Flag::BrightNebulae),
        ("milky_way",                Flag::MilkyWay),
        ("zodiacal_light",           Flag::ZodiacalLight),
        ("atmosphere",               Flag::Atmosphere),
        ("fog",                      Flag::Fog),
        ("landscape",                Flag::Landscape),
        ("ground",                   Flag::Landscape),
        ("cardinal_points",          Flag::CardinalPoints),
        ("azimuthal_grid",           Flag::AzimuthalGrid),
        ("equatorial_grid",          Flag::EquatorialGrid),
        ("ecliptic_grid",            Flag::EclipticGrid),
        ("galactic_grid",            Flag::GalacticGrid),
        ("ecliptic_line",            Flag::EclipticLine),
        ("equator_line",             Flag::EquatorLine),
        ("meridian_line",            Flag::MeridianLine),
        ("galactic_line",            Flag::GalacticLine),
        ("vertical_line",            Flag::VerticalLine),
        ("tropic_lines",             Flag::TropicLines),
        ("precession_circle",        Flag::PrecessionCircle),
        ("circumpolar_circle",       Flag::CircumpolarCircle),
        ("zenith_line",              Flag::ZenithLine),
        ("analemma",                 Flag::Analemma),
        ("aries_line",               Flag::AriesLine),
        ("zodiac",                   Flag::Zodiac),
        ("night_mode",               Flag::NightMode),
        ("night",                    Flag::NightMode),
        ("tracking",                 Flag::Tracking),
        ("track_object",             Flag::Tracking),
        ("lock_sky_position",        Flag::LockSkyPosition),
        ("selected_object_pointer",  Flag::SelectedObjectPointer),
        ("pointer",                  Flag::SelectedObjectPointer),
        ("body_trace",               Flag::BodyTrace),
        ("trace",                    Flag::BodyTrace),
        ("light_travel_time",        Flag::LightTravelTime),
        ("show_fps",                 Flag::ShowFps),
        ("show_clock",               Flag::ShowClock),
        ("show_date",                Flag::ShowDate),
        ("show_fov",                 Flag::ShowFov),
        ("show_latlon",              Flag::ShowLatLon),
        ("manual_zoom",              Flag::ManualZoom),
        ("enable_zoom_keys",         Flag::ZoomKeys),
        ("enable_move_keys",         Flag::MoveKeys),
        ("enable_mouse_navigation",  Flag::MouseNavigation),
        ("mouse_navigation",         Flag::MouseNavigation),
        ("dome_mode",                Flag::DomeMode),
    ];

    /// Canonical (non-alias) name.
    pub fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, f)| *f == self)
            .map(|(n, _)| *n)
            .unwrap_or("?")
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Flag {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, f)| *f)
            .ok_or_else(|| ScriptError::UnknownFlag(s.to_owned()))
    }
}

// ── FlagValue ─────────────────────────────────────────────────────────────────

/// What a `flag` argument asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagValue {
    On,
    Off,
    Toggle,
}

impl FlagValue {
    /// `toggle` → Toggle; `on`/`1`/`true`/`yes` → On; anything else → Off.
    pub fn classify(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "toggle" => FlagValue::Toggle,
            "on" | "1" | "true" | "yes" => FlagValue::On,
            _ => FlagValue::Off,
        }
    }
}

// ── FlagBinding ───────────────────────────────────────────────────────────────

/// Read/write access to a boolean owned by a collaborator.
pub trait FlagBinding {
    fn get(&self) -> bool;
    fn set(&mut self, on: bool);
}

/// A [`FlagBinding`] built from a getter and a setter closure.
pub struct FnBinding<G, S> {
    getter: G,
    setter: S,
}

impl<G, S> FlagBinding for FnBinding<G, S>
where
    G: Fn() -> bool,
    S: FnMut(bool),
{
    fn get(&self) -> bool {
        (self.getter)()
    }

    fn set(&mut self, on: bool) {
        (self.setter)(on)
    }
}

/// Box a getter/setter pair as a [`FlagBinding`].
pub fn bind_fn<G, S>(getter: G, setter: S) -> Box<dyn FlagBinding>
where
    G: Fn() -> bool + 'static,
    S: FnMut(bool) + 'static,
{
    Box::new(FnBinding { getter, setter })
}

// ── FlagBoard ─────────────────────────────────────────────────────────────────

/// Flag name table plus the collaborator bindings registered by the host.
pub struct FlagBoard {
    by_name: HashMap<&'static str, Flag>,
    bindings: HashMap<Flag, Box<dyn FlagBinding>>,
}

impl fmt::Debug for FlagBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bound: Vec<_> = self.bindings.keys().map(|f| f.name()).collect();
        bound.sort_unstable();
        f.debug_struct("FlagBoard").field("bound", &bound).finish()
    }
}

impl Default for FlagBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagBoard {
    pub fn new() -> Self {
        Self { by_name: Flag::NAMES.iter().copied().collect(), bindings: HashMap::new() }
    }

    /// Attach the collaborator that owns `flag`, replacing any earlier binding.
    pub fn bind(&mut self, flag: Flag, binding: Box<dyn FlagBinding>) {
        self.bindings.insert(flag, binding);
    }

    pub fn unbind(&mut self, flag: Flag) -> bool {
        self.bindings.remove(&flag).is_some()
    }

    pub fn lookup(&self, name: &str) -> Option<Flag> {
        self.by_name.get(name).copied()
    }

    /// Current value as reported by the owning collaborator.
    pub fn get(&self, flag: Flag) -> Option<bool> {
        self.bindings.get(&flag).map(|b| b.get())
    }

    /// Apply `value` to the flag called `name` and return the resulting state.
    ///
    /// A known flag without a binding succeeds without effect; only an
    /// unrecognised name is an error.
    pub fn set_flag(&mut self, name: &str, value: &str) -> Result<bool, ScriptError> {
        let flag = self
            .lookup(name)
            .ok_or_else(|| ScriptError::UnknownFlag(name.to_owned()))?;
        let want = FlagValue::classify(value);

        let Some(binding) = self.bindings.get_mut(&flag) else {
            debug!("flag {flag}: no collaborator bound, ignoring {want:?}");
            return Ok(want != FlagValue::Off);
        };

        let on = match want {
            FlagValue::On => true,
            FlagValue::Off => false,
            FlagValue::Toggle => !binding.get(),
        };
        binding.set(on);
        debug!("flag {flag} -> {}", if on { "on" } else { "off" });
        Ok(on)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
