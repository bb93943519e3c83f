//! Script variable store.
//!
//! Variables are plain strings that are always read and written through a
//! `f64` conversion, so `define v 5` stores `"5"` and `add v 0.5` stores
//! `"5.5"`.  Large integers are not guaranteed to survive the round trip.
//! The store lives as long as the interpreter; only `undefine` removes
//! entries.

use std::collections::HashMap;

use log::warn;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::ScriptError;

/// Format a number the way the store keeps it: integral values without a
/// fractional part, everything else in shortest round-trip form.
pub fn format_number(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{x}")
    }
}

/// Parse a numeric literal, treating empty or garbage input as `0.0`.
fn parse_number(s: &str) -> f64 {
    s.trim().parse::<f64>().ok().filter(|x| x.is_finite()).unwrap_or(0.0)
}

// ── VarStore ──────────────────────────────────────────────────────────────────

/// Named string variables plus the bounds for `random` draws.
#[derive(Debug)]
pub struct VarStore {
    vars: HashMap<String, String>,
    min_random: f64,
    max_random: f64,
    rng: SmallRng,
}

impl Default for VarStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VarStore {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    /// A store whose `random` draws are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self { vars: HashMap::new(), min_random: 0.0, max_random: 1.0, rng }
    }

    /// Get the raw string value of a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Evaluate a token as a number: a variable name is substituted first,
    /// anything unparsable evaluates to `0.0`.
    pub fn eval_double(&self, token: &str) -> f64 {
        match self.vars.get(token) {
            Some(v) => parse_number(v),
            None => parse_number(token),
        }
    }

    /// `define <name> <value|random>`.
    pub fn define(&mut self, name: &str, value: &str) -> f64 {
        let x = if value.eq_ignore_ascii_case("random") {
            self.draw()
        } else {
            self.eval_double(value)
        };
        self.vars.insert(name.to_owned(), format_number(x));
        x
    }

    /// `add <name> <value>`: the variable must already exist.
    pub fn add(&mut self, name: &str, value: &str) -> Result<f64, ScriptError> {
        self.update(name, value, |a, b| a + b)
    }

    /// `multiply <name> <value>`: the variable must already exist.
    pub fn multiply(&mut self, name: &str, value: &str) -> Result<f64, ScriptError> {
        self.update(name, value, |a, b| a * b)
    }

    fn update(
        &mut self,
        name: &str,
        value: &str,
        op: impl Fn(f64, f64) -> f64,
    ) -> Result<f64, ScriptError> {
        let Some(current) = self.vars.get(name) else {
            return Err(ScriptError::UndefinedVariable(name.to_owned()));
        };
        let x = op(parse_number(current), self.eval_double(value));
        self.vars.insert(name.to_owned(), format_number(x));
        Ok(x)
    }

    /// Set the bounds used by subsequent `random` draws.
    pub fn set_random_bounds(&mut self, min: f64, max: f64) {
        self.min_random = min;
        self.max_random = max;
    }

    pub fn random_bounds(&self) -> (f64, f64) {
        (self.min_random, self.max_random)
    }

    /// Uniform draw from `[min, max]`; inverted bounds are swapped.
    fn draw(&mut self) -> f64 {
        let (lo, hi) = if self.min_random <= self.max_random {
            (self.min_random, self.max_random)
        } else {
            (self.max_random, self.min_random)
        };
        if !lo.is_finite() || !hi.is_finite() {
            warn!("random: non-finite bounds {lo}..{hi}, using 0");
            return 0.0;
        }
        if lo == hi {
            return lo;
        }
        if !(hi - lo).is_finite() {
            // The span overflows; interpolate instead.
            let t: f64 = self.rng.random();
            return (lo * (1.0 - t) + hi * t).clamp(lo, hi);
        }
        self.rng.random_range(lo..=hi)
    }

    /// Remove a variable.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    /// Remove every variable.  Random bounds are kept.
    pub fn clear(&mut self) {
        self.vars.clear();
    }

    /// Iterate over all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
