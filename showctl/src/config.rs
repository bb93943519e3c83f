//! `.showrc` configuration file parser.
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `set <name>=<value>` or `set <name> <value>` | set a setting |
//! | Lines starting with `;` | comment, ignored |
//!
//! Recognised settings: `script_dir`, `record_dir`, `frame_rate`, `listen`,
//! `random_min`, `random_max`.  Anything else is reported as a non-fatal
//! [`ConfigError`] and loading carries on.

use std::path::{Path, PathBuf};

use directories::UserDirs;

/// Default host frame rate in Hz.
pub const DEFAULT_FRAME_RATE: u32 = 60;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings for the show controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base directory for relative script paths outside a script.
    pub script_dir: PathBuf,
    /// Where recordings go.
    pub record_dir: PathBuf,
    /// Host frame loop rate in Hz.
    pub frame_rate: u32,
    /// `host:port` for the TCP command transport.
    pub listen: Option<String>,
    pub random_min: f64,
    pub random_max: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            script_dir: PathBuf::from("."),
            record_dir: home_dir().unwrap_or_else(|| PathBuf::from(".")),
            frame_rate: DEFAULT_FRAME_RATE,
            listen: None,
            random_min: 0.0,
            random_max: 1.0,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string on top of the defaults.
    ///
    /// Returns the config and a list of any errors on individual lines.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let errors = config.apply_str(s);
        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Apply every directive in `s` to `self`.
    pub fn apply_str(&mut self, s: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let (cmd, args_str) = line
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((line, ""));

            let result = match cmd {
                "set" => parse_set(&split_args(args_str.trim()))
                    .and_then(|(name, value)| self.set(&name, &value)),
                _ => Err(format!("unknown directive '{cmd}'")),
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        errors
    }

    /// Apply one setting.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            "script_dir" => self.script_dir = expand_home(value),
            "record_dir" => self.record_dir = expand_home(value),
            "frame_rate" => {
                self.frame_rate = value
                    .parse()
                    .ok()
                    .filter(|&hz| hz > 0)
                    .ok_or_else(|| format!("frame_rate: invalid value '{value}'"))?;
            }
            "listen" => self.listen = Some(value.to_owned()).filter(|v| !v.is_empty()),
            "random_min" => self.random_min = parse_f64(name, value)?,
            "random_max" => self.random_max = parse_f64(name, value)?,
            _ => return Err(format!("unknown setting '{name}'")),
        }
        Ok(())
    }
}

fn parse_f64(name: &str, value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .ok_or_else(|| format!("{name}: invalid number '{value}'"))
}

fn home_dir() -> Option<PathBuf> {
    UserDirs::new().map(|u| u.home_dir().to_path_buf())
}

/// Replace a leading `~/` with the user's home directory.
fn expand_home(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() {
                    args.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        args.push(cur);
    }
    args
}

// ── set ───────────────────────────────────────────────────────────────────────

/// `set name=value` or `set name value…`.
fn parse_set(tokens: &[String]) -> Result<(String, String), String> {
    let Some(first) = tokens.first() else {
        return Err("set: requires an argument".into());
    };

    let (name, value) = if let Some((name, value)) = first.split_once('=') {
        (name.to_owned(), value.to_owned())
    } else if tokens.len() >= 2 {
        (first.clone(), tokens[1..].join(" "))
    } else {
        return Err(format!("set: missing value for '{first}'"));
    };

    if name.is_empty() {
        return Err("set: setting name cannot be empty".into());
    }
    Ok((name, value))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
