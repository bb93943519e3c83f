//! Script source: the queue of pending lines for the script being played.
//!
//! A [`Script`] is read eagerly when playback starts.  Lines are pulled by
//! value with [`Script::pop_front`], so cancelling playback from inside a
//! handler can never leave the clock holding a reference into a dropped
//! queue.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::error::ScriptError;

// ── Line ──────────────────────────────────────────────────────────────────────

/// One raw script line plus the directory relative asset paths resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub base_dir: PathBuf,
}

impl Line {
    pub fn new(text: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self { text: text.into(), base_dir: base_dir.into() }
    }
}

/// Whether the line loader keeps a line: blank lines and `#` comments are dropped.
pub fn is_script_line(raw: &str) -> bool {
    let t = raw.trim();
    !t.is_empty() && !t.starts_with('#')
}

// ── Script ────────────────────────────────────────────────────────────────────

/// Ordered, mutable queue of lines loaded from one script file.
#[derive(Debug, Clone, Default)]
pub struct Script {
    lines: VecDeque<Line>,
    base_dir: PathBuf,
    /// Where the script came from (for log messages).
    origin: PathBuf,
    /// Lines at the head that were inserted by `push_front`.
    spliced: usize,
}

impl Script {
    /// Build a script from source text.  `base_dir` becomes the base directory
    /// of every line.
    pub fn from_source(src: &str, base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let lines = src
            .lines()
            .filter(|l| is_script_line(l))
            .map(|l| Line::new(l.trim(), base_dir.clone()))
            .collect();
        Self { lines, origin: base_dir.clone(), base_dir, spliced: 0 }
    }

    /// Read a script file.  Its parent directory becomes the base directory.
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let src = std::fs::read_to_string(path).map_err(|e| ScriptError::io(path, &e))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut script = Self::from_source(&src, base);
        script.origin = path.to_path_buf();
        Ok(script)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Take the next pending line.
    pub fn pop_front(&mut self) -> Option<Line> {
        self.spliced = self.spliced.saturating_sub(1);
        self.lines.pop_front()
    }

    /// Whether the next line was inserted by [`Script::push_front`] rather
    /// than read from the file.
    pub fn front_is_spliced(&self) -> bool {
        self.spliced > 0
    }

    /// Insert `text` (possibly several lines) ahead of everything pending,
    /// keeping the inserted lines in their original order.
    pub fn push_front(&mut self, text: &str) {
        let new: Vec<&str> = text.lines().filter(|l| is_script_line(l)).collect();
        let new_len = new.len();
        for l in new.into_iter().rev() {
            self.lines.push_front(Line::new(l.trim(), self.base_dir.clone()));
        }
        self.spliced += new_len;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn texts(s: &mut Script) -> Vec<String> {
        std::iter::from_fn(|| s.pop_front()).map(|l| l.text).collect()
    }

    #[test]
    fn loader_skips_blank_and_hash_lines() {
        let mut s = Script::from_source(
            "# intro\n\nflag stars on\n   \n  # indented comment\nwait duration 1\n",
            "/shows",
        );
        assert_eq!(texts(&mut s), ["flag stars on", "wait duration 1"]);
    }

    #[test]
    fn lines_carry_base_dir() {
        let mut s = Script::from_source("image filename logo.png", "/shows/a");
        assert_eq!(s.pop_front().unwrap().base_dir, PathBuf::from("/shows/a"));
    }

    #[test]
    fn push_front_keeps_order() {
        let mut s = Script::from_source("c\nd", "/x");
        s.push_front("a\nb");
        assert_eq!(texts(&mut s), ["a", "b", "c", "d"]);
    }

    #[test]
    fn pushed_lines_are_marked_spliced() {
        let mut s = Script::from_source("c", "/x");
        assert!(!s.front_is_spliced());
        s.push_front("a\nb");
        assert!(s.front_is_spliced());
        s.pop_front();
        assert!(s.front_is_spliced());
        s.pop_front();
        assert!(!s.front_is_spliced());
        assert_eq!(s.pop_front().map(|l| l.text).as_deref(), Some("c"));
    }

    #[test]
    fn load_uses_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.sts");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "flag stars on").unwrap();
        let s = Script::load(&path).unwrap();
        assert_eq!(s.base_dir(), dir.path());
        assert_eq!(s.origin(), path.as_path());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Script::load(Path::new("/definitely/not/here.sts")).unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
    }
}
