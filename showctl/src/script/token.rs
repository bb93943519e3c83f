//! Command-line tokenizer.
//!
//! Script grammar, one command per line:
//!
//! ```text
//! <command> <key> <value> [<key> <value> …]
//! ```
//!
//! The command name and every key are lower-cased; values keep their case.
//! A value that starts with `"` runs to the next `"` on the line (so it may
//! contain whitespace) or, when the quote is never closed, to the end of the
//! line.  There are no escape sequences.  A key may also carry its value as
//! `key=value` (or `key="quoted value"`), which parses the same as the
//! spaced form.  [`parse`] never fails: malformed
//! input degrades to the closest sensible [`Command`].

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ScriptError;

// ── Command ───────────────────────────────────────────────────────────────────

/// One parsed instruction: a lower-cased name plus its key/value arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: BTreeMap<String, String>,
}

impl Command {
    /// Build a command directly (used by tests and synthetic lines).
    pub fn new<I, K, V>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Command {
            name: name.to_lowercase(),
            args: args
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Value for `key`, or a [`ScriptError::MissingArgument`] naming it.
    pub fn require(&self, key: &str) -> Result<&str, ScriptError> {
        self.get(key).ok_or_else(|| ScriptError::missing(&self.name, key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.args.contains_key(key)
    }

    /// Iterate over arguments in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.args.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Canonical script text: keys in sorted order, values quoted when they
    /// are empty or contain whitespace.
    pub fn to_line(&self) -> String {
        let mut out = self.name.clone();
        for (k, v) in &self.args {
            out.push(' ');
            out.push_str(k);
            out.push(' ');
            if v.is_empty() || v.chars().any(char::is_whitespace) {
                out.push('"');
                out.push_str(v);
                out.push('"');
            } else {
                out.push_str(v);
            }
        }
        out
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

// ── Scanner ───────────────────────────────────────────────────────────────────

struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Next whitespace-delimited word, or `None` at end of input.
    fn word(&mut self) -> Option<&'a str> {
        self.skip_ws();
        if self.rest.is_empty() {
            return None;
        }
        let end = self.rest.find(char::is_whitespace).unwrap_or(self.rest.len());
        let (w, r) = self.rest.split_at(end);
        self.rest = r;
        Some(w)
    }

    /// Next key.  In a `key=value` token the key stops at the first `=` and
    /// the flag is set; the value then follows with no whitespace skipped.
    fn key(&mut self) -> Option<(&'a str, bool)> {
        self.skip_ws();
        if self.rest.is_empty() {
            return None;
        }
        let end = self.rest.find(char::is_whitespace).unwrap_or(self.rest.len());
        match self.rest[..end].find('=').filter(|&eq| eq > 0) {
            Some(eq) => {
                let key = &self.rest[..eq];
                self.rest = &self.rest[eq + 1..];
                Some((key, true))
            }
            None => {
                let (w, r) = self.rest.split_at(end);
                self.rest = r;
                Some((w, false))
            }
        }
    }

    /// Value attached to a `key=` token: quoted, or up to the next whitespace.
    fn attached(&mut self) -> &'a str {
        if let Some(quoted) = self.quoted() {
            return quoted;
        }
        let end = self.rest.find(char::is_whitespace).unwrap_or(self.rest.len());
        let (w, r) = self.rest.split_at(end);
        self.rest = r;
        w
    }

    /// Next value: a word, or a quoted run that may span whitespace.
    fn value(&mut self) -> Option<&'a str> {
        self.skip_ws();
        self.quoted()
    }

    fn quoted(&mut self) -> Option<&'a str> {
        let body = self.rest.strip_prefix('"')?;
        match body.find('"') {
            Some(close) => {
                self.rest = &body[close + 1..];
                Some(&body[..close])
            }
            None => {
                // Unterminated: the rest of the line is the value.
                self.rest = "";
                Some(body)
            }
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Split one script line into a [`Command`].
///
/// An empty or all-whitespace line yields a command with an empty name.
pub fn parse(line: &str) -> Command {
    let mut sc = Scanner { rest: line };
    let mut cmd = Command::default();

    let Some(name) = sc.word() else { return cmd };
    cmd.name = name.to_lowercase();

    while let Some((key, attached)) = sc.key() {
        let value = if attached {
            sc.attached()
        } else {
            match sc.value() {
                Some(quoted) => quoted,
                None => sc.word().unwrap_or(""),
            }
        };
        cmd.args.insert(key.to_lowercase(), value.to_owned());
    }
    cmd
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_pairs() {
        let c = parse("flag stars on");
        assert_eq!(c.name, "flag");
        assert_eq!(c.get("stars"), Some("on"));
        assert_eq!(c.args.len(), 1);
    }

    #[test]
    fn name_and_keys_lowercased_values_kept() {
        let c = parse("IMAGE Name Logo FileName Dome.PNG");
        assert_eq!(c.name, "image");
        assert_eq!(c.get("name"), Some("Logo"));
        assert_eq!(c.get("filename"), Some("Dome.PNG"));
    }

    #[test]
    fn single_word_quoted_value() {
        let c = parse(r#"text name "title" string x"#);
        assert_eq!(c.get("name"), Some("title"));
        assert_eq!(c.get("string"), Some("x"));
    }

    #[test]
    fn multi_word_quoted_value() {
        let c = parse(r#"text string "Welcome to the   dome" size 20"#);
        assert_eq!(c.get("string"), Some("Welcome to the   dome"));
        assert_eq!(c.get("size"), Some("20"));
    }

    #[test]
    fn unterminated_quote_consumes_rest_of_line() {
        let c = parse(r#"print text "no closing quote here size 3"#);
        assert_eq!(c.get("text"), Some("no closing quote here size 3"));
        assert_eq!(c.args.len(), 1);
    }

    #[test]
    fn empty_quoted_value() {
        let c = parse(r#"text string "" name t"#);
        assert_eq!(c.get("string"), Some(""));
        assert_eq!(c.get("name"), Some("t"));
    }

    #[test]
    fn dangling_key_gets_empty_value() {
        let c = parse("script action");
        assert_eq!(c.get("action"), Some(""));
    }

    #[test]
    fn duplicate_key_last_wins() {
        let c = parse("set a 1 a 2");
        assert_eq!(c.get("a"), Some("2"));
    }

    #[test]
    fn equals_form_matches_spaced_form() {
        assert_eq!(parse("struct if=0"), parse("struct if 0"));
        assert_eq!(parse("random min=5 max=6"), parse("random min 5 max 6"));
        let c = parse("struct LOOP=end");
        assert_eq!(c.get("loop"), Some("end"));
    }

    #[test]
    fn equals_form_with_quoted_value() {
        let c = parse(r#"text string="Welcome to the dome" size=20"#);
        assert_eq!(c.get("string"), Some("Welcome to the dome"));
        assert_eq!(c.get("size"), Some("20"));
    }

    #[test]
    fn equals_form_edge_cases() {
        let c = parse("set home= sky a=b=c");
        assert_eq!(c.get("home"), Some(""));
        assert_eq!(c.get("sky"), Some("a=b=c"));
        let c = parse("flag =on x");
        assert_eq!(c.get("=on"), Some("x"));
    }

    #[test]
    fn blank_line_has_empty_name() {
        assert!(parse("").is_empty());
        assert!(parse("   \t ").is_empty());
    }

    #[test]
    fn require_reports_missing_key() {
        let c = parse("wait");
        assert_eq!(c.require("duration"), Err(ScriptError::missing("wait", "duration")));
    }

    #[test]
    fn to_line_quotes_whitespace_values() {
        let c = Command::new("text", [("string", "hello world"), ("name", "t")]);
        assert_eq!(c.to_line(), r#"text name t string "hello world""#);
        assert_eq!(parse(&c.to_line()), c);
    }
}
