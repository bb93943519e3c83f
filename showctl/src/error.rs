//! Error taxonomy for the scripting runtime.
//!
//! Nothing in the interpreter aborts a running show: every failure is local to
//! the command that produced it, logged, and surfaced to the caller as a
//! [`ScriptError`] while playback carries on with the next line.

use std::path::PathBuf;

use thiserror::Error;

/// A failed command or runtime operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// The first word of a line names no registered command.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// `flag <name> …` with a name that is not in the flag table.
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),

    /// A handler needed an argument the line did not provide.
    #[error("{command}: missing argument '{arg}'")]
    MissingArgument { command: String, arg: String },

    /// An argument was present but unusable.
    #[error("{command}: bad value '{value}' for '{arg}'")]
    BadArgument { command: String, arg: String, value: String },

    /// `add`/`multiply`/`print var` on a name that was never defined.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// A script could not be read or a recording could not be written.
    #[error("{}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// The host stage does not provide the capability a command needs.
    #[error("'{0}' is not supported by this stage")]
    Unsupported(String),

    /// A collaborator refused or failed to carry out a command.
    #[error("{command}: {message}")]
    Rejected { command: String, message: String },

    /// The operation is not legal in the current playback or loop state.
    #[error("{0}")]
    State(String),
}

impl ScriptError {
    pub fn missing(command: &str, arg: &str) -> Self {
        ScriptError::MissingArgument { command: command.to_owned(), arg: arg.to_owned() }
    }

    pub fn bad(command: &str, arg: &str, value: &str) -> Self {
        ScriptError::BadArgument {
            command: command.to_owned(),
            arg: arg.to_owned(),
            value: value.to_owned(),
        }
    }

    pub fn rejected(command: &str, message: impl Into<String>) -> Self {
        ScriptError::Rejected { command: command.to_owned(), message: message.into() }
    }

    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        ScriptError::Io { path: path.into(), message: err.to_string() }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_culprit() {
        assert_eq!(
            ScriptError::UnknownCommand("frobnicate".into()).to_string(),
            "unknown command 'frobnicate'"
        );
        assert_eq!(
            ScriptError::missing("wait", "duration").to_string(),
            "wait: missing argument 'duration'"
        );
    }

    #[test]
    fn io_error_includes_path() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let e = ScriptError::io("/shows/intro.sts", &err);
        assert_eq!(e.to_string(), "/shows/intro.sts: not found");
    }
}
