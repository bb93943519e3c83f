//! Show scripting runtime.
//!
//! A show script is plain text, one command per line:
//!
//! ```text
//! flag stars on
//! wait duration 1
//! text name title string "Welcome to the dome"
//! ```
//!
//! - [`token`] splits a line into a [`Command`]
//! - [`registry`] maps command names to opcodes
//! - [`control`] holds comment/if suppression and the loop buffer
//! - [`source`] is the queue of pending script lines
//! - [`interp`] dispatches commands and drives the playback clock
//!
//! # Quick start
//!
//! ```rust
//! use showctl::script::Interpreter;
//!
//! let mut interp = Interpreter::default();
//! interp.execute("define x 6").unwrap();
//! interp.execute("multiply x 7").unwrap();
//! interp.execute("print var x").unwrap();
//! assert_eq!(interp.output, vec!["x = 42"]);
//! ```

pub mod control;
pub mod interp;
pub mod registry;
pub mod source;
pub mod token;

pub use interp::Interpreter;
pub use registry::{Capability, Opcode};
pub use token::{parse, Command};
