//! Show-control scripting runtime for a planetarium dome.
//!
//! Scripts are plain text, one command per line, played against a frame
//! clock.  The runtime owns parsing, dispatch, control flow, variables,
//! timing and recording; everything that draws or plays sound sits behind
//! the [`stage::Stage`] trait.

pub mod cli;
pub mod config;
pub mod error;
pub mod flag;
pub mod headless;
pub mod host;
pub mod playback;
pub mod recorder;
pub mod script;
pub mod stage;
pub mod transport;
pub mod var;

pub use error::ScriptError;
