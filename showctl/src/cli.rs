//! Command-line argument parsing.
//!
//! Usage:
//!   showctl [-f[<file>]] [-c<cmd>] [-l<addr>] [-r[<name>]] [-d] [<script>]

use std::path::PathBuf;

use directories::ProjectDirs;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Config-file specification.
    pub config: ConfigFile,
    /// Command lines to execute after loading config (`-c<cmd>`, repeatable).
    pub commands: Vec<String>,
    /// TCP address to accept command connections on (`-l<addr>`).
    pub listen: Option<String>,
    /// Start recording at startup (`-r[<name>]`).
    pub record: Option<RecordTarget>,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Script to play immediately.
    pub script: Option<PathBuf>,
}

/// How to choose the config file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// Search `~/.showrc`, `./.showrc`, then the platform config dir (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip config.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

/// Where a startup recording goes.
#[derive(Debug, PartialEq, Eq)]
pub enum RecordTarget {
    /// `-r`: timestamped file in the record directory.
    Auto,
    /// `-r<name>`.
    Named(String),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(&raw[1..])
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            let rest: String = chars[j + 1..].iter().collect();
            match chars[j] {
                'd' => args.debug = true,

                // -f[<file>]
                'f' => {
                    if !rest.is_empty() {
                        args.config = ConfigFile::Explicit(PathBuf::from(rest));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -r[<name>]: the name must be attached, a separate word is
                // the script to play.
                'r' => {
                    args.record = Some(if rest.is_empty() {
                        RecordTarget::Auto
                    } else {
                        j = chars.len();
                        RecordTarget::Named(rest)
                    });
                }

                // -c<cmd>, -l<addr>
                c @ ('c' | 'l') => {
                    let value = if !rest.is_empty() {
                        j = chars.len();
                        rest
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{c} requires an argument"));
                    };
                    if c == 'c' {
                        args.commands.push(value);
                    } else {
                        args.listen = Some(value);
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    match positional.len() {
        0 => {}
        1 => args.script = Some(PathBuf::from(positional.remove(0))),
        n => return Err(format!("too many arguments ({n})")),
    }

    Ok(args)
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Platform config file (`<config dir>/showrc`), if a home directory exists.
pub fn platform_config() -> Option<PathBuf> {
    ProjectDirs::from("", "", "showctl").map(|d| d.config_dir().join("showrc"))
}

/// Search for the config file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_user_config() -> Option<PathBuf> {
    let home = std::env::var("HOME").unwrap_or_default();
    [PathBuf::from(format!("{home}/.showrc")), PathBuf::from("./.showrc")]
        .into_iter()
        .chain(platform_config())
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
