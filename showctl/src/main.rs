use env_logger::Env;
use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use showctl::cli::{self, ConfigFile, RecordTarget};
use showctl::config::Config;
use showctl::headless::HeadlessStage;
use showctl::host::Host;
use showctl::script::Interpreter;
use showctl::transport::{self, INBOUND_CAPACITY};
use showctl::var::VarStore;

#[tokio::main]
async fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("showctl: {e}");
            eprintln!("Usage: showctl [-f[<file>]] [-c<cmd>] [-l<addr>] [-r[<name>]] [-d] [<script>]");
            std::process::exit(1);
        }
    };

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    // ── Config ────────────────────────────────────────────────────────────────
    let config_path = match &args.config {
        ConfigFile::Skip => None,
        ConfigFile::Explicit(path) => Some(path.clone()),
        ConfigFile::Search => cli::find_user_config(),
    };
    let config = match config_path {
        None => Config::new(),
        Some(path) => match Config::load_file(&path) {
            Ok((config, errors)) => {
                for e in errors {
                    warn!("{}: {e}", path.display());
                }
                info!("loaded {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}: {e}", path.display());
                Config::new()
            }
        },
    };

    // ── Interpreter ───────────────────────────────────────────────────────────
    let stage = HeadlessStage::new();
    let flags = stage.flags();
    let mut vars = VarStore::new();
    vars.set_random_bounds(config.random_min, config.random_max);
    let mut interp = Interpreter::with_vars(Box::new(stage), vars);
    flags.bind_all(interp.flags_mut());
    interp.set_script_dir(&config.script_dir);
    interp.set_record_dir(&config.record_dir);

    for cmd in &args.commands {
        let _ = interp.execute(cmd);
    }

    if let Some(target) = &args.record {
        let name = match target {
            RecordTarget::Auto => None,
            RecordTarget::Named(n) => Some(n.as_str()),
        };
        let _ = interp.start_recording(name);
    }

    if let Some(script) = &args.script {
        if interp.play_script(script).is_err() {
            std::process::exit(1);
        }
    }

    // ── Transports ────────────────────────────────────────────────────────────
    let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
    let mut host = Host::new(interp, config.frame_rate);
    host.flush_output();

    if let Err(e) = transport::spawn_stdin_reader(tx.clone()) {
        error!("stdin: {e}");
    }

    if let Some(addr) = args.listen.or(config.listen) {
        match TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("listening on {addr}");
                host.set_serving(true);
                tokio::spawn(transport::serve(listener, tx));
            }
            Err(e) => error!("listen {addr}: {e}"),
        }
    }

    // ── Main loop ─────────────────────────────────────────────────────────────
    if let Err(e) = host.run(rx).await {
        eprintln!("showctl: {e}");
        std::process::exit(1);
    }
    info!("flags on at exit: {}", flags.enabled().join(" "));
}
