//! Kiosk shell binary - a full-screen terminal menu extended by plugins.
//!
//! This is the main binary entry point. See the `kiosk_shell` library for
//! the core functionality.

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kiosk_shell::constants::{FALLBACK_LOG_FILE, LOG_FILE, VERSION};
use kiosk_shell::device::ConfiguredDevices;
use kiosk_shell::plugin::discover_units;
use kiosk_shell::process::SystemRunner;
use kiosk_shell::tui::{restore_terminal, TerminalGuard, TerminalHost};
use kiosk_shell::{Config, LoadPolicy, Shell, StopReason};
use mimalloc::MiMalloc;
use ratatui::{backend::CrosstermBackend, Terminal};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
/// mimalloc provides better performance than the system allocator.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Global flag for signal-triggered shutdown (as Arc for signal-hook compatibility)
static SHUTDOWN_FLAG: std::sync::LazyLock<Arc<AtomicBool>> =
    std::sync::LazyLock::new(|| Arc::new(AtomicBool::new(false)));

#[derive(Parser)]
#[command(name = "kiosk")]
#[command(about = "Terminal kiosk shell", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the kiosk (default)
    Run {
        /// Extra plugin directory, scanned after the configured ones
        #[arg(long = "plugins", value_name = "DIR")]
        plugin_dirs: Vec<PathBuf>,
        /// Abort startup when any plugin fails to load
        #[arg(long)]
        fail_fast: bool,
    },
    /// Print the effective configuration
    Config,
    /// List the plugin units that would be loaded
    Plugins,
}

/// Build the shell, take over the terminal and run until stopped.
fn run(plugin_dirs: Vec<PathBuf>, fail_fast: bool) -> Result<()> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::flag;
    flag::register(SIGINT, Arc::clone(&SHUTDOWN_FLAG))?;
    flag::register(SIGTERM, Arc::clone(&SHUTDOWN_FLAG))?;
    flag::register(SIGHUP, Arc::clone(&SHUTDOWN_FLAG))?;

    let mut config = Config::load()?;
    config.plugin_dirs.extend(plugin_dirs);
    if fail_fast {
        config.load_policy = LoadPolicy::FailFast;
    }
    let devices = ConfiguredDevices::new(config.input_devices.clone());

    // Load plugins BEFORE entering raw mode so errors are visible
    let mut shell = Shell::new(config, Rc::new(SystemRunner))?;
    for name in shell.failures() {
        eprintln!("Plugin '{name}' failed to load, see the log for details");
    }
    let monitored = shell.attach_devices(&devices)?;
    log::info!("Monitoring {monitored} input device(s)");

    let _terminal_guard = TerminalGuard::enter()?;
    let terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))
        .context("Failed to create terminal")?;
    let mut host = TerminalHost::new(terminal);

    log::info!("Kiosk v{VERSION} started");
    let summary = shell.run(&mut host, &SHUTDOWN_FLAG)?;
    if let Some(report) = summary.shutdown {
        log::info!(
            "Shutdown: {} task(s) cancelled, {} failed, {} teardown hook(s)",
            report.cancelled,
            report.failed,
            report.teardown_hooks_run
        );
    }

    match summary.reason {
        StopReason::Fault(n) => anyhow::bail!("Stopped after {n} fault(s), see the log"),
        StopReason::Requested | StopReason::Interrupted => Ok(()),
    }
}

fn log_path() -> PathBuf {
    if let Ok(path) = std::env::var("KIOSK_LOG_FILE") {
        return PathBuf::from(path);
    }
    Config::data_dir().map_or_else(|_| PathBuf::from(FALLBACK_LOG_FILE), |d| d.join(LOG_FILE))
}

fn main() -> Result<()> {
    // File logging so the TUI doesn't interfere with log output
    let log_path = log_path();
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("Failed to create log file at {}", log_path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .format_timestamp_secs()
        .init();

    // Log panics and restore the terminal before printing them
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log::error!("PANIC: {:?}", panic_info);
        restore_terminal();
        default_hook(panic_info);
    }));

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run {
        plugin_dirs: Vec::new(),
        fail_fast: false,
    }) {
        Commands::Run {
            plugin_dirs,
            fail_fast,
        } => run(plugin_dirs, fail_fast)?,
        Commands::Config => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Plugins => {
            let config = Config::load()?;
            for unit in discover_units(&config.plugin_dirs) {
                println!("{}\t{}", unit.name, unit.entry.display());
            }
        }
    }

    Ok(())
}
