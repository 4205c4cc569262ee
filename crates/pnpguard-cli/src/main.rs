//! `pnpguard` – operator shell for the pick-and-place motion guard.
//!
//! The binary:
//!
//! 1. Initialises logging (and OTLP export when configured).
//! 2. Loads `~/.pnpguard/config.toml`, writing a default one on first run.
//! 3. Loads the machine description named on the command line, in the config
//!    or by `PNPGUARD_MACHINE_FILE`; falls back to a built-in demo machine.
//! 4. Wraps the machine in a [`JogGate`] and drops the operator into an
//!    **interactive REPL**.
//! 5. Intercepts **Ctrl-C** and leaves the REPL at the next prompt.

mod config;
mod machine_file;
mod repl;
mod telemetry;

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use pnpguard_kernel::{JogGate, MotionVerifier};
use pnpguard_machine::MachineRegistry;
use pnpguard_machine::sim::SimDriver;

fn main() {
    let _telemetry = telemetry::init_tracing("pnpguard");

    print_banner();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – leaving pnpguard …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Config ────────────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            match config::save(&config::Config::default()) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    // ── Machine ───────────────────────────────────────────────────────────
    let machine_path = std::env::args().nth(1).map(PathBuf::from).or(cfg.machine_file.clone());
    let mut machine = match &machine_path {
        Some(path) => match machine_file::load(path) {
            Ok(machine) => {
                println!("  Machine loaded from {}", path.display().to_string().bold());
                machine
            }
            Err(e) => {
                eprintln!("{}: {}", "Machine error".red(), e);
                std::process::exit(1);
            }
        },
        None => {
            println!("  {}", "No machine file configured, using the demo machine.".dimmed());
            machine_file::demo_machine()
        }
    };
    if let Some(enabled) = cfg.board_protection {
        machine.settings.board_protection = enabled;
    }
    info!(
        tools = machine.tools.len(),
        boards = machine.boards.len(),
        board_protection = machine.settings.board_protection,
        "machine ready"
    );

    // G-code controllers are not driven from here; every move goes to the
    // simulated driver.
    let (driver, _) = SimDriver::recording();
    let registry = match MachineRegistry::new(machine, driver) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("{}: {}", "Machine error".red(), e);
            std::process::exit(1);
        }
    };
    let gate = JogGate::new(registry, MotionVerifier::with_default_rules())
        .with_history_limit(cfg.history_limit);

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(&gate, shutdown);
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"                                          __"#.bold().cyan());
    println!("{}", r#"   ___  ___  ___  ___ ___ _____ ________/ /"#.bold().cyan());
    println!("{}", r#"  / _ \/ _ \/ _ \/ _ `/ // / _ `/ __/ _  / "#.bold().cyan());
    println!("{}", r#" / .__/_//_/ .__/\_, /\_,_/\_,_/_/  \_,_/  "#.bold().cyan());
    println!("{}", r#"/_/       /_/   /___/                      "#.bold().cyan());
    println!();
    println!("  {} {}",
        "pnpguard".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Board protection for pick-and-place jogging");
    println!();
}
