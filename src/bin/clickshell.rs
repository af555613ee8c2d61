// src/bin/clickshell.rs

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use colored::Colorize;
use scopeguard::defer;

use clickshell::CancellationToken;
use clickshell::core::{listener, reactor::Reactor, relay};
use clickshell::session::Session;
use clickshell::system::supervisor::{self, Breaker, HostSlot, ShellProcess};
use clickshell::system::terminal::{self, Terminal};
use clickshell::system::shells_config;

/// The main entry point of the `clickshell` wrapper.
/// It sets up logging, wires the components together, runs the reactor on
/// this thread, and performs centralized error handling.
fn main() {
    env_logger::init();

    match run() {
        // Propagate the wrapped shell's own exit code.
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("\n{}: {:#}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let config = shells_config::load_config()?;
    log::debug!("shell config loaded: {:?}", config.shell);

    let ShellProcess {
        child,
        stdin,
        stdout,
        stderr,
    } = supervisor::spawn_shell(&config.shell)?;
    let shell_pid = child.id();

    let shutdown: CancellationToken = Arc::new(AtomicBool::new(false));

    // The console host may not exist yet at this instant; discovery retries
    // in the background until it shows up.
    let host_slot: HostSlot = match config.shell.host_process.clone() {
        Some(host_name) => {
            let (slot, _discovery) =
                supervisor::spawn_host_discovery(shell_pid, host_name, shutdown.clone());
            slot
        }
        None => Arc::new(OnceLock::new()),
    };

    println!(
        "{}",
        format!("--- clickshell session for '{}' started ---", config.shell.path).dimmed()
    );

    terminal::enter_interactive_mode()?;
    defer! {
        terminal::leave_interactive_mode();
    }

    let reactor: Reactor<Session> = Reactor::new();
    let submitter = reactor.submitter();

    let mut session = Session::new(
        Box::new(Terminal::new()),
        Box::new(stdin),
        Breaker::new(shell_pid, host_slot),
    );

    let relays = vec![
        relay::open(stdout, submitter.clone(), Session::write_stdout),
        relay::open(stderr, submitter.clone(), Session::write_stderr),
    ];

    let _listener = listener::spawn(submitter.clone(), shutdown.clone());
    let _watcher = supervisor::spawn_exit_watcher(child, relays, submitter, shutdown);

    // The reactor is the single thread that owns the terminal from here on.
    // It returns once the shell has exited and all queued output is drained.
    Ok(reactor.run(&mut session))
}
