// src/system/supervisor.rs

use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use sysinfo::{Pid, ProcessesToUpdate, System};
use thiserror::Error;

use crate::CancellationToken;
use crate::constants::HOST_DISCOVERY_RETRY_DELAY;
use crate::core::reactor::Submitter;
use crate::system::shells_config::ShellConfig;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Shell '{shell}' could not be started: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Shell was spawned without a redirected {0} pipe.")]
    MissingPipe(&'static str),
}

/// The wrapped interpreter and its three redirected stream endpoints.
/// Exactly one exists per run; the exit watcher consumes the child handle.
pub struct ShellProcess {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

impl ShellProcess {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

/// Spawns the configured interpreter with all three standard streams
/// redirected and, on Windows, without a console window of its own. The
/// wrapper's terminal is the only visible surface.
pub fn spawn_shell(config: &ShellConfig) -> Result<ShellProcess, SupervisorError> {
    let path = config.expanded_path();
    let mut command = Command::new(&path);
    command
        .args(&config.quiet_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = command.spawn().map_err(|source| SupervisorError::Spawn {
        shell: path.display().to_string(),
        source,
    })?;
    log::debug!("shell '{}' spawned with pid {}", path.display(), child.id());

    let stdin = child
        .stdin
        .take()
        .ok_or(SupervisorError::MissingPipe("stdin"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or(SupervisorError::MissingPipe("stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or(SupervisorError::MissingPipe("stderr"))?;

    Ok(ShellProcess {
        child,
        stdin,
        stdout,
        stderr,
    })
}

/// Filled once the console-host descendant of the shell has been located.
pub type HostSlot = Arc<OnceLock<u32>>;

/// Polls the process tree until an immediate child of `shell_pid` named
/// `host_name` appears, then records its pid and stops.
///
/// The host is usually created moments after the shell itself, so the first
/// scans routinely miss it; that is the known race the retry loop absorbs.
/// Retries are never surfaced and have no upper bound, but the thread does
/// stop once the shutdown token fires.
pub fn spawn_host_discovery(
    shell_pid: u32,
    host_name: String,
    shutdown: CancellationToken,
) -> (HostSlot, JoinHandle<()>) {
    let slot: HostSlot = Arc::new(OnceLock::new());
    let writer = Arc::clone(&slot);
    let handle = thread::spawn(move || {
        let mut system = System::new();
        while !shutdown.load(Ordering::Relaxed) {
            system.refresh_processes(ProcessesToUpdate::All, true);
            if let Some(pid) = find_immediate_child_named(&system, shell_pid, &host_name) {
                let _ = writer.set(pid);
                log::debug!("console host discovered: pid {pid}");
                return;
            }
            thread::sleep(HOST_DISCOVERY_RETRY_DELAY);
        }
        log::debug!("host discovery stopped without a match");
    });
    (slot, handle)
}

fn find_immediate_child_named(system: &System, parent: u32, name: &str) -> Option<u32> {
    system
        .processes()
        .iter()
        .find(|(_, process)| {
            process.parent() == Some(Pid::from_u32(parent))
                && process.name().eq_ignore_ascii_case(name)
        })
        .map(|(pid, _)| pid.as_u32())
}

/// Handles an interactive break: kills every descendant of the wrapped shell
/// except the console host, so runaway commands die while the session
/// surface survives. The wrapper and the shell itself keep running.
#[derive(Clone)]
pub struct Breaker {
    shell_pid: u32,
    host: HostSlot,
}

impl Breaker {
    pub fn new(shell_pid: u32, host: HostSlot) -> Self {
        Self { shell_pid, host }
    }

    pub fn interrupt_children(&self) {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let table: Vec<(u32, Option<u32>)> = system
            .processes()
            .iter()
            .map(|(pid, process)| (pid.as_u32(), process.parent().map(|p| p.as_u32())))
            .collect();

        let host = self.host.get().copied();
        for pid in break_targets(&table, self.shell_pid, host) {
            // A pid enumerated a moment ago may already be gone; that is
            // "already dead", not an error.
            match system.process(Pid::from_u32(pid)) {
                Some(process) => {
                    if process.kill() {
                        log::debug!("killed descendant process {pid}");
                    } else {
                        log::warn!("could not kill descendant process {pid}");
                    }
                }
                None => log::debug!("descendant process {pid} already gone"),
            }
        }
    }
}

/// Collects every transitive descendant of `root` from a `(pid, parent)`
/// snapshot of the process table.
pub fn descendants_of(processes: &[(u32, Option<u32>)], root: u32) -> Vec<u32> {
    let mut descendants = Vec::new();
    let mut to_visit = vec![root];

    while let Some(current) = to_visit.pop() {
        let children: Vec<u32> = processes
            .iter()
            .filter(|(_, parent)| *parent == Some(current))
            .map(|(pid, _)| *pid)
            .collect();

        descendants.extend(&children);
        to_visit.extend(children);
    }

    descendants
}

/// Selects the pids a break must kill: every transitive descendant of `root`
/// minus the console host. The host's own children are still targets. When
/// the host has not been discovered yet, all descendants are killed.
pub fn break_targets(
    processes: &[(u32, Option<u32>)],
    root: u32,
    host: Option<u32>,
) -> Vec<u32> {
    descendants_of(processes, root)
        .into_iter()
        .filter(|pid| Some(*pid) != host)
        .collect()
}

/// Watches for the shell's exit. When it dies, both relays are joined first
/// (they finish on their own at pipe EOF) so every trailing chunk of output
/// is already queued, then the reactor's queue is marked complete with the
/// shell's exit code. Shutdown is cooperative; nothing is force-stopped.
pub fn spawn_exit_watcher<S: 'static>(
    mut child: Child,
    relays: Vec<JoinHandle<()>>,
    submitter: Submitter<S>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let exit_code = match child.wait() {
            Ok(status) => {
                log::debug!("shell exited with status {status}");
                status.code().unwrap_or(1)
            }
            Err(e) => {
                log::error!("failed waiting on the shell process: {e}");
                1
            }
        };
        for relay in relays {
            let _ = relay.join();
        }
        shutdown.store(true, Ordering::Relaxed);
        submitter.complete(exit_code);
    })
}
