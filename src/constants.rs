// src/constants.rs

use std::time::Duration;

/// The name of the directory containing clickshell configuration (in ~/.config/).
pub const CONFIG_DIR_NAME: &str = "clickshell";

/// The name of the shell configuration file (inside the config directory).
pub const SHELL_CONFIG_FILENAME: &str = "shell.toml";

/// Upper bound for a single relay read. One chunk becomes one reactor work item.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Delay between process-tree scans while looking for the console host child.
pub const HOST_DISCOVERY_RETRY_DELAY: Duration = Duration::from_millis(100);

/// How long the input listener waits for an event before re-checking shutdown.
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Command line intercepted locally instead of being forwarded to the shell.
pub const CLEAR_COMMAND: &str = "cls";
