//! # System Interaction Layer
//!
//! This module is the boundary between the coordination core and the
//! operating system: the terminal device, the wrapped shell process and its
//! process tree, and the on-disk configuration.
//!
//! ## Modules
//!
//! - **`terminal`**: The terminal device wrapper. Raw-mode/mouse-capture
//!   switching, discrete input events with re-injection, cursor control, and
//!   screen clearing, all behind the `Console` trait.
//! - **`supervisor`**: Owns the wrapped shell's lifetime. Spawns it with
//!   redirected streams and no visible window, discovers its console-host
//!   descendant, watches for exit, and on an interactive break kills every
//!   descendant except that host.
//! - **`shells_config`**: Loading and first-run generation of `shell.toml`,
//!   which names the interpreter, its quiet-start arguments, and the
//!   console-host process to preserve.

pub mod shells_config;
pub mod supervisor;
pub mod terminal;
