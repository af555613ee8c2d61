// src/lib.rs

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Shared shutdown flag observed by the background threads (input listener,
/// host discovery). Set by the exit watcher once the wrapped shell is gone.
pub type CancellationToken = Arc<AtomicBool>;

pub mod constants;
pub mod core;
pub mod session;
pub mod system;
