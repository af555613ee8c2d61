// src/core/listener.rs

use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crossterm::event;

use crate::CancellationToken;
use crate::constants::INPUT_POLL_INTERVAL;
use crate::core::reactor::Submitter;
use crate::session::Session;

/// Starts the input listener thread.
///
/// Each iteration blocks until the OS signals that an input event is
/// available, then submits one input-handling work item to the reactor. The
/// event itself is read, classified, and acted on inside that work item;
/// nothing on this thread ever touches the terminal.
///
/// The listener then waits for an explicit "input processed" ack before
/// polling again. Without it the listener races ahead and observes the event
/// a second time before the reactor has consumed it, which shows up as a
/// phantom cursor jump.
pub fn spawn(submitter: Submitter<Session>, shutdown: CancellationToken) -> JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) {
            match event::poll(INPUT_POLL_INTERVAL) {
                Ok(false) => continue,
                Ok(true) => {
                    let (ack_tx, ack_rx) = mpsc::channel::<()>();
                    let submitted = submitter.submit(move |session: &mut Session| {
                        if let Err(e) = session.handle_input() {
                            log::error!("input handling failed: {e:#}");
                        }
                        let _ = ack_tx.send(());
                    });
                    if !submitted {
                        break;
                    }
                    // If the reactor shuts down with our item still queued,
                    // the ack sender is dropped and recv unblocks with Err.
                    if ack_rx.recv().is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("input poll failed: {e}");
                    break;
                }
            }
        }
        log::debug!("input listener stopped");
    })
}
