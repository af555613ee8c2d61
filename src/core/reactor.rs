// src/core/reactor.rs

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{Receiver, Sender, channel};

/// A queued, parameterless unit of deferred work executed against the shared
/// session state. No return value; failures are logged at the loop boundary.
pub type Work<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

enum WorkItem<S> {
    Run(Work<S>),
    /// Marks the queue complete. Carries the exit code the process should
    /// terminate with once the remaining items have been drained.
    Complete(i32),
}

/// Cloneable submission handle to the reactor queue. This is the only
/// interface the input listener, the stream relays, and the exit watcher
/// hold; none of them ever touch the session state directly.
pub struct Submitter<S> {
    tx: Sender<WorkItem<S>>,
}

// Manual impl: `S` itself does not need to be `Clone`.
impl<S> Clone for Submitter<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> Submitter<S> {
    /// Enqueues `work` for execution on the reactor thread. Callable from any
    /// thread. Returns `false` if the reactor has already terminated.
    pub fn submit(&self, work: impl FnOnce(&mut S) + Send + 'static) -> bool {
        self.tx.send(WorkItem::Run(Box::new(work))).is_ok()
    }

    /// Marks the queue complete. Already-queued items are still drained
    /// before the reactor returns `exit_code`.
    pub fn complete(&self, exit_code: i32) -> bool {
        self.tx.send(WorkItem::Complete(exit_code)).is_ok()
    }
}

/// The single synchronization domain of the wrapper: a FIFO queue of work
/// items drained by one thread. All terminal writes, cursor moves, editor
/// transitions, and pipe writes happen inside items executed here, so they
/// are strictly ordered and never overlap. Correctness by funneling, not by
/// locking.
pub struct Reactor<S> {
    tx: Sender<WorkItem<S>>,
    rx: Receiver<WorkItem<S>>,
}

impl<S> Reactor<S> {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    pub fn submitter(&self) -> Submitter<S> {
        Submitter {
            tx: self.tx.clone(),
        }
    }

    /// Runs the reactor loop on the calling thread until the queue is marked
    /// complete and drained, or every submitter has been dropped. Returns the
    /// exit code to terminate the process with.
    pub fn run(self, state: &mut S) -> i32 {
        // Drop our own sender so a fully-disconnected queue can end the loop.
        let Self { tx, rx } = self;
        drop(tx);

        loop {
            match rx.recv() {
                Ok(WorkItem::Run(work)) => Self::execute(state, work),
                Ok(WorkItem::Complete(exit_code)) => {
                    // Complete-adding: drain whatever is already queued, then stop.
                    while let Ok(WorkItem::Run(work)) = rx.try_recv() {
                        Self::execute(state, work);
                    }
                    return exit_code;
                }
                Err(_) => return 0,
            }
        }
    }

    /// Executes one item, isolating its failures: a panicking work item is
    /// reported on the error stream and must not take the relay down with it.
    fn execute(state: &mut S, work: Work<S>) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| work(state))) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            log::error!("queued work item failed: {message}");
        }
    }
}

impl<S> Default for Reactor<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_items_execute_in_submission_order() {
        let reactor: Reactor<Vec<u32>> = Reactor::new();
        let submitter = reactor.submitter();

        for i in 0..100 {
            submitter.submit(move |state: &mut Vec<u32>| state.push(i));
        }
        submitter.complete(0);

        let mut state = Vec::new();
        let code = reactor.run(&mut state);

        assert_eq!(code, 0);
        assert_eq!(state, (0..100).collect::<Vec<u32>>());
    }

    #[test]
    fn test_panicking_item_does_not_stop_the_loop() {
        let reactor: Reactor<Vec<&'static str>> = Reactor::new();
        let submitter = reactor.submitter();

        submitter.submit(|state: &mut Vec<&str>| state.push("before"));
        submitter.submit(|_: &mut Vec<&str>| panic!("bad handler"));
        submitter.submit(|state: &mut Vec<&str>| state.push("after"));
        submitter.complete(7);

        let mut state = Vec::new();
        let code = reactor.run(&mut state);

        assert_eq!(code, 7);
        assert_eq!(state, vec!["before", "after"]);
    }

    #[test]
    fn test_complete_drains_already_queued_items() {
        let reactor: Reactor<Vec<u32>> = Reactor::new();
        let submitter = reactor.submitter();

        // Queue everything before the reactor even starts: the completion
        // marker must not cut off items submitted ahead of it.
        submitter.submit(|state: &mut Vec<u32>| state.push(1));
        submitter.submit(|state: &mut Vec<u32>| state.push(2));
        submitter.complete(3);

        let mut state = Vec::new();
        let code = reactor.run(&mut state);

        assert_eq!(code, 3);
        assert_eq!(state, vec![1, 2]);
    }

    #[test]
    fn test_submit_from_another_thread() {
        let reactor: Reactor<Vec<u32>> = Reactor::new();
        let submitter = reactor.submitter();

        let producer = thread::spawn(move || {
            for i in 0..10 {
                assert!(submitter.submit(move |state: &mut Vec<u32>| state.push(i)));
            }
            submitter.complete(0);
        });

        let mut state = Vec::new();
        reactor.run(&mut state);
        producer.join().expect("producer thread panicked");

        assert_eq!(state, (0..10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_loop_ends_when_all_submitters_are_gone() {
        let reactor: Reactor<Vec<u32>> = Reactor::new();
        let submitter = reactor.submitter();
        submitter.submit(|state: &mut Vec<u32>| state.push(1));
        drop(submitter);

        let mut state = Vec::new();
        let code = reactor.run(&mut state);

        assert_eq!(code, 0);
        assert_eq!(state, vec![1]);
    }
}
