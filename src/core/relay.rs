// src/core/relay.rs

use std::io::{ErrorKind, Read};
use std::thread::{self, JoinHandle};

use crate::constants::READ_CHUNK_SIZE;
use crate::core::reactor::Submitter;

/// Begins an unbounded forward from `source` into the reactor.
///
/// The relay thread only reads; every chunk is handed to `deliver` inside a
/// reactor work item, so the actual write and flush happen on the single
/// serialized thread and interleave correctly with keyboard echo and the
/// other relayed stream. A zero-byte read is the normal end: the wrapped
/// shell exited and closed its pipe, and the relay terminates silently.
pub fn open<S, R>(source: R, submitter: Submitter<S>, deliver: fn(&mut S, &[u8])) -> JoinHandle<()>
where
    R: Read + Send + 'static,
    S: 'static,
{
    thread::spawn(move || {
        let mut source = source;
        let mut buf = [0u8; READ_CHUNK_SIZE];
        loop {
            match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = buf[..n].to_vec();
                    if !submitter.submit(move |state: &mut S| deliver(state, &chunk)) {
                        // Reactor already gone; nowhere left to forward to.
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("relay read ended: {e}");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reactor::Reactor;
    use std::io::Cursor;

    fn deliver(state: &mut Vec<u8>, bytes: &[u8]) {
        state.extend_from_slice(bytes);
    }

    #[test]
    fn test_forwards_all_bytes_in_order() {
        // Larger than one chunk so the forward spans several work items.
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let reactor: Reactor<Vec<u8>> = Reactor::new();
        let submitter = reactor.submitter();

        let relay = open(Cursor::new(payload.clone()), submitter.clone(), deliver);
        relay.join().expect("relay thread panicked");
        submitter.complete(0);

        let mut forwarded = Vec::new();
        reactor.run(&mut forwarded);

        assert_eq!(forwarded, payload);
    }

    #[test]
    fn test_empty_source_terminates_silently() {
        let reactor: Reactor<Vec<u8>> = Reactor::new();
        let submitter = reactor.submitter();

        let relay = open(Cursor::new(Vec::new()), submitter.clone(), deliver);
        relay.join().expect("relay thread panicked");
        submitter.complete(0);

        let mut forwarded = Vec::new();
        reactor.run(&mut forwarded);

        assert!(forwarded.is_empty());
    }
}
