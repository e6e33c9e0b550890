//! Cooperative shutdown coordination.
//!
//! The original blocks SIGINT process-wide with `pthread_sigmask` and
//! consumes it synchronously in a dedicated thread via `sigwait`. That
//! mechanism doesn't translate: `signal-hook`'s delivery is itself built on
//! installing a real signal handler (behind a self-pipe), and a process-wide
//! `sigprocmask` block would stop that handler from ever firing. So this
//! module keeps the *behavior* — exactly one thread reacts to SIGINT, every
//! other thread is oblivious to it — without the matching *mechanism*: SIGINT
//! is left unblocked and handled by a `signal_hook::iterator::Signals` loop
//! on its own thread instead of being blocked everywhere and waited on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::SIGINT;
use signal_hook::iterator::Signals;

use crate::error::CamminiError;

/// The two shutdown flags shared across the whole process.
///
/// `finished_graph` is set once, by the thread that drives graph loading,
/// after which it is only ever read. `must_shutdown` is set at most once, by
/// the signal thread, after which it is only ever read. Both are plain
/// `AtomicBool`s rather than a mutex-guarded struct: there is a single
/// writer per flag and readers only need to observe "has it happened yet",
/// so `Release`-on-write / `Acquire`-on-read is sufficient and considerably
/// cheaper than a lock on the dispatcher's poll loop.
#[derive(Default)]
pub struct Flags {
    finished_graph: AtomicBool,
    must_shutdown: AtomicBool,
}

impl Flags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mark_graph_finished(&self) {
        self.finished_graph.store(true, Ordering::Release);
    }

    pub fn graph_finished(&self) -> bool {
        self.finished_graph.load(Ordering::Acquire)
    }

    /// Sets the shutdown flag. Normally only [`spawn`]'s signal thread calls
    /// this; it is `pub` rather than private so integration tests can
    /// simulate SIGINT without installing a real signal handler.
    pub fn request_shutdown(&self) {
        self.must_shutdown.store(true, Ordering::Release);
    }

    pub fn must_shutdown(&self) -> bool {
        self.must_shutdown.load(Ordering::Acquire)
    }
}

/// Spawns the dedicated SIGINT-handling thread and returns its handle.
///
/// While `finished_graph` is false, an arriving SIGINT is logged and
/// otherwise ignored (interrupting the load would leave `VertexStore` and
/// the graph half-populated, which no other component is prepared to
/// observe). Once the graph has finished loading, the first SIGINT sets
/// `must_shutdown` and the thread exits; it does not attempt to also
/// re-raise or forward the signal, since the dispatcher's poll loop is
/// solely responsible for winding down from here.
pub fn spawn(flags: Arc<Flags>) -> Result<std::thread::JoinHandle<()>, CamminiError> {
    let mut signals = Signals::new([SIGINT])
        .map_err(|e| CamminiError::io(std::path::PathBuf::from("SIGINT"), e))?;

    Ok(std::thread::spawn(move || {
        for _ in signals.forever() {
            if !flags.graph_finished() {
                log::info!("SIGINT received during graph build, ignoring");
                continue;
            }
            log::info!("SIGINT received while serving, beginning shutdown");
            flags.request_shutdown();
            return;
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_default_to_false() {
        let flags = Flags::new();
        assert!(!flags.graph_finished());
        assert!(!flags.must_shutdown());
    }

    #[test]
    fn graph_finished_is_observable_after_marking() {
        let flags = Flags::new();
        flags.mark_graph_finished();
        assert!(flags.graph_finished());
        assert!(!flags.must_shutdown());
    }
}
