//! Reads binary query records off the named pipe and spawns one detached
//! [`crate::bfs`] worker per record.

use std::os::fd::BorrowedFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::stat::Mode;
use nix::unistd::{close, mkfifo, read};

use crate::actors::VertexStore;
use crate::error::CamminiError;
use crate::signal_coordinator::Flags;

const POLL_TIMEOUT_MS: u16 = 500;
const OPEN_RETRY: Duration = Duration::from_secs(1);
const DRAIN_GRACE: Duration = Duration::from_secs(20);

/// A single parsed `(a, b)` query record.
#[derive(Debug, Clone, Copy)]
pub struct QueryMessage {
    pub a: i32,
    pub b: i32,
}

impl QueryMessage {
    const WIRE_SIZE: usize = 8;

    fn from_wire(bytes: [u8; Self::WIRE_SIZE]) -> Self {
        let a = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let b = i32::from_le_bytes(bytes[4..8].try_into().unwrap());
        Self { a, b }
    }
}

/// Creates (or reuses) the FIFO, serves queries until shutdown or EOF, then
/// grants the in-flight workers a fixed grace window before returning.
pub fn run(
    pipe_path: &Path,
    store: Arc<VertexStore>,
    flags: Arc<Flags>,
) -> Result<(), CamminiError> {
    create_fifo(pipe_path)?;

    let fd = match open_nonblocking_until_writer(pipe_path, &flags)? {
        Some(fd) => fd,
        None => {
            log::info!("shutdown requested before any writer connected to the pipe");
            std::thread::sleep(DRAIN_GRACE);
            return Ok(());
        }
    };

    let result = read_loop(fd, pipe_path, &store, &flags);

    log::info!("dispatcher loop exited, granting {DRAIN_GRACE:?} for in-flight workers to finish");
    std::thread::sleep(DRAIN_GRACE);

    close(fd).map_err(|e| CamminiError::io(pipe_path, std::io::Error::from(e)))?;

    result
}

fn create_fifo(pipe_path: &Path) -> Result<(), CamminiError> {
    match mkfifo(pipe_path, Mode::from_bits_truncate(0o660)) {
        Ok(()) => {
            log::info!("created FIFO at {}", pipe_path.display());
            Ok(())
        }
        Err(Errno::EEXIST) => {
            log::info!("FIFO at {} already exists, reusing it", pipe_path.display());
            Ok(())
        }
        Err(e) => Err(CamminiError::io(pipe_path, std::io::Error::from(e))),
    }
}

/// Opens the FIFO read-only, non-blocking, retrying on `ENXIO` (no writer
/// has connected yet) so a SIGINT arriving before any writer connects can
/// still be observed rather than blocking forever in a plain `open`.
/// Returns `Ok(None)` if shutdown was requested before a writer showed up.
fn open_nonblocking_until_writer(
    pipe_path: &Path,
    flags: &Flags,
) -> Result<Option<std::os::fd::RawFd>, CamminiError> {
    loop {
        match open(pipe_path, OFlag::O_RDONLY | OFlag::O_NONBLOCK, Mode::empty()) {
            Ok(fd) => return Ok(Some(fd)),
            Err(Errno::ENXIO) => {
                if flags.must_shutdown() {
                    return Ok(None);
                }
                std::thread::sleep(OPEN_RETRY);
            }
            Err(e) => return Err(CamminiError::io(pipe_path, std::io::Error::from(e))),
        }
    }
}

fn read_loop(
    fd: std::os::fd::RawFd,
    pipe_path: &Path,
    store: &Arc<VertexStore>,
    flags: &Flags,
) -> Result<(), CamminiError> {
    loop {
        if flags.must_shutdown() {
            log::info!("shutdown requested, exiting dispatcher read loop");
            return Ok(());
        }

        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let mut poll_fd = PollFd::new(borrowed, PollFlags::POLLIN);
        let ready = poll(
            std::slice::from_mut(&mut poll_fd),
            PollTimeout::from(POLL_TIMEOUT_MS),
        )
        .map_err(|e| CamminiError::io(pipe_path, std::io::Error::from(e)))?;

        if ready == 0 {
            continue; // timed out, loop back to re-check must_shutdown
        }

        let mut buf = [0u8; QueryMessage::WIRE_SIZE];
        let n = read(fd, &mut buf).map_err(|e| CamminiError::io(pipe_path, std::io::Error::from(e)))?;

        if n == 0 {
            log::info!("all FIFO writers closed, exiting dispatcher read loop");
            return Ok(());
        }
        if n != QueryMessage::WIRE_SIZE {
            return Err(CamminiError::Protocol(format!(
                "short read on FIFO: got {n} of {} bytes",
                QueryMessage::WIRE_SIZE
            )));
        }

        let query = QueryMessage::from_wire(buf);
        spawn_worker(query, Arc::clone(store));
    }
}

fn spawn_worker(query: QueryMessage, store: Arc<VertexStore>) {
    std::thread::spawn(move || {
        log::debug!("worker started for query ({}, {})", query.a, query.b);
        crate::bfs::run_query(query.a, query.b, &store);
        log::debug!("worker finished for query ({}, {})", query.a, query.b);
    });
}

/// `cammini.pipe`, relative to the current working directory, matching
/// the wire-visible name queries are expected to connect to.
pub fn default_pipe_path() -> PathBuf {
    PathBuf::from("cammini.pipe")
}
