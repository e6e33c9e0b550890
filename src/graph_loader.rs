//! Parallel graph loader: a single-producer / `W`-consumer pipeline over a
//! fixed-capacity ring buffer of text lines, matching the original's
//! semaphore-and-mutex design rather than a higher-level channel, since the
//! buffer's capacity/occupancy invariants are part of the spec this module
//! is built against.

use std::cell::UnsafeCell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::actors::VertexStore;
use crate::error::CamminiError;

const BUFFER_CAPACITY: usize = 20;

/// How often a blocked `acquire` re-checks the shared abort flag. Bounds the
/// latency between one consumer failing and every other thread in the
/// pipeline noticing and unwinding.
const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A textbook Mutex+Condvar counting semaphore. `std` has no native one;
/// this is the standard way to build one in safe Rust.
struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// Blocks until a permit is available, periodically waking to check
    /// `aborted`. Returns `false` without taking a permit if `aborted` is
    /// ever observed set; `true` once a permit is acquired normally.
    ///
    /// A plain `acquire` would block forever here if a consumer dies with an
    /// error mid-file: nothing else would ever drain the buffer, so the
    /// producer would hang on a full `free_slots`, and any sibling consumer
    /// idle on an empty `items_in` would hang right alongside it. Polling
    /// `aborted` on every wakeup is what lets a single failure unwind the
    /// whole pipeline instead of just the thread that hit it.
    fn acquire_or_abort(&self, aborted: &AtomicBool) -> bool {
        let mut count = self.count.lock().unwrap();
        loop {
            if *count > 0 {
                *count -= 1;
                return true;
            }
            if aborted.load(Ordering::Acquire) {
                return false;
            }
            let (guard, _timed_out) = self
                .available
                .wait_timeout(count, ABORT_POLL_INTERVAL)
                .unwrap();
            count = guard;
        }
    }

    fn release(&self) {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        self.available.notify_one();
    }

    fn notify_all(&self) {
        self.available.notify_all();
    }
}

/// The producer/consumer line buffer.
///
/// # Safety
///
/// `slots` is written by the producer and read by consumers through a shared
/// `&LineBuffer`. This is sound because `free_slots`/`items_in` establish a
/// happens-before edge between "a consumer finished reading slot `i`" and
/// "the producer is allowed to write slot `i` again" (and symmetrically for
/// the first write): a slot is never written and read concurrently. The
/// `consumer_index` mutex additionally serializes *which* consumer reads a
/// given occupied slot, so no two consumers ever read the same slot.
type Line = Option<(usize, String)>;

/// What a `retrieve()` call handed back: a line to parse, the normal
/// termination sentinel, or "give up, someone else already failed."
enum Retrieved {
    Line(usize, String),
    Sentinel,
    Aborted,
}

struct LineBuffer {
    slots: Box<[UnsafeCell<Line>]>,
    free_slots: Semaphore,
    items_in: Semaphore,
    consumer_index: Mutex<usize>,
    aborted: AtomicBool,
}

unsafe impl Sync for LineBuffer {}

impl LineBuffer {
    fn new() -> Self {
        Self {
            slots: (0..BUFFER_CAPACITY)
                .map(|_| UnsafeCell::new(None))
                .collect(),
            free_slots: Semaphore::new(BUFFER_CAPACITY),
            items_in: Semaphore::new(0),
            consumer_index: Mutex::new(0),
            aborted: AtomicBool::new(false),
        }
    }

    /// Producer-only: deposits `value` at the next slot. The producer owns
    /// its write index exclusively (single producer), so no mutex guards it.
    /// Returns `false` (without depositing) if the pipeline has been
    /// aborted, so the producer knows to stop feeding a buffer nothing is
    /// draining any more.
    fn deposit(&self, index: usize, value: Line) -> bool {
        if !self.free_slots.acquire_or_abort(&self.aborted) {
            return false;
        }
        let slot = index % BUFFER_CAPACITY;
        unsafe { *self.slots[slot].get() = value };
        self.items_in.release();
        true
    }

    /// Consumer-side: blocks until an item is available, the termination
    /// sentinel arrives, or the pipeline is aborted.
    fn retrieve(&self) -> Retrieved {
        if !self.items_in.acquire_or_abort(&self.aborted) {
            return Retrieved::Aborted;
        }
        let value = {
            let mut index = self.consumer_index.lock().unwrap();
            let slot = *index % BUFFER_CAPACITY;
            let value = unsafe { (*self.slots[slot].get()).take() };
            *index += 1;
            value
        };
        self.free_slots.release();
        match value {
            Some((line_no, line)) => Retrieved::Line(line_no, line),
            None => Retrieved::Sentinel,
        }
    }

    /// Called by the producer (on its own I/O error) or by a consumer (on a
    /// parse error) the moment it gives up. Wakes every thread blocked in
    /// `acquire_or_abort` so it can re-check `aborted` immediately instead of
    /// waiting out the poll interval.
    fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
        self.free_slots.notify_all();
        self.items_in.notify_all();
    }
}

/// Parses `code\tk\tc1\t...\tck\t\n` and fills in the named vertex's
/// neighbor list. Fatal on any mismatch between `k` and the actual count of
/// trailing fields, or if `code` names no vertex.
fn update_neighbors(
    line: &str,
    path: &Path,
    line_no: usize,
    store: &VertexStore,
) -> Result<(), CamminiError> {
    let mut fields = line.trim_end_matches(['\n', '\r']).split('\t');

    let code: i32 = fields
        .next()
        .ok_or_else(|| CamminiError::parse(path, line_no, "missing code field"))?
        .parse()
        .map_err(|_| CamminiError::parse(path, line_no, "non-numeric code"))?;

    let actor = store
        .lookup(code)
        .ok_or_else(|| CamminiError::parse(path, line_no, format!("unknown actor code {code}")))?;

    let expected: usize = fields
        .next()
        .ok_or_else(|| CamminiError::parse(path, line_no, "missing neighbor count field"))?
        .parse()
        .map_err(|_| CamminiError::parse(path, line_no, "non-numeric neighbor count"))?;

    let neighbors: Vec<i32> = fields
        .filter(|f| !f.is_empty())
        .map(|f| {
            f.parse::<i32>()
                .map_err(|_| CamminiError::parse(path, line_no, "non-numeric neighbor code"))
        })
        .collect::<Result<_, _>>()?;

    if neighbors.len() != expected {
        return Err(CamminiError::parse(
            path,
            line_no,
            format!(
                "neighbor count mismatch for actor {code}: expected {expected}, found {}",
                neighbors.len()
            ),
        ));
    }

    actor.set_neighbors(neighbors);
    Ok(())
}

/// Reads `graph_path` and fills in `neighbors`/`neighbor_count` for every
/// vertex named in it, using `workers` consumer threads. Blocks until the
/// whole file has been consumed (mirrors the original joining every
/// consumer thread before returning).
///
/// Any consumer's parse error, or a producer-side I/O error, aborts the
/// whole pipeline rather than just the thread that hit it: `LineBuffer`
/// tracks a shared `aborted` flag so the producer stops depositing and every
/// other consumer stops retrieving as soon as one side gives up, instead of
/// blocking forever on a buffer nothing is left to drain.
pub fn load(graph_path: &Path, workers: usize, store: &VertexStore) -> Result<(), CamminiError> {
    use std::io::BufRead;

    let file = std::fs::File::open(graph_path).map_err(|e| CamminiError::io(graph_path, e))?;
    let mut reader = std::io::BufReader::new(file);
    let buffer = LineBuffer::new();
    let worker_count = workers.max(1);

    let result: Result<(), CamminiError> = std::thread::scope(|scope| {
        let worker_handles: Vec<_> = (0..worker_count)
            .map(|_| {
                scope.spawn(|| -> Result<(), CamminiError> {
                    loop {
                        match buffer.retrieve() {
                            Retrieved::Sentinel | Retrieved::Aborted => return Ok(()),
                            Retrieved::Line(line_no, line) => {
                                if let Err(e) = update_neighbors(&line, graph_path, line_no, store)
                                {
                                    buffer.abort();
                                    return Err(e);
                                }
                            }
                        }
                    }
                })
            })
            .collect();

        // Producer: this thread. Any exit path other than "fed the whole
        // file and its sentinels" marks the pipeline aborted so the workers
        // above don't idle forever waiting on a buffer nobody fills.
        let produce = || -> Result<(), CamminiError> {
            let mut index = 0usize;
            let mut line = String::new();
            let mut line_no = 0usize;
            loop {
                line.clear();
                let read = reader
                    .read_line(&mut line)
                    .map_err(|e| CamminiError::io(graph_path, e))?;
                if read == 0 {
                    break;
                }
                line_no += 1;
                if line == "\n" {
                    continue;
                }
                if !buffer.deposit(index, Some((line_no, line.clone()))) {
                    // A consumer already failed; nothing more to feed it.
                    return Ok(());
                }
                index += 1;
            }
            for _ in 0..worker_count {
                if !buffer.deposit(index, None) {
                    break;
                }
                index += 1;
            }
            Ok(())
        };

        let producer_result = produce();
        if producer_result.is_err() {
            buffer.abort();
        }

        let mut worker_err = None;
        for handle in worker_handles {
            if let Err(e) = handle.join().expect("graph loader worker panicked") {
                worker_err.get_or_insert(e);
            }
        }

        producer_result?;
        if let Some(e) = worker_err {
            return Err(e);
        }
        Ok(())
    });

    result?;
    log::info!(
        "graph load complete: {} vertices populated using {worker_count} workers",
        store.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::VertexStore;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_with_varying_worker_counts() {
        let names = write_temp("1\tA\t1980\n2\tB\t1981\n3\tC\t1982\n");
        let graph = "1\t1\t2\t\n2\t2\t1\t3\t\n3\t1\t2\t\n";

        for workers in [1usize, 2, 8, 32] {
            let store = VertexStore::load(names.path()).unwrap();
            let graph_file = write_temp(graph);
            load(graph_file.path(), workers, &store).unwrap();

            assert_eq!(store.lookup(1).unwrap().neighbors(), &[2]);
            assert_eq!(store.lookup(2).unwrap().neighbors(), &[1, 3]);
            assert_eq!(store.lookup(3).unwrap().neighbors(), &[2]);
        }
    }

    #[test]
    fn rejects_neighbor_count_mismatch() {
        let names = write_temp("1\tA\t1980\n2\tB\t1981\n");
        let graph = write_temp("1\t2\t2\t\n");
        let store = VertexStore::load(names.path()).unwrap();
        assert!(load(graph.path(), 2, &store).is_err());
    }

    /// Regression for a deadlock: with a single consumer and a bad record
    /// followed by far more lines than fit in one buffer-full, the old
    /// implementation let the dying consumer stop draining while the
    /// producer kept blocking on `deposit`, forever. This file has one
    /// malformed record (line 2, wrong neighbor count) and enough trailing
    /// valid-looking lines to overflow `BUFFER_CAPACITY` several times over
    /// if nothing aborts the pipeline.
    #[test]
    fn single_worker_unwinds_instead_of_deadlocking_on_a_mid_file_error() {
        let mut names_contents = String::new();
        for code in 1..=(BUFFER_CAPACITY * 4 + 5) {
            names_contents.push_str(&format!("{code}\tActor{code}\t1980\n"));
        }
        let names = write_temp(&names_contents);

        let mut graph_contents = String::from("1\t2\t2\t\n"); // wrong count: fatal
        for code in 2..=(BUFFER_CAPACITY * 4 + 5) {
            graph_contents.push_str(&format!("{code}\t0\t\n"));
        }
        let graph = write_temp(&graph_contents);

        let store = VertexStore::load(names.path()).unwrap();
        assert!(load(graph.path(), 1, &store).is_err());
    }

    /// Same deadlock shape, but with several consumers: the other, otherwise
    /// healthy workers must also notice the abort and return instead of
    /// blocking on `retrieve` forever once the producer stops depositing.
    #[test]
    fn multiple_workers_unwind_together_on_a_mid_file_error() {
        let mut names_contents = String::new();
        for code in 1..=(BUFFER_CAPACITY * 4 + 5) {
            names_contents.push_str(&format!("{code}\tActor{code}\t1980\n"));
        }
        let names = write_temp(&names_contents);

        let mut graph_contents = String::from("1\t2\t2\t\n"); // wrong count: fatal
        for code in 2..=(BUFFER_CAPACITY * 4 + 5) {
            graph_contents.push_str(&format!("{code}\t0\t\n"));
        }
        let graph = write_temp(&graph_contents);

        let store = VertexStore::load(names.path()).unwrap();
        assert!(load(graph.path(), 8, &store).is_err());
    }
}
