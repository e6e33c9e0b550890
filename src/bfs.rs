//! Per-query breadth-first search: computes the shortest path between two
//! actor codes, writes the result file, and prints the stdout summary line.

use std::fs::File;
use std::io::Write;
use std::time::Instant;

use crate::actors::VertexStore;
use crate::explored_set::ExploredSet;
use crate::frontier::Frontier;

const NO_PARENT: i32 = -1;

enum Outcome {
    InvalidCode { invalid: i32 },
    SelfPath { code: i32 },
    NoPath { a: i32, b: i32 },
    Path(Vec<i32>),
}

/// Runs one query end to end: BFS, file write, stdout summary. Never
/// panics on a malformed query — an invalid `a`/`b` is a documented
/// outcome, not an error. Errors opening or writing the output file are
/// logged and swallowed here, per the per-query failure-isolation policy:
/// one bad query must not take down the dispatcher or any other worker.
pub fn run_query(a: i32, b: i32, store: &VertexStore) {
    let started = Instant::now();

    let outcome = if store.lookup(a).is_none() {
        Outcome::InvalidCode { invalid: a }
    } else if a == b {
        Outcome::SelfPath { code: a }
    } else if store.lookup(b).is_none() {
        Outcome::InvalidCode { invalid: b }
    } else {
        match search(a, b, store) {
            Some(path) => Outcome::Path(path),
            None => Outcome::NoPath { a, b },
        }
    };

    let elapsed = started.elapsed().as_secs_f64();
    let file_name = format!("{a}.{b}");

    if let Err(e) = write_output(&file_name, &outcome, store) {
        log::error!("worker for ({a}, {b}) failed to write {file_name}: {e}");
        return;
    }

    let summary = match &outcome {
        Outcome::InvalidCode { .. } => "Codici invalidi".to_string(),
        Outcome::SelfPath { .. } => "Lunghezza minima 0".to_string(),
        Outcome::NoPath { .. } => "Nessun cammino trovato".to_string(),
        Outcome::Path(path) => format!("Lunghezza minima {}", path.len() - 1),
    };

    println!("{file_name}: {summary}. Tempo di elaborazione {elapsed:.3} secondi");
}

fn write_output(file_name: &str, outcome: &Outcome, store: &VertexStore) -> std::io::Result<()> {
    let mut file = File::create(file_name)?;
    match outcome {
        Outcome::InvalidCode { invalid } => {
            writeln!(file, "Codice {invalid} non valido")?;
        }
        Outcome::SelfPath { code } => {
            let actor = store.lookup(*code).expect("self-query code already validated");
            writeln!(file, "{}", actor.format_line())?;
        }
        Outcome::NoPath { a, b } => {
            writeln!(file, "Non esistono cammini da {a} a {b}")?;
        }
        Outcome::Path(path) => {
            for code in path {
                let actor = store.lookup(*code).expect("path vertex must exist");
                writeln!(file, "{}", actor.format_line())?;
            }
        }
    }
    Ok(())
}

/// BFS from `a` to `b`. Both codes are already known-valid and distinct.
/// Returns the full vertex-code path (`a` first, `b` last) or `None` if `b`
/// is unreachable.
fn search(a: i32, b: i32, store: &VertexStore) -> Option<Vec<i32>> {
    let max_code = store.max_code();
    let mut parent = vec![0i32; (max_code as usize) + 1];
    parent[a as usize] = NO_PARENT;

    let mut explored = ExploredSet::new();
    explored.insert(a);

    let mut frontier = Frontier::new();
    frontier.enqueue(a);

    while !frontier.is_empty() {
        let current = frontier.dequeue();
        let actor = store.lookup(current).expect("frontier only ever holds known codes");

        for &neighbor in actor.neighbors() {
            if neighbor == b {
                parent[b as usize] = current;
                return Some(reconstruct(a, b, &parent));
            }
            if !explored.contains(neighbor) {
                parent[neighbor as usize] = current;
                explored.insert(neighbor);
                frontier.enqueue(neighbor);
            }
        }
    }

    None
}

fn reconstruct(a: i32, b: i32, parent: &[i32]) -> Vec<i32> {
    let mut stack = Vec::new();
    let mut code = b;
    loop {
        stack.push(code);
        if code == a {
            break;
        }
        code = parent[code as usize];
    }
    stack.reverse();
    stack
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::VertexStore;
    use crate::graph_loader;
    use std::io::Write as _;

    fn scratch_store(names: &str, graph: &str, workers: usize) -> VertexStore {
        let mut names_file = tempfile::NamedTempFile::new().unwrap();
        names_file.write_all(names.as_bytes()).unwrap();
        let mut graph_file = tempfile::NamedTempFile::new().unwrap();
        graph_file.write_all(graph.as_bytes()).unwrap();

        let store = VertexStore::load(names_file.path()).unwrap();
        graph_loader::load(graph_file.path(), workers, &store).unwrap();
        store
    }

    #[test]
    fn finds_two_hop_path() {
        let store = scratch_store(
            "1\tA\t1980\n2\tB\t1981\n3\tC\t1982\n",
            "1\t1\t2\t\n2\t2\t1\t3\t\n3\t1\t2\t\n",
            2,
        );
        let path = search(1, 3, &store).unwrap();
        assert_eq!(path, vec![1, 2, 3]);
    }

    #[test]
    fn reports_no_path_when_unreachable() {
        let store = scratch_store(
            "1\tA\t1980\n2\tB\t1981\n3\tC\t1982\n",
            "1\t1\t2\t\n2\t1\t1\t\n3\t0\t\n",
            1,
        );
        assert!(search(1, 3, &store).is_none());
    }

    #[test]
    fn trivial_self_query_path_is_a_single_vertex() {
        let store = scratch_store("10\tAlice\t1970\n", "10\t0\t\n", 1);
        assert_eq!(store.lookup(10).unwrap().format_line(), "10\tAlice\t1970\t");
    }
}
