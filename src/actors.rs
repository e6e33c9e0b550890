//! [`Actor`] (vertex) and [`VertexStore`]: the immutable, code-sorted array of
//! actors that every other component looks things up in.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::CamminiError;

/// A single actor (graph vertex). `neighbors` starts empty and is filled
/// exactly once, by [`crate::graph_loader::GraphLoader`], after which it must
/// not be mutated again. Reading it before the loader has run is a logic
/// error in the caller, not a data race: [`Actor::neighbors`] panics rather
/// than returning stale or torn data.
#[derive(Debug)]
pub struct Actor {
    pub code: i32,
    pub name: String,
    pub birth_year: i32,
    neighbors: OnceLock<Vec<i32>>,
}

impl Actor {
    fn new(code: i32, name: String, birth_year: i32) -> Self {
        Self {
            code,
            name,
            birth_year,
            neighbors: OnceLock::new(),
        }
    }

    /// Neighbor codes, in the order the graph file listed them.
    ///
    /// # Panics
    ///
    /// Panics if called before [`GraphLoader`](crate::graph_loader::GraphLoader)
    /// has populated this vertex.
    pub fn neighbors(&self) -> &[i32] {
        self.neighbors
            .get()
            .map(Vec::as_slice)
            .unwrap_or_else(|| panic!("neighbors of actor {} read before graph load", self.code))
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors().len()
    }

    /// Called by the graph loader, once, from whichever consumer thread owns
    /// this vertex's line. Subsequent calls (there should be none) panic
    /// rather than silently overwriting the first result.
    pub(crate) fn set_neighbors(&self, neighbors: Vec<i32>) {
        self.neighbors
            .set(neighbors)
            .unwrap_or_else(|_| panic!("neighbors of actor {} set twice", self.code));
    }

    /// `code\tname\tyear\t`, the wire format used in path output files.
    pub fn format_line(&self) -> String {
        format!("{}\t{}\t{}\t", self.code, self.name, self.birth_year)
    }
}

/// Immutable, ascending-by-code array of actors, built once at startup.
///
/// The source file is assumed already sorted by `code`; this is a documented
/// precondition for [`VertexStore::lookup`], not something the loader
/// verifies by sorting.
pub struct VertexStore {
    actors: Vec<Actor>,
}

impl VertexStore {
    /// Parses `code\tname\tyear\n` records, one per line. Blank lines are
    /// skipped. Any malformed line or I/O error aborts the whole load.
    pub fn load(path: &Path) -> Result<Self, CamminiError> {
        let file = File::open(path).map_err(|e| CamminiError::io(path, e))?;
        let reader = BufReader::new(file);

        let mut actors = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| CamminiError::io(path, e))?;
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split('\t');
            let code: i32 = fields
                .next()
                .ok_or_else(|| CamminiError::parse(path, line_no + 1, "missing code field"))?
                .parse()
                .map_err(|_| CamminiError::parse(path, line_no + 1, "non-numeric code"))?;
            if code <= 0 {
                return Err(CamminiError::parse(
                    path,
                    line_no + 1,
                    format!("actor code must be positive, got {code}"),
                ));
            }

            let name = fields
                .next()
                .ok_or_else(|| CamminiError::parse(path, line_no + 1, "missing name field"))?
                .to_string();

            let birth_year: i32 = fields
                .next()
                .ok_or_else(|| CamminiError::parse(path, line_no + 1, "missing year field"))?
                .parse()
                .map_err(|_| CamminiError::parse(path, line_no + 1, "non-numeric year"))?;

            actors.push(Actor::new(code, name, birth_year));
        }

        log::info!("loaded {} actors from {}", actors.len(), path.display());
        Ok(Self { actors })
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// The largest code in the store, used to size the BFS parent table.
    /// Panics on an empty store — a names file with zero actors cannot serve
    /// any query anyway.
    pub fn max_code(&self) -> i32 {
        self.actors
            .last()
            .expect("VertexStore must contain at least one actor")
            .code
    }

    /// O(log n) lookup by code; relies on the store being sorted ascending.
    pub fn lookup(&self, code: i32) -> Option<&Actor> {
        self.actors
            .binary_search_by_key(&code, |a| a.code)
            .ok()
            .map(|idx| &self.actors[idx])
    }
}
