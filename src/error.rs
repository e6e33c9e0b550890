//! Error taxonomy for the engine: configuration, I/O, parse, and protocol failures.
//!
//! Mirrors the five kinds the original error-wrapper layer (`xerrori`) collapsed
//! into a single variadic `xtermina()` call. Allocation failure has no separate
//! variant here: Rust's global allocator aborts the process on OOM rather than
//! returning an error a caller can observe, so that kind has no surface in safe code.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CamminiError {
    #[error("invalid arguments: {0}")]
    Configuration(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record in {path} at line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl CamminiError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CamminiError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        CamminiError::Parse {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}
