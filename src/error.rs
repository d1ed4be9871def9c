//! Error types for the benchmark harness.

use thiserror::Error;

/// Errors that can occur while configuring or running a benchmark.
///
/// The harness has no retry machinery: every variant is terminal for at least
/// the current test case, and configuration errors abort the whole run.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid configuration (unknown distance type, bad parameter, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// A (data kind, distance type) pair with no registered space.
    #[error("unsupported space: distance {dist} over {kind} vectors")]
    UnsupportedSpace { kind: String, dist: String },

    /// I/O error (data files, working directory)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (bincode, serde_json)
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Error reported by the index backend under test.
    #[error("backend error: {0}")]
    Backend(String),

    /// External benchmark process failed.
    #[error("external process failed (status {status}): {stderr}")]
    External { status: i32, stderr: String },

    /// The external process' result table is malformed or does not echo the
    /// requested parameters. Signals output corruption or version skew.
    #[error("result table error: {0}")]
    ResultTable(String),
}

impl From<bincode::Error> for BenchError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(format!("bincode error: {e}"))
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(format!("json error: {e}"))
    }
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, BenchError>;
