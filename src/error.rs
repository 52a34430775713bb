//! Error types for the varanno library.

use thiserror::Error;

/// Errors that can occur during varanno operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A parse error occurred while reading input data.
    #[error("{0}")]
    Parse(String),

    /// A validation constraint was violated.
    #[error("{0}")]
    Validation(String),

    /// A chromosome name absent from the configured chromosome table.
    /// Numerical positions are undefined for it, so the run must abort.
    #[error("chromosome not in configured table: {0}")]
    UnknownChromosome(String),
}
