//! fawk-util - shared infrastructure for the fawk toolchain.
//!
//! This crate holds the pieces every other fawk crate needs: source
//! spans, the diagnostic handler, and the error types shared across
//! phase boundaries. It deliberately has no AWK semantics of its own.

pub mod diagnostic;
pub mod escape;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, Handler, Level};
pub use escape::unescape;
pub use span::Span;

use thiserror::Error;

/// Error type for program-loading operations in the driver.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A program or data file could not be read.
    #[error("can't open file `{path}`: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for source-loading operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;
