//! Diagnostic infrastructure - error and warning reporting.
//!
//! The lexer and parser report problems through a shared [`Handler`],
//! which collects [`Diagnostic`] values instead of printing eagerly.
//! The driver drains the handler after parsing and renders everything to
//! the configured error stream. Runtime diagnostics (regex compile
//! failures, I/O errors) go straight to the error stream instead; by the
//! time the interpreter runs, there is no batch to collect.
//!
//! # Example
//!
//! ```
//! use fawk_util::{DiagnosticBuilder, Handler, Span};
//!
//! let handler = Handler::new();
//! DiagnosticBuilder::error("unexpected token")
//!     .span(Span::new(4, 5, 1, 5))
//!     .emit(&handler);
//!
//! assert!(handler.has_errors());
//! ```

use std::cell::RefCell;
use std::fmt;

use crate::Span;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// A problem that makes the program unusable.
    Error,
    /// A suspicious construct; execution proceeds.
    Warning,
    /// Additional context attached to a preceding diagnostic.
    Note,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
        }
    }
}

/// A single diagnostic message with severity and location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity level.
    pub level: Level,

    /// Main message text.
    pub message: String,

    /// Source location, `Span::DUMMY` when there is none.
    pub span: Span,

    /// Source file the span refers to, if known.
    pub file: Option<String>,

    /// Follow-up notes.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    pub fn new(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            message: message.into(),
            span,
            file: None,
            notes: Vec::new(),
        }
    }

    /// Creates an error diagnostic.
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span)
    }

    /// Creates a warning diagnostic.
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, message, span)
    }
}

impl fmt::Display for Diagnostic {
    /// Renders as `file:line:col: level: message`, omitting the pieces
    /// that are unknown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file)?;
        }
        if !self.span.is_dummy() {
            write!(f, "{}: ", self.span)?;
        }
        write!(f, "{}: {}", self.level, self.message)?;
        for note in &self.notes {
            write!(f, "\n    note: {}", note)?;
        }
        Ok(())
    }
}

/// Fluent builder for diagnostics.
///
/// ```
/// use fawk_util::{DiagnosticBuilder, Handler, Span};
///
/// let handler = Handler::new();
/// DiagnosticBuilder::error("unterminated string")
///     .span(Span::new(10, 11, 2, 3))
///     .note("string started here")
///     .emit(&handler);
/// ```
pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    /// Starts building an error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            diagnostic: Diagnostic::error(message, Span::DUMMY),
        }
    }

    /// Starts building a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            diagnostic: Diagnostic::warning(message, Span::DUMMY),
        }
    }

    /// Sets the span.
    pub fn span(mut self, span: Span) -> Self {
        self.diagnostic.span = span;
        self
    }

    /// Sets the source file name.
    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.diagnostic.file = Some(file.into());
        self
    }

    /// Adds a note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.diagnostic.notes.push(note.into());
        self
    }

    /// Finishes the diagnostic without emitting it.
    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }

    /// Emits the diagnostic to the given handler.
    pub fn emit(self, handler: &Handler) {
        handler.emit(self.diagnostic);
    }
}

/// Collects diagnostics for later rendering.
///
/// Interior mutability lets the lexer and parser share one handler
/// without threading `&mut` borrows through every production.
#[derive(Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Creates an empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Returns true if any error-level diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Number of error-level diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Total number of diagnostics of any level.
    pub fn count(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    /// Drains all collected diagnostics in emission order.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    /// Renders every collected diagnostic to a writer, one per line.
    pub fn render(&self, out: &mut dyn std::io::Write) -> std::io::Result<()> {
        for diagnostic in self.diagnostics.borrow().iter() {
            writeln!(out, "fawk: {}", diagnostic)?;
        }
        Ok(())
    }
}
