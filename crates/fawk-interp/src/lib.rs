//! fawk-interp - the tree-walking AWK interpreter.
//!
//! Consumes the AST from `fawk-par` and executes it: the value model
//! with AWK's string/number/numeric-string tri-state, the variable
//! environment and function scopes, the `$0`/field machine, the
//! compiled-regex cache, the I/O tables (files, pipes, coprocesses),
//! the printf engine, and the built-in function library.
//!
//! # Example
//!
//! ```
//! use fawk_interp::{Interpreter, SharedBuf};
//! use fawk_util::Handler;
//!
//! let handler = Handler::new();
//! let program = fawk_par::parse_program(
//!     "BEGIN { print \"Hello, World!\" }",
//!     None,
//!     &handler,
//! );
//!
//! let out = SharedBuf::new();
//! let mut interp = Interpreter::new(program);
//! interp.set_stdout(Box::new(out.clone()));
//! let status = interp.run(&[]);
//!
//! assert_eq!(status, 0);
//! assert_eq!(out.contents(), "Hello, World!\n");
//! ```

pub mod builtins;
pub mod environ;
pub mod interp;
pub mod io;
pub mod printf;
pub mod recache;
pub mod record;
pub mod value;

pub use builtins::{Catalog, IdentityCatalog};
pub use interp::{Interpreter, Unwind};
pub use recache::RegexCache;
pub use value::Value;

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// An in-memory output stream that can be read back after the
/// interpreter is done with its writer half. Cloning shares the
/// buffer. The interpreter is single-threaded, so plain `Rc` interior
/// mutability suffices.
#[derive(Clone, Default)]
pub struct SharedBuf {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bytes written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
