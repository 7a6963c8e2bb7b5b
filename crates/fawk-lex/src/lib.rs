//! fawk-lex - Lexical analyzer for AWK programs.
//!
//! Transforms AWK source text into a stream of spanned tokens. The
//! interesting part of lexing AWK is that it is not context-free at the
//! token level:
//!
//! - `/` begins a regex literal in operand position and is division
//!   elsewhere. The lexer tracks this with one flag updated per emitted
//!   token (see [`Token::expects_regex_after`]).
//! - Newlines terminate statements, so they are tokens rather than
//!   whitespace; `\` immediately before a newline continues the line.
//! - `name(` is a function-call name while `name (` is concatenation,
//!   so adjacency with `(` is decided here.
//!
//! # Example
//!
//! ```
//! use fawk_lex::{Lexer, Token};
//! use fawk_util::Handler;
//!
//! let handler = Handler::new();
//! let mut lexer = Lexer::new("NR % 2 { print $1 }", &handler);
//!
//! assert_eq!(lexer.next_token().token, Token::Ident("NR".into()));
//! assert_eq!(lexer.next_token().token, Token::Percent);
//! assert_eq!(lexer.next_token().token, Token::Number(2.0));
//! ```

pub mod cursor;
mod edge_cases;
mod lexer;
mod token;

pub use cursor::Cursor;
pub use lexer::Lexer;
pub use token::{SpannedToken, Token};
