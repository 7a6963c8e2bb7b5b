//! Core lexer implementation.
//!
//! The lexer turns AWK source text into a stream of spanned tokens. Two
//! things distinguish it from an off-the-shelf scanner:
//!
//! - **Regex-vs-division disambiguation.** A `/` can open a regex
//!   literal or be the division operator depending on what came before.
//!   The lexer carries a single `expect_regex` flag, updated on every
//!   token emission from [`Token::expects_regex_after`].
//! - **Significant newlines.** AWK statements terminate at newlines, so
//!   `\n` is a token. Line continuations (`\` before a newline) and
//!   `#` comments are handled during whitespace skipping.
//!
//! Lookahead is a single token; peeking materializes the token through
//! the same emission path, so the `expect_regex` flag is always updated
//! exactly once per token regardless of how it is first observed.

mod ident;
mod number;
mod operator;
mod string;

use fawk_util::{DiagnosticBuilder, Handler, Span};

use crate::cursor::Cursor;
use crate::token::{SpannedToken, Token};

/// Lexer for AWK source text.
pub struct Lexer<'a> {
    /// Character cursor for source traversal.
    pub(crate) cursor: Cursor<'a>,

    /// Diagnostic sink for lexical errors.
    handler: &'a Handler,

    /// Starting byte offset of the current token.
    pub(crate) token_start: usize,

    /// Line where the current token starts (1-based).
    token_start_line: u32,

    /// Column where the current token starts (1-based).
    token_start_column: u32,

    /// Whether a `/` at the current position begins a regex literal.
    expect_regex: bool,

    /// Single-token lookahead buffer.
    peeked: Option<SpannedToken>,

    /// Token synthesized by a multi-token construct, emitted next.
    /// Used for the path in `@include <file>`.
    pub(crate) pending: Option<Token>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source text.
    pub fn new(source: &'a str, handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
            // A program starts in operand position.
            expect_regex: true,
            peeked: None,
            pending: None,
        }
    }

    /// Returns the next token, consuming it.
    pub fn next_token(&mut self) -> SpannedToken {
        if let Some(token) = self.peeked.take() {
            return token;
        }
        self.lex_token()
    }

    /// Returns the next token without consuming it.
    ///
    /// The peeked token survives re-emission: the following
    /// `next_token` call returns exactly this token.
    pub fn peek_token(&mut self) -> &SpannedToken {
        if self.peeked.is_none() {
            let token = self.lex_token();
            self.peeked = Some(token);
        }
        self.peeked.as_ref().expect("peeked token just materialized")
    }

    /// Lexes one token from the source and updates the regex flag.
    fn lex_token(&mut self) -> SpannedToken {
        self.skip_blanks_and_comments();

        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        let token = if let Some(pending) = self.pending.take() {
            pending
        } else if self.cursor.is_at_end() {
            Token::Eof
        } else {
            self.dispatch()
        };

        // Emit point: the flag update covers both next_token and
        // peek_token because both materialize through here.
        self.expect_regex = token.expects_regex_after();

        let span = self.token_span();
        SpannedToken::new(token, span)
    }

    /// Dispatches on the current character.
    fn dispatch(&mut self) -> Token {
        match self.cursor.current_char() {
            '\n' => {
                self.cursor.advance();
                Token::Newline
            }
            '(' => {
                self.cursor.advance();
                Token::LParen
            }
            ')' => {
                self.cursor.advance();
                Token::RParen
            }
            '{' => {
                self.cursor.advance();
                Token::LBrace
            }
            '}' => {
                self.cursor.advance();
                Token::RBrace
            }
            '[' => {
                self.cursor.advance();
                Token::LBracket
            }
            ']' => {
                self.cursor.advance();
                Token::RBracket
            }
            ',' => {
                self.cursor.advance();
                Token::Comma
            }
            ';' => {
                self.cursor.advance();
                Token::Semicolon
            }
            '$' => {
                self.cursor.advance();
                Token::Dollar
            }
            '?' => {
                self.cursor.advance();
                Token::Question
            }
            ':' => {
                self.cursor.advance();
                Token::Colon
            }
            '~' => {
                self.cursor.advance();
                Token::Match
            }
            '"' => self.lex_string(),
            '@' => self.lex_at(),
            '+' => self.lex_plus(),
            '-' => self.lex_minus(),
            '*' => self.lex_star(),
            '/' => self.lex_slash(),
            '%' => self.lex_percent(),
            '^' => self.lex_caret(),
            '=' => self.lex_equals(),
            '!' => self.lex_bang(),
            '<' => self.lex_less(),
            '>' => self.lex_greater(),
            '&' => self.lex_ampersand(),
            '|' => self.lex_pipe(),
            c if c.is_ascii_digit() => self.lex_number(),
            '.' if self.cursor.peek_char(1).is_ascii_digit() => self.lex_number(),
            c if is_ident_start(c) => self.lex_identifier(),
            c => {
                let message = format!("unexpected character '{}'", c);
                self.report_error(&message);
                self.cursor.advance();
                Token::Error(message)
            }
        }
    }

    /// Skips spaces, tabs, carriage returns, comments, and line
    /// continuations. Newlines are NOT skipped; they are tokens.
    fn skip_blanks_and_comments(&mut self) {
        loop {
            match self.cursor.current_char() {
                ' ' | '\t' | '\r' => self.cursor.advance(),
                '#' => {
                    while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                        self.cursor.advance();
                    }
                }
                '\\' if self.cursor.peek_char(1) == '\n' => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                '\\' if self.cursor.peek_char(1) == '\r' && self.cursor.peek_char(2) == '\n' => {
                    self.cursor.advance_n(3);
                }
                _ => break,
            }
        }
    }

    /// True if a `/` here opens a regex literal.
    pub(crate) fn in_regex_position(&self) -> bool {
        self.expect_regex
    }

    /// Span of the token currently being lexed.
    fn token_span(&self) -> Span {
        Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        )
    }

    /// Reports a lexical error at the current token position.
    pub(crate) fn report_error(&mut self, message: &str) {
        let span = Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        );
        DiagnosticBuilder::error(message.to_string())
            .span(span)
            .emit(self.handler);
    }

    /// Returns the current line number (1-based).
    pub fn line(&self) -> u32 {
        self.cursor.line()
    }
}

/// True for characters that may start an identifier.
pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// True for characters that may continue an identifier.
pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
