//! Operator lexing.
//!
//! Two-character operators: `== != <= >= && || ++ -- += -= *= /= %= ^=
//! ** >> |&`. `**` is a synonym for `^` and `**=` for `^=`.

use crate::token::Token;

use super::Lexer;

impl<'a> Lexer<'a> {
    pub(crate) fn lex_plus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('+') {
            Token::Incr
        } else if self.cursor.match_char('=') {
            Token::AddAssign
        } else {
            Token::Plus
        }
    }

    pub(crate) fn lex_minus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('-') {
            Token::Decr
        } else if self.cursor.match_char('=') {
            Token::SubAssign
        } else {
            Token::Minus
        }
    }

    pub(crate) fn lex_star(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('*') {
            if self.cursor.match_char('=') {
                Token::PowAssign
            } else {
                Token::Caret
            }
        } else if self.cursor.match_char('=') {
            Token::MulAssign
        } else {
            Token::Star
        }
    }

    /// `/` is division, `/=`, or the start of a regex literal,
    /// depending on the token that preceded it.
    pub(crate) fn lex_slash(&mut self) -> Token {
        self.cursor.advance();
        if self.in_regex_position() {
            return self.lex_regex();
        }
        if self.cursor.match_char('=') {
            Token::DivAssign
        } else {
            Token::Slash
        }
    }

    pub(crate) fn lex_percent(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::ModAssign
        } else {
            Token::Percent
        }
    }

    pub(crate) fn lex_caret(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::PowAssign
        } else {
            Token::Caret
        }
    }

    pub(crate) fn lex_equals(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::Eq
        } else {
            Token::Assign
        }
    }

    pub(crate) fn lex_bang(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::Ne
        } else if self.cursor.match_char('~') {
            Token::NotMatch
        } else {
            Token::Not
        }
    }

    pub(crate) fn lex_less(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::Le
        } else {
            Token::Lt
        }
    }

    pub(crate) fn lex_greater(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('>') {
            Token::Append
        } else if self.cursor.match_char('=') {
            Token::Ge
        } else {
            Token::Gt
        }
    }

    pub(crate) fn lex_ampersand(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('&') {
            Token::And
        } else {
            let message = "unexpected character '&'".to_string();
            self.report_error(&message);
            Token::Error(message)
        }
    }

    pub(crate) fn lex_pipe(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('|') {
            Token::Or
        } else if self.cursor.match_char('&') {
            Token::TwoWayPipe
        } else {
            Token::Pipe
        }
    }
}
