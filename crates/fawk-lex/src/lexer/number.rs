//! Numeric literal lexing.
//!
//! Accepted forms: decimal integers, `0x` hex, leading-`0` octal (only
//! when every digit is octal), and decimal floats with optional
//! exponent (`1.5e-3`, `.5`, `3.`).

use crate::token::Token;

use super::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a number literal. The current character is a digit or a
    /// `.` followed by a digit.
    pub(crate) fn lex_number(&mut self) -> Token {
        let start = self.cursor.position();

        if self.cursor.current_char() == '0'
            && matches!(self.cursor.peek_char(1), 'x' | 'X')
            && self.cursor.peek_char(2).is_ascii_hexdigit()
        {
            return self.lex_hex_number();
        }

        let mut saw_dot = false;
        let mut saw_exp = false;

        if self.cursor.current_char() == '.' {
            saw_dot = true;
            self.cursor.advance();
        }

        while !self.cursor.is_at_end() {
            match self.cursor.current_char() {
                c if c.is_ascii_digit() => self.cursor.advance(),
                '.' if !saw_dot && !saw_exp => {
                    saw_dot = true;
                    self.cursor.advance();
                }
                'e' | 'E' if !saw_exp && exponent_follows(self) => {
                    saw_exp = true;
                    self.cursor.advance();
                    if matches!(self.cursor.current_char(), '+' | '-') {
                        self.cursor.advance();
                    }
                }
                _ => break,
            }
        }

        let text = self.cursor.slice_from(start);

        // A leading zero makes an all-octal-digit integer octal.
        if !saw_dot && !saw_exp && text.len() > 1 && text.starts_with('0') {
            if text[1..].bytes().all(|b| (b'0'..=b'7').contains(&b)) {
                let mut value = 0.0f64;
                for b in text[1..].bytes() {
                    value = value * 8.0 + f64::from(b - b'0');
                }
                return Token::Number(value);
            }
        }

        match text.parse::<f64>() {
            Ok(value) => Token::Number(value),
            Err(_) => {
                let message = format!("invalid number literal `{}`", text);
                self.report_error(&message);
                Token::Error(message)
            }
        }
    }

    /// Lexes `0x…`; the cursor is on the `0`.
    fn lex_hex_number(&mut self) -> Token {
        self.cursor.advance(); // 0
        self.cursor.advance(); // x
        let mut value = 0.0f64;
        while self.cursor.current_char().is_ascii_hexdigit() {
            let digit = self.cursor.current_char().to_digit(16).unwrap_or(0);
            value = value * 16.0 + f64::from(digit);
            self.cursor.advance();
        }
        Token::Number(value)
    }
}

/// True if the `e`/`E` at the cursor is followed by a valid exponent,
/// so `1e5` lexes as one number but `1egg` lexes as `1` then `egg`.
fn exponent_follows(lexer: &Lexer<'_>) -> bool {
    let next = lexer.cursor.peek_char(1);
    if next.is_ascii_digit() {
        return true;
    }
    matches!(next, '+' | '-') && lexer.cursor.peek_char(2).is_ascii_digit()
}
