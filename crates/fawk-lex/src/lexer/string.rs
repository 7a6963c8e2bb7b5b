//! String and regex literal lexing.

use crate::token::Token;

use super::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a double-quoted string. The cursor is on the opening `"`.
    ///
    /// Escapes: `\n \t \r \b \f \a \v \\ \" \/` plus octal `\ddd`
    /// (1-3 digits, which subsumes `\0`). An unrecognized escape yields
    /// the escaped character literally. Strings do not span lines.
    pub(crate) fn lex_string(&mut self) -> Token {
        self.cursor.advance(); // opening quote
        let mut text = String::new();

        loop {
            match self.cursor.current_char() {
                '"' => {
                    self.cursor.advance();
                    return Token::Str(text);
                }
                '\0' if self.cursor.is_at_end() => {
                    let message = "unterminated string".to_string();
                    self.report_error(&message);
                    return Token::Error(message);
                }
                '\n' => {
                    let message = "newline in string".to_string();
                    self.report_error(&message);
                    return Token::Error(message);
                }
                '\\' => {
                    self.cursor.advance();
                    let escaped = self.cursor.current_char();
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        'b' => text.push('\u{0008}'),
                        'f' => text.push('\u{000C}'),
                        'a' => text.push('\u{0007}'),
                        'v' => text.push('\u{000B}'),
                        '\\' => text.push('\\'),
                        '"' => text.push('"'),
                        '/' => text.push('/'),
                        '0'..='7' => {
                            text.push(self.lex_octal_escape());
                            continue;
                        }
                        '\0' if self.cursor.is_at_end() => {
                            let message = "unterminated string".to_string();
                            self.report_error(&message);
                            return Token::Error(message);
                        }
                        other => text.push(other),
                    }
                    self.cursor.advance();
                }
                c => {
                    text.push(c);
                    self.cursor.advance();
                }
            }
        }
    }

    /// Reads 1-3 octal digits at the cursor and returns the character.
    fn lex_octal_escape(&mut self) -> char {
        let mut value: u32 = 0;
        let mut digits = 0;
        while digits < 3 {
            let c = self.cursor.current_char();
            if !('0'..='7').contains(&c) {
                break;
            }
            value = value * 8 + (c as u32 - '0' as u32);
            self.cursor.advance();
            digits += 1;
        }
        char::from_u32(value).unwrap_or('\u{FFFD}')
    }

    /// Lexes a `/regex/` literal. The cursor is on the opening `/`,
    /// already consumed by the caller.
    ///
    /// The pattern text is kept raw for the regex compiler, except that
    /// `\/` becomes `/`. A `/` inside a bracket expression does not
    /// terminate the literal.
    pub(crate) fn lex_regex(&mut self) -> Token {
        let mut pattern = String::new();
        let mut in_bracket = false;
        // Immediately after `[` or `[^`, a `]` is a literal member.
        let mut bracket_start = false;

        loop {
            match self.cursor.current_char() {
                '/' if !in_bracket => {
                    self.cursor.advance();
                    return Token::Regex(pattern);
                }
                '\0' if self.cursor.is_at_end() => {
                    let message = "unterminated regex".to_string();
                    self.report_error(&message);
                    return Token::Error(message);
                }
                '\n' => {
                    let message = "newline in regex".to_string();
                    self.report_error(&message);
                    return Token::Error(message);
                }
                '\\' => {
                    self.cursor.advance();
                    let escaped = self.cursor.current_char();
                    if self.cursor.is_at_end() {
                        let message = "unterminated regex".to_string();
                        self.report_error(&message);
                        return Token::Error(message);
                    }
                    if escaped == '/' {
                        pattern.push('/');
                    } else {
                        pattern.push('\\');
                        pattern.push(escaped);
                    }
                    self.cursor.advance();
                    bracket_start = false;
                }
                '[' if !in_bracket => {
                    in_bracket = true;
                    bracket_start = true;
                    pattern.push('[');
                    self.cursor.advance();
                    if self.cursor.current_char() == '^' {
                        pattern.push('^');
                        self.cursor.advance();
                    }
                }
                ']' if in_bracket && !bracket_start => {
                    in_bracket = false;
                    pattern.push(']');
                    self.cursor.advance();
                }
                c => {
                    pattern.push(c);
                    self.cursor.advance();
                    bracket_start = false;
                }
            }
        }
    }
}
