//! Edge-case tests for the lexer.
//!
//! These exercise the corners that bit real programs: the
//! regex-vs-division flag across peeks, pathological string escapes,
//! comment/continuation interplay, and token boundaries.

#[cfg(test)]
mod tests {
    use crate::{Lexer, Token};
    use fawk_util::Handler;

    fn lex(source: &str) -> Vec<Token> {
        let handler = Handler::new();
        let mut lexer = Lexer::new(source, &handler);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token().token;
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    fn lex_errors(source: &str) -> usize {
        let handler = Handler::new();
        let mut lexer = Lexer::new(source, &handler);
        while lexer.next_token().token != Token::Eof {}
        handler.error_count()
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert!(lex("").is_empty());
        assert!(lex("   \t  ").is_empty());
        assert_eq!(lex("\n"), vec![Token::Newline]);
    }

    #[test]
    fn test_comment_only_line() {
        assert_eq!(lex("# just a comment"), vec![]);
        assert_eq!(lex("# comment\n"), vec![Token::Newline]);
    }

    #[test]
    fn test_comment_never_hides_newline() {
        // The newline after a comment still terminates the statement.
        assert_eq!(
            lex("x # note\ny"),
            vec![
                Token::Ident("x".into()),
                Token::Newline,
                Token::Ident("y".into()),
            ]
        );
    }

    #[test]
    fn test_continuation_then_comment() {
        // A continuation joins lines; the comment on the next line is
        // still skipped.
        assert_eq!(
            lex("a \\\n# comment\nb"),
            vec![
                Token::Ident("a".into()),
                Token::Newline,
                Token::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn test_crlf_continuation() {
        assert_eq!(
            lex("a \\\r\nb"),
            vec![Token::Ident("a".into()), Token::Ident("b".into())]
        );
    }

    #[test]
    fn test_regex_flag_through_many_tokens() {
        // Each `/` here must be a regex, never division.
        let tokens = lex("!/a/ && /b/ || /c/ ? /d/ : /e/");
        let regexes = tokens
            .iter()
            .filter(|t| matches!(t, Token::Regex(_)))
            .count();
        assert_eq!(regexes, 5);
    }

    #[test]
    fn test_division_chain() {
        let tokens = lex("a / b / c");
        let slashes = tokens.iter().filter(|t| **t == Token::Slash).count();
        assert_eq!(slashes, 2);
    }

    #[test]
    fn test_regex_after_semicolon_and_brace() {
        assert!(matches!(lex("; /x/")[1], Token::Regex(_)));
        assert!(matches!(lex("{ /x/")[1], Token::Regex(_)));
    }

    #[test]
    fn test_division_after_field() {
        // `$1 / 2` is division: the flag clears after the operand.
        let tokens = lex("$1 / 2");
        assert_eq!(
            tokens,
            vec![
                Token::Dollar,
                Token::Number(1.0),
                Token::Slash,
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_regex_with_escapes_and_classes() {
        assert_eq!(lex(r"$0 ~ /\\d+/")[3..], [Token::Regex(r"\\d+".into())]);
        assert_eq!(
            lex("$0 ~ /[a-z]+[[:digit:]]*/")[3..],
            [Token::Regex("[a-z]+[[:digit:]]*".into())]
        );
        // `^` negation right after the bracket, then a literal `]`.
        assert_eq!(lex("$0 ~ /[^]]/")[3..], [Token::Regex("[^]]".into())]);
    }

    #[test]
    fn test_unterminated_regex_is_one_error() {
        assert_eq!(lex_errors("$0 ~ /abc"), 1);
    }

    #[test]
    fn test_string_with_embedded_hash() {
        // `#` inside a string is not a comment.
        assert_eq!(lex("\"a#b\""), vec![Token::Str("a#b".into())]);
    }

    #[test]
    fn test_string_octal_escape_boundaries() {
        assert_eq!(lex(r#""\1""#), vec![Token::Str("\u{1}".into())]);
        assert_eq!(lex(r#""\12""#), vec![Token::Str("\n".into())]);
        // Three digits maximum; the fourth is literal.
        assert_eq!(lex(r#""\1234""#), vec![Token::Str("S4".into())]);
    }

    #[test]
    fn test_adjacent_strings_are_two_tokens() {
        assert_eq!(
            lex("\"a\"\"b\""),
            vec![Token::Str("a".into()), Token::Str("b".into())]
        );
    }

    #[test]
    fn test_number_dot_ambiguity() {
        // `1.2.3` lexes as 1.2 then .3 (two numbers).
        assert_eq!(
            lex("1.2.3"),
            vec![Token::Number(1.2), Token::Number(0.3)]
        );
    }

    #[test]
    fn test_exponent_sign_boundaries() {
        assert_eq!(lex("1e+2"), vec![Token::Number(100.0)]);
        assert_eq!(lex("1e-2"), vec![Token::Number(0.01)]);
        // `1e+` is the number 1 followed by `e` and `+`.
        assert_eq!(
            lex("1e+"),
            vec![Token::Number(1.0), Token::Ident("e".into()), Token::Plus]
        );
    }

    #[test]
    fn test_hex_needs_a_digit() {
        // `0x` with no digits is `0` then the identifier `x`.
        assert_eq!(
            lex("0x"),
            vec![Token::Number(0.0), Token::Ident("x".into())]
        );
        assert_eq!(lex("0xg"), vec![Token::Number(0.0), Token::Ident("xg".into())]);
    }

    #[test]
    fn test_operator_maximal_munch() {
        assert_eq!(lex("a<=b"), lex("a <= b"));
        assert_eq!(lex("a==b"), lex("a == b"));
        // `a=-1` is assignment of -1, not a `=-` operator.
        assert_eq!(
            lex("a=-1"),
            vec![
                Token::Ident("a".into()),
                Token::Assign,
                Token::Minus,
                Token::Number(1.0),
            ]
        );
    }

    #[test]
    fn test_incr_vs_plus_plus_plus() {
        // `a+++b` munches as `a ++ + b`.
        assert_eq!(
            lex("a+++b"),
            vec![
                Token::Ident("a".into()),
                Token::Incr,
                Token::Plus,
                Token::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn test_pipe_family() {
        assert_eq!(lex("| || |&").len(), 3);
        assert_eq!(
            lex("| || |&"),
            vec![Token::Pipe, Token::Or, Token::TwoWayPipe]
        );
    }

    #[test]
    fn test_lone_ampersand_is_error() {
        assert_eq!(lex_errors("a & b"), 1);
    }

    #[test]
    fn test_keyword_prefix_identifiers() {
        // Identifiers that merely start with a keyword stay
        // identifiers.
        assert_eq!(lex("iff"), vec![Token::Ident("iff".into())]);
        assert_eq!(lex("printer"), vec![Token::Ident("printer".into())]);
        assert_eq!(lex("nextfiles"), vec![Token::Ident("nextfiles".into())]);
    }

    #[test]
    fn test_underscore_identifiers() {
        assert_eq!(lex("_ __x _1"),
            vec![
                Token::Ident("_".into()),
                Token::Ident("__x".into()),
                Token::Ident("_1".into()),
            ]
        );
    }

    #[test]
    fn test_at_include_angle_form() {
        assert_eq!(
            lex("@include <lib/util.awk>"),
            vec![Token::AtInclude, Token::Str("lib/util.awk".into())]
        );
    }

    #[test]
    fn test_at_unterminated_angle_include() {
        assert_eq!(lex_errors("@include <never"), 1);
    }

    #[test]
    fn test_double_colon_without_ident_is_ternary_colons() {
        // `a ::b` cannot qualify (space); the colons stay separate.
        let tokens = lex("a ? b : c ? d : e");
        let colons = tokens.iter().filter(|t| **t == Token::Colon).count();
        assert_eq!(colons, 2);
    }

    #[test]
    fn test_getline_is_keyword_everywhere() {
        assert_eq!(
            lex("getline x"),
            vec![Token::Getline, Token::Ident("x".into())]
        );
    }

    #[test]
    fn test_error_token_resumes_lexing() {
        let handler = Handler::new();
        let mut lexer = Lexer::new("a ` b", &handler);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token().token;
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        // The bad character yields one error token and the rest of
        // the stream survives.
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2], Token::Ident("b".into()));
    }

    mod properties {
        use crate::{Lexer, Token};
        use fawk_util::Handler;
        use proptest::prelude::*;

        proptest! {
            /// The lexer terminates on arbitrary input and every
            /// token's span stays inside the source.
            #[test]
            fn lexer_always_terminates(source in "\\PC{0,64}") {
                let handler = Handler::new();
                let mut lexer = Lexer::new(&source, &handler);
                for _ in 0..source.len() + 8 {
                    let spanned = lexer.next_token();
                    prop_assert!(spanned.span.start <= spanned.span.end);
                    prop_assert!(spanned.span.end <= source.len());
                    if spanned.token == Token::Eof {
                        return Ok(());
                    }
                }
                prop_assert!(false, "lexer failed to reach EOF");
            }

            /// Peeking never changes the token stream.
            #[test]
            fn peek_is_transparent(source in "[ -~]{0,48}") {
                let handler = Handler::new();
                let mut plain = Lexer::new(&source, &handler);
                let mut peeky = Lexer::new(&source, &handler);
                loop {
                    let expected = plain.next_token().token;
                    let peeked = peeky.peek_token().token.clone();
                    let consumed = peeky.next_token().token;
                    prop_assert_eq!(&peeked, &consumed);
                    prop_assert_eq!(&consumed, &expected);
                    if expected == Token::Eof {
                        break;
                    }
                }
            }
        }
    }
}
