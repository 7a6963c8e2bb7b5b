//! Edge-case tests for the parser.
//!
//! Grammar corners: dangling else, statement-terminator interplay,
//! print-redirect ambiguities, getline precedence, and recovery.

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parse_program;
    use crate::tests::{parse_err, parse_ok};
    use fawk_util::Handler;

    fn first_action(program: &Program) -> &[Stmt] {
        match &program.items[0] {
            Item::Rule(rule) => rule.action.as_deref().expect("action"),
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        let program = parse_ok("BEGIN { if (a) if (b) print 1; else print 2 }");
        match &first_action(&program)[0] {
            Stmt::If(outer) => {
                assert!(outer.else_branch.is_none());
                match outer.then_branch.as_ref() {
                    Stmt::If(inner) => assert!(inner.else_branch.is_some()),
                    other => panic!("expected nested if, got {:?}", other),
                }
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_else_if_chain() {
        parse_ok("BEGIN { if (a) print 1; else if (b) print 2; else print 3 }");
    }

    #[test]
    fn test_newline_after_logical_operators() {
        parse_ok("BEGIN { if (a &&\n b ||\n c) print }");
    }

    #[test]
    fn test_newline_after_comma_in_list() {
        parse_ok("BEGIN { printf \"%s %s\\n\",\n \"a\",\n \"b\" }");
    }

    #[test]
    fn test_semicolon_soup() {
        let program = parse_ok("BEGIN { ;; a = 1 ;; ; b = 2 ; }");
        assert_eq!(first_action(&program).len(), 2);
    }

    #[test]
    fn test_null_loop_bodies() {
        parse_ok("BEGIN { for (i=0; i<10; i++) ; }");
        parse_ok("BEGIN { while (getline > 0) ; }");
    }

    #[test]
    fn test_one_line_do_while() {
        parse_ok("BEGIN { do x++; while (x < 3) }");
    }

    #[test]
    fn test_rules_without_newlines_between() {
        let program = parse_ok("/a/ { print 1 } /b/ { print 2 }");
        assert_eq!(program.rules().count(), 2);
    }

    #[test]
    fn test_pattern_only_then_action_only() {
        let program = parse_ok("/a/\n{ print }");
        let rules: Vec<_> = program.rules().collect();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].action.is_none());
        assert!(matches!(rules[1].pattern, Pattern::Always));
    }

    #[test]
    fn test_field_of_expression() {
        // $(NF-1) takes the parenthesized expression as the index.
        let program = parse_ok("{ print $(NF-1) }");
        match &first_action(&program)[0] {
            Stmt::Print(p) => match &p.args[0] {
                Expr::Field(index) => {
                    assert!(matches!(index.as_ref(), Expr::Binary(BinOp::Sub, _, _)))
                }
                other => panic!("expected field, got {:?}", other),
            },
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_double_negation() {
        let program = parse_ok("BEGIN { x = !!y }");
        match &first_action(&program)[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => match value.as_ref() {
                Expr::Unary(UnOp::Not, inner) => {
                    assert!(matches!(inner.as_ref(), Expr::Unary(UnOp::Not, _)))
                }
                other => panic!("expected !!, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_not_of_regex_match() {
        // `! /re/` negates a match against $0.
        let program = parse_ok("! /skip/ { print }");
        let rule = program.rules().next().unwrap();
        match &rule.pattern {
            Pattern::Expr(Expr::Unary(UnOp::Not, inner)) => {
                assert!(matches!(inner.as_ref(), Expr::Regex(_)))
            }
            other => panic!("expected negated regex, got {:?}", other),
        }
    }

    #[test]
    fn test_match_in_ternary() {
        parse_ok("BEGIN { print x ~ /re/ ? \"y\" : \"n\" }");
    }

    #[test]
    fn test_print_single_parenthesized_arg_then_redirect() {
        let program = parse_ok("BEGIN { print (a) > \"f\" }");
        match &first_action(&program)[0] {
            Stmt::Print(p) => {
                assert_eq!(p.args.len(), 1);
                assert!(p.redirect.is_some());
            }
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_print_append_and_coprocess_redirects() {
        let program = parse_ok("BEGIN { print 1 >> \"log\"; print 2 |& \"rev\" }");
        let action = first_action(&program);
        assert!(matches!(
            &action[0],
            Stmt::Print(p) if p.redirect.as_ref().unwrap().kind == RedirectKind::Append
        ));
        assert!(matches!(
            &action[1],
            Stmt::Print(p) if p.redirect.as_ref().unwrap().kind == RedirectKind::Coprocess
        ));
    }

    #[test]
    fn test_print_concat_redirect_target() {
        let program = parse_ok("BEGIN { print x > \"out\" \".txt\" }");
        match &first_action(&program)[0] {
            Stmt::Print(p) => {
                let redirect = p.redirect.as_ref().unwrap();
                assert!(matches!(&redirect.target, Expr::Concat(parts) if parts.len() == 2));
            }
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_getline_file_target_concatenates() {
        let program = parse_ok("BEGIN { getline line < dir \"/data\" }");
        match &first_action(&program)[0] {
            Stmt::Expr(Expr::Getline(g)) => match &g.source {
                GetlineSource::File(file) => {
                    assert!(matches!(file.as_ref(), Expr::Concat(_)))
                }
                other => panic!("expected file source, got {:?}", other),
            },
            other => panic!("expected getline, got {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_getline_comparison() {
        parse_ok("BEGIN { while ((getline line < \"f\") > 0) n++ }");
        parse_ok("BEGIN { while ((\"cmd\" | getline line) > 0) n++ }");
    }

    #[test]
    fn test_ternary_is_right_associative() {
        let program = parse_ok("BEGIN { x = a ? 1 : b ? 2 : 3 }");
        match &first_action(&program)[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => match value.as_ref() {
                Expr::Ternary(_, _, else_arm) => {
                    assert!(matches!(else_arm.as_ref(), Expr::Ternary(_, _, _)))
                }
                other => panic!("expected ternary, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_compound_assignment_operators() {
        for op in ["+=", "-=", "*=", "/=", "%=", "^="] {
            parse_ok(&format!("BEGIN {{ x {} 2 }}", op));
        }
    }

    #[test]
    fn test_in_chains() {
        // `(k in a) in b` - the result of one membership test feeds
        // the next.
        let program = parse_ok("BEGIN { x = (k in a) in b }");
        match &first_action(&program)[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => {
                assert!(matches!(value.as_ref(), Expr::In { array, .. } if array == "b"));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_concat_of_calls_and_fields() {
        parse_ok("{ print substr($1, 1, 3) \"-\" substr($2, 2) $3 }");
    }

    #[test]
    fn test_unary_in_concat() {
        // `x " " !y` concatenates with a negation.
        let program = parse_ok("BEGIN { s = x \" \" !y }");
        match &first_action(&program)[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => {
                assert!(matches!(value.as_ref(), Expr::Concat(parts) if parts.len() == 3));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_case_label() {
        let program = parse_ok("BEGIN { switch (x) { case -1: print; break } }");
        match &first_action(&program)[0] {
            Stmt::Switch(s) => {
                assert!(matches!(s.cases[0].label, CaseLabel::Num(n) if n == -1.0))
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_exit_with_expression() {
        let program = parse_ok("BEGIN { exit 2 * 3 }");
        assert!(matches!(&first_action(&program)[0], Stmt::Exit(Some(_))));
    }

    #[test]
    fn test_delete_inside_for_in() {
        parse_ok("BEGIN { for (k in a) delete a[k] }");
    }

    #[test]
    fn test_nested_array_index_is_error() {
        parse_err("BEGIN { x = a[1][2] }");
    }

    #[test]
    fn test_unclosed_brace_is_error() {
        parse_err("BEGIN { if (x) { print }");
    }

    #[test]
    fn test_unclosed_paren_is_error() {
        parse_err("BEGIN { x = (1 + 2 }");
    }

    #[test]
    fn test_stray_rbrace_is_error() {
        parse_err("} BEGIN { print }");
    }

    #[test]
    fn test_recovery_yields_multiple_diagnostics() {
        let handler = Handler::new();
        parse_program(
            "BEGIN { x = ; y = @ ; z = 1 }\nEND { w = }",
            None,
            &handler,
        );
        assert!(handler.error_count() >= 2);
    }

    #[test]
    fn test_function_with_array_and_extra_params() {
        let program = parse_ok(
            "function walk(tree, depth,    k, n) { for (k in tree) n++; return n }",
        );
        let function = program.functions().next().unwrap();
        assert_eq!(function.params, vec!["tree", "depth", "k", "n"]);
    }

    #[test]
    fn test_call_argument_full_expressions() {
        parse_ok("BEGIN { f(a > b, c ? 1 : 2, g(h(3))) }\nfunction f(x,y,z){}\nfunction g(x){}\nfunction h(x){}");
    }

    #[test]
    fn test_regex_as_call_argument() {
        let program = parse_ok("BEGIN { n = split(s, a, /,[ ]*/) }");
        match &first_action(&program)[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => match value.as_ref() {
                Expr::Call { name, args } => {
                    assert_eq!(name, "split");
                    assert!(matches!(args[2], Expr::Regex(_)));
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_concatenated_number_strings() {
        let program = parse_ok("BEGIN { s = 1 \" \" 2 }");
        match &first_action(&program)[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => {
                assert!(matches!(value.as_ref(), Expr::Concat(parts) if parts.len() == 3));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_begin_newline_brace() {
        parse_ok("BEGIN\n{ print 1 }");
        parse_ok("END\n{\n print 2\n}");
    }

    #[test]
    fn test_empty_action() {
        let program = parse_ok("/x/ { }");
        let action = program.rules().next().unwrap().action.as_ref().unwrap();
        assert!(action.is_empty());
    }
}
