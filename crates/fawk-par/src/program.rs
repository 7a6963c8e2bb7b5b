//! Top-level program parsing: rules, function definitions, and the
//! `@include` / `@namespace` directives.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use fawk_lex::Token;

use crate::ast::*;
use crate::{is_builtin, parse_into, Parser};

impl<'a> Parser<'a> {
    /// Parses every item in this source unit into `program`.
    pub(crate) fn run(&mut self, included: &mut HashSet<PathBuf>, program: &mut Program) {
        loop {
            self.skip_terminators();
            if self.at_end() {
                break;
            }
            match self.current() {
                Token::AtInclude => self.parse_include(included, program),
                Token::AtNamespace => self.parse_namespace(),
                Token::Function => {
                    let function = self.parse_function();
                    program.items.push(Item::Function(function));
                }
                _ => {
                    let rule = self.parse_rule();
                    program.items.push(Item::Rule(rule));
                }
            }
        }
    }

    /// `function name(param, ...) { body }`.
    fn parse_function(&mut self) -> Function {
        let span = self.current_span();
        self.advance(); // function

        let name = match self.current().clone() {
            Token::FuncName(name) | Token::Ident(name) => {
                self.advance();
                if is_builtin(&name) {
                    self.error(format!("cannot redefine built-in function `{}`", name));
                }
                self.qualify_func(&name)
            }
            other => {
                self.error(format!("expected function name, found {}", other));
                self.recover_to_sync();
                String::new()
            }
        };

        self.expect(&Token::LParen);
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                match self.current().clone() {
                    Token::Ident(param) => {
                        self.advance();
                        params.push(param);
                    }
                    other => {
                        self.error(format!("expected parameter name, found {}", other));
                        break;
                    }
                }
                if !self.match_token(&Token::Comma) {
                    break;
                }
                self.skip_newlines();
            }
        }
        self.expect(&Token::RParen);
        self.skip_newlines();

        // Parameters are locals: they bypass namespace qualification
        // while the body parses.
        self.func_params = params.clone();
        self.in_function = true;
        let body = self.parse_block();
        self.func_params.clear();
        self.in_function = false;

        Function {
            name,
            params,
            body,
            span,
        }
    }

    /// One pattern/action rule.
    fn parse_rule(&mut self) -> Rule {
        let span = self.current_span();

        let pattern = match self.current() {
            Token::Begin => {
                self.advance();
                Pattern::Begin
            }
            Token::End => {
                self.advance();
                Pattern::End
            }
            Token::BeginFile => {
                self.advance();
                Pattern::BeginFile
            }
            Token::EndFile => {
                self.advance();
                Pattern::EndFile
            }
            Token::LBrace => Pattern::Always,
            _ => {
                let start = self.parse_expr();
                if self.match_token(&Token::Comma) {
                    self.skip_newlines();
                    let stop = self.parse_expr();
                    Pattern::Range(start, stop)
                } else {
                    Pattern::Expr(start)
                }
            }
        };

        let special = matches!(
            pattern,
            Pattern::Begin | Pattern::End | Pattern::BeginFile | Pattern::EndFile
        );
        if special {
            self.skip_newlines();
        }

        // For expression patterns the brace must follow on the same
        // line; a newline ends the rule and the default action prints
        // the record.
        let action = if self.check(&Token::LBrace) {
            Some(self.parse_block())
        } else {
            if special {
                self.error("special pattern requires an action");
            }
            None
        };

        Rule {
            pattern,
            action,
            span,
        }
    }

    /// `@include "file"` / `@include <file>`: parse the named file in
    /// place, appending its items. Cycles are silently suppressed via
    /// the per-parse set of normalized paths.
    fn parse_include(&mut self, included: &mut HashSet<PathBuf>, program: &mut Program) {
        self.advance(); // @include

        let raw = match self.current().clone() {
            Token::Str(path) => {
                self.advance();
                path
            }
            other => {
                self.error(format!("expected file name after @include, found {}", other));
                self.recover_to_sync();
                return;
            }
        };

        let resolved = self.resolve_include(&raw);
        let normalized = resolved.canonicalize().unwrap_or_else(|_| resolved.clone());
        if !included.insert(normalized) {
            return;
        }

        match std::fs::read_to_string(&resolved) {
            Ok(text) => {
                parse_into(&text, Some(&resolved), self.handler(), included, program);
            }
            Err(err) => {
                self.error(format!(
                    "can't open included file `{}`: {}",
                    resolved.display(),
                    err
                ));
            }
        }
    }

    /// Resolves an include path: absolute paths pass through, relative
    /// paths resolve against the including file's directory when it
    /// has one.
    fn resolve_include(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.include_dir() {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    /// `@namespace "name"`.
    fn parse_namespace(&mut self) {
        self.advance(); // @namespace

        match self.current().clone() {
            Token::Str(name) => {
                self.advance();
                let valid = !name.is_empty()
                    && name
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
                    && !name.starts_with(|c: char| c.is_ascii_digit());
                if valid {
                    self.set_namespace(name);
                } else {
                    self.error(format!("invalid namespace name `{}`", name));
                }
            }
            other => {
                self.error(format!("expected namespace name, found {}", other));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::tests::{parse_err, parse_ok};
    use crate::parse_program;
    use fawk_util::Handler;

    /// Extracts the single rule's action statements.
    fn action_of(program: &Program) -> &[Stmt] {
        match &program.items[0] {
            Item::Rule(rule) => rule.action.as_deref().expect("rule has an action"),
            other => panic!("expected rule, got {:?}", other),
        }
    }

    /// Parses `BEGIN { <stmt> }` and returns the statement.
    fn parse_stmt(source: &str) -> Stmt {
        let program = parse_ok(&format!("BEGIN {{ {} }}", source));
        action_of(&program)[0].clone()
    }

    /// Parses `BEGIN { __e = <expr> }` and returns the expression.
    fn parse_expr_src(source: &str) -> Expr {
        match parse_stmt(&format!("__e = {}", source)) {
            Stmt::Expr(Expr::Assign { value, .. }) => *value,
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_hello_world() {
        let program = parse_ok("BEGIN { print \"Hello, World!\" }");
        assert_eq!(program.items.len(), 1);
        match &program.items[0] {
            Item::Rule(rule) => {
                assert!(matches!(rule.pattern, Pattern::Begin));
                let action = rule.action.as_ref().unwrap();
                assert!(matches!(&action[0], Stmt::Print(p) if p.args.len() == 1));
            }
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[test]
    fn test_pattern_kinds() {
        let program = parse_ok("/re/\nNR > 1 { print }\n/a/, /b/ { print }\nEND { print }");
        let rules: Vec<_> = program.rules().collect();
        assert!(matches!(rules[0].pattern, Pattern::Expr(Expr::Regex(_))));
        assert!(rules[0].action.is_none());
        assert!(matches!(rules[1].pattern, Pattern::Expr(Expr::Binary(BinOp::Gt, _, _))));
        assert!(matches!(rules[2].pattern, Pattern::Range(_, _)));
        assert!(matches!(rules[3].pattern, Pattern::End));
    }

    #[test]
    fn test_special_pattern_requires_action() {
        parse_err("BEGIN");
    }

    #[test]
    fn test_function_definition() {
        let program = parse_ok("function add(a, b) { return a + b }");
        let function = program.functions().next().unwrap();
        assert_eq!(function.name, "add");
        assert_eq!(function.params, vec!["a", "b"]);
        assert!(matches!(&function.body[0], Stmt::Return(Some(_))));
    }

    #[test]
    fn test_cannot_redefine_builtin() {
        parse_err("function length(x) { return 1 }");
    }

    #[test]
    fn test_return_outside_function() {
        parse_err("BEGIN { return 1 }");
    }

    #[test]
    fn test_concat_binds_tighter_than_comparison() {
        // a b == c  parses as  (a b) == c
        let expr = parse_expr_src("a b == c");
        match expr {
            Expr::Binary(BinOp::Eq, left, _) => {
                assert!(matches!(*left, Expr::Concat(ref parts) if parts.len() == 2));
            }
            other => panic!("expected comparison of concat, got {:?}", other),
        }
    }

    #[test]
    fn test_concat_looser_than_additive() {
        // a " " - x  parses as  a ((" ") - x)
        let expr = parse_expr_src("a \" \" - x");
        match expr {
            Expr::Concat(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[1], Expr::Binary(BinOp::Sub, _, _)));
            }
            other => panic!("expected concat, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus_looser_than_power() {
        // -2^2 == -(2^2)
        let expr = parse_expr_src("-2^2");
        match expr {
            Expr::Unary(UnOp::Neg, inner) => {
                assert!(matches!(*inner, Expr::Binary(BinOp::Pow, _, _)));
            }
            other => panic!("expected negation of power, got {:?}", other),
        }
    }

    #[test]
    fn test_power_right_associative() {
        let expr = parse_expr_src("2^3^2");
        match expr {
            Expr::Binary(BinOp::Pow, _, right) => {
                assert!(matches!(*right, Expr::Binary(BinOp::Pow, _, _)));
            }
            other => panic!("expected power chain, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_right_associative() {
        let stmt = parse_stmt("a = b = 2");
        match stmt {
            Stmt::Expr(Expr::Assign { target, value, .. }) => {
                assert_eq!(target, LValue::Var("a".into()));
                assert!(matches!(*value, Expr::Assign { .. }));
            }
            other => panic!("expected nested assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_to_non_lvalue_is_error() {
        parse_err("BEGIN { 1 = 2 }");
    }

    #[test]
    fn test_ternary() {
        let expr = parse_expr_src("x ? \"y\" : \"n\"");
        assert!(matches!(expr, Expr::Ternary(_, _, _)));
    }

    #[test]
    fn test_field_postfix_increment() {
        // $i++ increments the field, not i.
        let stmt = parse_stmt("$i++");
        match stmt {
            Stmt::Expr(Expr::IncrDecr {
                postfix: true,
                target: LValue::Field(operand),
                ..
            }) => assert!(matches!(*operand, Expr::Var(_))),
            other => panic!("expected postfix field increment, got {:?}", other),
        }
    }

    #[test]
    fn test_field_of_preincrement() {
        // $++i is the field numbered by ++i.
        let stmt = parse_stmt("x = $++i");
        match stmt {
            Stmt::Expr(Expr::Assign { value, .. }) => match *value {
                Expr::Field(operand) => {
                    assert!(matches!(*operand, Expr::IncrDecr { postfix: false, .. }))
                }
                other => panic!("expected field, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_field() {
        let expr = parse_expr_src("$$1");
        match expr {
            Expr::Field(inner) => assert!(matches!(*inner, Expr::Field(_))),
            other => panic!("expected nested field, got {:?}", other),
        }
    }

    #[test]
    fn test_print_redirect_file() {
        let stmt = parse_stmt("print a, b > \"out\"");
        match stmt {
            Stmt::Print(print) => {
                assert_eq!(print.args.len(), 2);
                let redirect = print.redirect.unwrap();
                assert_eq!(redirect.kind, RedirectKind::File);
                assert_eq!(redirect.target, Expr::Str("out".into()));
            }
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_print_parenthesized_comparison() {
        // Parentheses restore `>` as an operator.
        let stmt = parse_stmt("print (a > b)");
        match stmt {
            Stmt::Print(print) => {
                assert!(print.redirect.is_none());
                assert!(matches!(print.args[0], Expr::Binary(BinOp::Gt, _, _)));
            }
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_print_empty_prints_record() {
        let stmt = parse_stmt("print");
        match stmt {
            Stmt::Print(print) => {
                assert!(print.args.is_empty());
                assert!(print.redirect.is_none());
            }
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_print_pipe() {
        let stmt = parse_stmt("print $0 | \"sort\"");
        match stmt {
            Stmt::Print(print) => {
                assert_eq!(print.redirect.unwrap().kind, RedirectKind::Pipe);
            }
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_printf_call_style() {
        // printf("%s\n", x): the parenthesized list is the argument
        // list, not a grouping.
        let stmt = parse_stmt("printf(\"%s\\n\", x)");
        match stmt {
            Stmt::Printf(print) => {
                assert_eq!(print.args.len(), 2);
                assert_eq!(print.args[0], Expr::Str("%s\n".into()));
            }
            other => panic!("expected printf, got {:?}", other),
        }
    }

    #[test]
    fn test_printf_requires_args() {
        parse_err("BEGIN { printf }");
    }

    #[test]
    fn test_getline_forms() {
        assert!(matches!(
            parse_expr_src("getline"),
            Expr::Getline(GetlineExpr {
                target: None,
                source: GetlineSource::Main,
            })
        ));

        match parse_expr_src("getline line < \"f\"") {
            Expr::Getline(GetlineExpr {
                target: Some(LValue::Var(name)),
                source: GetlineSource::File(_),
            }) => assert_eq!(name, "line"),
            other => panic!("expected getline-from-file, got {:?}", other),
        }

        match parse_expr_src("\"date\" | getline now") {
            Expr::Getline(GetlineExpr {
                target: Some(LValue::Var(name)),
                source: GetlineSource::Command(cmd),
            }) => {
                assert_eq!(name, "now");
                assert_eq!(*cmd, Expr::Str("date".into()));
            }
            other => panic!("expected pipe getline, got {:?}", other),
        }

        assert!(matches!(
            parse_expr_src("\"bc\" |& getline out"),
            Expr::Getline(GetlineExpr {
                source: GetlineSource::Coprocess(_),
                ..
            })
        ));
    }

    #[test]
    fn test_in_expression() {
        match parse_expr_src("k in seen") {
            Expr::In { keys, array } => {
                assert_eq!(keys.len(), 1);
                assert_eq!(array, "seen");
            }
            other => panic!("expected in, got {:?}", other),
        }

        match parse_expr_src("(i, j) in grid") {
            Expr::In { keys, array } => {
                assert_eq!(keys.len(), 2);
                assert_eq!(array, "grid");
            }
            other => panic!("expected multi-key in, got {:?}", other),
        }
    }

    #[test]
    fn test_for_loops() {
        let stmt = parse_stmt("for (i = 1; i <= NF; i++) sum += $i");
        match stmt {
            Stmt::For(f) => {
                assert!(f.init.is_some());
                assert!(f.cond.is_some());
                assert!(f.update.is_some());
            }
            other => panic!("expected for, got {:?}", other),
        }

        let stmt = parse_stmt("for (;;) break");
        match stmt {
            Stmt::For(f) => {
                assert!(f.init.is_none());
                assert!(f.cond.is_none());
                assert!(f.update.is_none());
            }
            other => panic!("expected for, got {:?}", other),
        }

        let stmt = parse_stmt("for (k in seen) print k");
        match stmt {
            Stmt::ForIn(f) => {
                assert_eq!(f.var, "k");
                assert_eq!(f.array, "seen");
            }
            other => panic!("expected for-in, got {:?}", other),
        }
    }

    #[test]
    fn test_do_while() {
        let stmt = parse_stmt("do print; while (--n)");
        assert!(matches!(stmt, Stmt::DoWhile(_)));
    }

    #[test]
    fn test_if_else_across_newlines() {
        let program = parse_ok("BEGIN {\n  if (x)\n    print \"y\"\n  else\n    print \"n\"\n}");
        match &action_of(&program)[0] {
            Stmt::If(if_stmt) => assert!(if_stmt.else_branch.is_some()),
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_switch() {
        let stmt = parse_stmt(
            "switch (x) { case 1: print \"one\"; break; case /re/: print \"re\"; break; default: print \"other\" }",
        );
        match stmt {
            Stmt::Switch(switch) => {
                assert_eq!(switch.cases.len(), 3);
                assert!(matches!(switch.cases[0].label, CaseLabel::Num(n) if n == 1.0));
                assert!(matches!(switch.cases[1].label, CaseLabel::Regex(_)));
                assert!(matches!(switch.cases[2].label, CaseLabel::Default));
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_delete() {
        match parse_stmt("delete seen[k, 2]") {
            Stmt::Delete(del) => {
                assert_eq!(del.array, "seen");
                assert_eq!(del.indices.len(), 2);
            }
            other => panic!("expected delete, got {:?}", other),
        }

        match parse_stmt("delete seen") {
            Stmt::Delete(del) => assert!(del.indices.is_empty()),
            other => panic!("expected delete, got {:?}", other),
        }
    }

    #[test]
    fn test_indirect_call() {
        match parse_expr_src("@fn(1, 2)") {
            Expr::IndirectCall { target, args } => {
                assert_eq!(*target, Expr::Var("fn".into()));
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected indirect call, got {:?}", other),
        }
    }

    #[test]
    fn test_namespace_rewriting() {
        let program = parse_ok(
            "@namespace \"math\"\nfunction double(x) { return x * 2 }\nBEGIN { y = double(NR); print math::pi }",
        );

        let function = program.functions().next().unwrap();
        assert_eq!(function.name, "math::double");
        // Parameters stay local.
        assert_eq!(function.params, vec!["x"]);
        match &function.body[0] {
            Stmt::Return(Some(Expr::Binary(_, left, _))) => {
                assert_eq!(**left, Expr::Var("x".into()));
            }
            other => panic!("expected return, got {:?}", other),
        }

        let rule = program.rules().next().unwrap();
        let action = rule.action.as_ref().unwrap();
        match &action[0] {
            Stmt::Expr(Expr::Assign { target, value, .. }) => {
                // Unqualified variables pick up the namespace;
                // special variables do not.
                assert_eq!(*target, LValue::Var("math::y".into()));
                match value.as_ref() {
                    Expr::Call { name, args } => {
                        assert_eq!(name, "math::double");
                        assert_eq!(args[0], Expr::Var("NR".into()));
                    }
                    other => panic!("expected call, got {:?}", other),
                }
            }
            other => panic!("expected assignment, got {:?}", other),
        }
        // Explicitly qualified names pass through.
        match &action[1] {
            Stmt::Print(print) => {
                assert_eq!(print.args[0], Expr::Var("math::pi".into()));
            }
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn test_namespace_reset_to_awk() {
        let program = parse_ok("@namespace \"ns\"\n BEGIN { a = 1 }\n@namespace \"awk\"\nBEGIN { b = 2 }");
        let rules: Vec<_> = program.rules().collect();
        let first = rules[0].action.as_ref().unwrap();
        let second = rules[1].action.as_ref().unwrap();
        assert!(
            matches!(&first[0], Stmt::Expr(Expr::Assign { target, .. }) if *target == LValue::Var("ns::a".into()))
        );
        assert!(
            matches!(&second[0], Stmt::Expr(Expr::Assign { target, .. }) if *target == LValue::Var("b".into()))
        );
    }

    #[test]
    fn test_include_with_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.awk");
        let b = dir.path().join("b.awk");
        std::fs::write(&a, "@include \"b.awk\"\nBEGIN { x = 1 }\n").unwrap();
        std::fs::write(&b, "@include \"a.awk\"\nfunction fb() { return 1 }\n").unwrap();

        let handler = Handler::new();
        let source = std::fs::read_to_string(&a).unwrap();
        let program = parse_program(&source, Some(&a), &handler);

        assert!(!handler.has_errors(), "{:?}", handler.take());
        // b's function arrives once; the cyclic re-include of a is
        // silently suppressed.
        assert_eq!(program.functions().count(), 1);
        assert_eq!(program.rules().count(), 1);
    }

    #[test]
    fn test_include_missing_file() {
        let handler = Handler::new();
        parse_program("@include \"no/such/file.awk\"\n", None, &handler);
        assert!(handler.has_errors());
    }

    #[test]
    fn test_error_recovery_continues() {
        let handler = Handler::new();
        let program = parse_program("BEGIN { x = ; y = 2 }\nEND { print y }", None, &handler);
        assert!(handler.has_errors());
        // Both rules survive recovery.
        assert_eq!(program.rules().count(), 2);
    }

    #[test]
    fn test_statements_split_across_semicolons() {
        let program = parse_ok("BEGIN { a = 1; b = 2; print a b }");
        assert_eq!(action_of(&program).len(), 3);
    }

    #[test]
    fn test_line_continuation_in_rule() {
        parse_ok("BEGIN { x = 1 + \\\n 2 }");
    }
}

