//! Statement parsing.
//!
//! Statements terminate at a newline, `;`, `}`, or end of input; the
//! terminators themselves are consumed by the enclosing block loop, so
//! statement parsers never have to put one back. Newlines are allowed
//! (and skipped) after `{`, `,`, `&&`, `||`, `do`, `else`, and before
//! a loop body, per POSIX.

use fawk_lex::Token;

use crate::ast::*;
use crate::Parser;

impl<'a> Parser<'a> {
    /// Parses `{ stmt... }`, consuming both braces.
    pub(crate) fn parse_block(&mut self) -> Vec<Stmt> {
        self.expect(&Token::LBrace);
        let mut stmts = Vec::new();
        loop {
            self.skip_terminators();
            if self.check(&Token::RBrace) || self.at_end() {
                break;
            }
            stmts.push(self.parse_statement());
        }
        self.expect(&Token::RBrace);
        stmts
    }

    /// Parses a single statement.
    pub(crate) fn parse_statement(&mut self) -> Stmt {
        match self.current() {
            Token::LBrace => Stmt::Block(self.parse_block()),
            Token::Semicolon => {
                // Null statement.
                self.advance();
                Stmt::Block(Vec::new())
            }
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::Do => self.parse_do_while(),
            Token::For => self.parse_for(),
            Token::Switch => self.parse_switch(),
            Token::Print => self.parse_print(false),
            Token::Printf => self.parse_print(true),
            Token::Delete => self.parse_delete(),
            Token::Break => {
                self.advance();
                Stmt::Break
            }
            Token::Continue => {
                self.advance();
                Stmt::Continue
            }
            Token::Next => {
                self.advance();
                Stmt::Next
            }
            Token::NextFile => {
                self.advance();
                Stmt::NextFile
            }
            Token::Exit => {
                self.advance();
                let status = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expr())
                };
                Stmt::Exit(status)
            }
            Token::Return => {
                if !self.in_function {
                    self.error("`return` outside function body");
                }
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expr())
                };
                Stmt::Return(value)
            }
            _ => {
                let expr = self.parse_expr();
                if matches!(expr, Expr::Error) {
                    self.recover_to_sync();
                }
                Stmt::Expr(expr)
            }
        }
    }

    /// True if the current token ends a simple statement.
    fn at_statement_end(&self) -> bool {
        matches!(
            self.current(),
            Token::Newline | Token::Semicolon | Token::RBrace | Token::Eof
        )
    }

    fn parse_if(&mut self) -> Stmt {
        self.advance();
        self.expect(&Token::LParen);
        let cond = self.parse_expr();
        self.expect(&Token::RParen);
        self.skip_newlines();
        let then_branch = Box::new(self.parse_statement());

        // `else` may sit after the terminator of the then-branch;
        // eating terminators here is harmless because statements are
        // delimited, not separated.
        self.skip_terminators();
        let else_branch = if self.match_token(&Token::Else) {
            self.skip_newlines();
            Some(Box::new(self.parse_statement()))
        } else {
            None
        };

        Stmt::If(IfStmt {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Stmt {
        self.advance();
        self.expect(&Token::LParen);
        let cond = self.parse_expr();
        self.expect(&Token::RParen);
        self.skip_newlines();
        let body = Box::new(self.parse_statement());
        Stmt::While(WhileStmt { cond, body })
    }

    fn parse_do_while(&mut self) -> Stmt {
        self.advance();
        self.skip_newlines();
        let body = Box::new(self.parse_statement());
        self.skip_terminators();
        self.expect(&Token::While);
        self.expect(&Token::LParen);
        let cond = self.parse_expr();
        self.expect(&Token::RParen);
        Stmt::DoWhile(DoWhileStmt { body, cond })
    }

    fn parse_for(&mut self) -> Stmt {
        self.advance();
        self.expect(&Token::LParen);

        // `for (var in array)` - two-token lookahead on Ident + `in`.
        if let Token::Ident(name) = self.current().clone() {
            if *self.peek() == Token::In {
                self.advance(); // ident
                self.advance(); // in
                let array = match self.current().clone() {
                    Token::Ident(array) => {
                        self.advance();
                        self.qualify(&array)
                    }
                    other => {
                        self.error(format!("expected array name after `in`, found {}", other));
                        String::new()
                    }
                };
                self.expect(&Token::RParen);
                self.skip_newlines();
                let body = Box::new(self.parse_statement());
                return Stmt::ForIn(ForInStmt {
                    var: self.qualify(&name),
                    array,
                    body,
                });
            }
        }

        let init = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(Stmt::Expr(self.parse_expr()))
        };
        self.expect(&Token::Semicolon);

        let cond = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(&Token::Semicolon);

        let update = if self.check(&Token::RParen) {
            None
        } else {
            Some(Stmt::Expr(self.parse_expr()))
        };
        self.expect(&Token::RParen);
        self.skip_newlines();

        let body = self.parse_statement();
        Stmt::For(Box::new(ForStmt {
            init,
            cond,
            update,
            body,
        }))
    }

    fn parse_switch(&mut self) -> Stmt {
        self.advance();
        self.expect(&Token::LParen);
        let subject = self.parse_expr();
        self.expect(&Token::RParen);
        self.skip_newlines();
        self.expect(&Token::LBrace);

        let mut cases = Vec::new();
        loop {
            self.skip_terminators();
            match self.current() {
                Token::Case => {
                    self.advance();
                    let label = self.parse_case_label();
                    self.expect(&Token::Colon);
                    let body = self.parse_case_body();
                    cases.push(SwitchCase { label, body });
                }
                Token::Default => {
                    self.advance();
                    self.expect(&Token::Colon);
                    let body = self.parse_case_body();
                    cases.push(SwitchCase {
                        label: CaseLabel::Default,
                        body,
                    });
                }
                Token::RBrace | Token::Eof => break,
                other => {
                    let message = format!("expected `case` or `default`, found {}", other);
                    self.error(message);
                    self.recover_to_sync();
                }
            }
        }
        self.expect(&Token::RBrace);
        Stmt::Switch(SwitchStmt { subject, cases })
    }

    /// Case labels are constants: number, negated number, string, or
    /// regex.
    fn parse_case_label(&mut self) -> CaseLabel {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                CaseLabel::Num(n)
            }
            Token::Minus => {
                self.advance();
                match self.current().clone() {
                    Token::Number(n) => {
                        self.advance();
                        CaseLabel::Num(-n)
                    }
                    other => {
                        self.error(format!("expected number after `-`, found {}", other));
                        CaseLabel::Num(f64::NAN)
                    }
                }
            }
            Token::Str(s) => {
                self.advance();
                CaseLabel::Str(s)
            }
            Token::Regex(pattern) => {
                self.advance();
                CaseLabel::Regex(pattern)
            }
            other => {
                self.error(format!("invalid case label {}", other));
                self.advance();
                CaseLabel::Num(f64::NAN)
            }
        }
    }

    /// Statements of a case body, up to the next label or `}`.
    fn parse_case_body(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            self.skip_terminators();
            if matches!(
                self.current(),
                Token::Case | Token::Default | Token::RBrace | Token::Eof
            ) {
                break;
            }
            stmts.push(self.parse_statement());
        }
        stmts
    }

    /// `print`/`printf` with optional redirect. The argument list is
    /// parsed with `>`, `|`, and `|&` reserved for redirection;
    /// parentheses restore them.
    fn parse_print(&mut self, is_printf: bool) -> Stmt {
        self.advance();

        let mut args = Vec::new();
        if !self.at_print_args_end() {
            let saved = self.no_gt;
            self.no_gt = true;
            loop {
                args.push(self.parse_expr());
                if !self.match_token(&Token::Comma) {
                    break;
                }
                self.skip_newlines();
            }
            self.no_gt = saved;
        }

        // `print (a, b)` and `printf("%d\n", x)` arrive as a single
        // parenthesized group; unwrap it into the argument list.
        if args.len() == 1 {
            if let Expr::Group(list) = &args[0] {
                let list = list.clone();
                args = list;
            }
        }

        let redirect = self.parse_redirect();

        if is_printf && args.is_empty() {
            self.error("printf requires a format argument");
        }

        let stmt = PrintStmt { args, redirect };
        if is_printf {
            Stmt::Printf(stmt)
        } else {
            Stmt::Print(stmt)
        }
    }

    /// True if the print argument list is empty.
    fn at_print_args_end(&self) -> bool {
        matches!(
            self.current(),
            Token::Newline
                | Token::Semicolon
                | Token::RBrace
                | Token::Eof
                | Token::Gt
                | Token::Append
                | Token::Pipe
                | Token::TwoWayPipe
        )
    }

    /// Optional output redirect after `print`/`printf` arguments.
    fn parse_redirect(&mut self) -> Option<Redirect> {
        let kind = match self.current() {
            Token::Gt => RedirectKind::File,
            Token::Append => RedirectKind::Append,
            Token::Pipe => RedirectKind::Pipe,
            Token::TwoWayPipe => RedirectKind::Coprocess,
            _ => return None,
        };
        self.advance();
        // The target is a concatenation-level expression; comparison
        // operators stay outside redirect targets.
        let saved = self.no_gt;
        self.no_gt = true;
        let target = self.parse_concat();
        self.no_gt = saved;
        Some(Redirect { kind, target })
    }

    fn parse_delete(&mut self) -> Stmt {
        self.advance();
        let array = match self.current().clone() {
            Token::Ident(name) => {
                self.advance();
                self.qualify(&name)
            }
            other => {
                self.error(format!("expected array name after `delete`, found {}", other));
                self.recover_to_sync();
                return Stmt::Delete(DeleteStmt {
                    array: String::new(),
                    indices: Vec::new(),
                });
            }
        };
        let indices = if self.match_token(&Token::LBracket) {
            self.parse_index_list()
        } else {
            Vec::new()
        };
        Stmt::Delete(DeleteStmt { array, indices })
    }
}
