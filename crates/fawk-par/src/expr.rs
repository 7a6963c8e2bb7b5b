//! Expression parsing.
//!
//! One function per precedence level, lowest binding first:
//!
//! | Level | Construct | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `= += -= *= /= %= ^=` | Right |
//! | 2 | `?:` | Right |
//! | 3 | `\|\|` | Left |
//! | 4 | `&&` | Left |
//! | 5 | `in` | Left |
//! | 6 | `~` `!~` | Left |
//! | 7 | `< <= > >= == !=` | None |
//! | 8 | `cmd \| getline`, `cmd \|& getline` | Left |
//! | 9 | concatenation | Left |
//! | 10 | `+ -` | Left |
//! | 11 | `* / %` | Left |
//! | 12 | `! - +` (unary), `++ --` (prefix) | Prefix |
//! | 13 | `^` | Right |
//! | 14 | `++ --` (postfix), `$` | Postfix |
//!
//! Unary minus binds looser than `^` (so `-2^2 == -4`), which is why
//! `parse_unary` sits between the multiplicative and power levels and
//! the power level parses its exponent back at the unary level (this
//! also makes `^` right-associative and permits `2^-3`).

use fawk_lex::Token;

use crate::ast::*;
use crate::Parser;

impl<'a> Parser<'a> {
    /// Main expression entry point (assignment level).
    pub(crate) fn parse_expr(&mut self) -> Expr {
        self.parse_assign()
    }

    /// Assignment: right-associative, requires an l-value target, and
    /// yields the assigned value.
    fn parse_assign(&mut self) -> Expr {
        let left = self.parse_ternary();

        let op = match self.current() {
            Token::Assign => AssignOp::Assign,
            Token::AddAssign => AssignOp::Add,
            Token::SubAssign => AssignOp::Sub,
            Token::MulAssign => AssignOp::Mul,
            Token::DivAssign => AssignOp::Div,
            Token::ModAssign => AssignOp::Mod,
            Token::PowAssign => AssignOp::Pow,
            _ => return left,
        };

        match left.as_lvalue() {
            Some(target) => {
                self.advance();
                let value = self.parse_assign();
                Expr::Assign {
                    op,
                    target,
                    value: Box::new(value),
                }
            }
            None => {
                self.error("assignment target is not an lvalue");
                self.advance();
                let _ = self.parse_assign();
                Expr::Error
            }
        }
    }

    /// Ternary `cond ? a : b`, right-associative.
    fn parse_ternary(&mut self) -> Expr {
        let cond = self.parse_or();
        if !self.match_token(&Token::Question) {
            return cond;
        }
        self.skip_newlines();
        let then_expr = self.parse_ternary();
        self.skip_newlines();
        if !self.expect(&Token::Colon) {
            return Expr::Error;
        }
        self.skip_newlines();
        let else_expr = self.parse_ternary();
        Expr::Ternary(Box::new(cond), Box::new(then_expr), Box::new(else_expr))
    }

    /// Logical OR, short-circuit. A newline may follow `||`.
    fn parse_or(&mut self) -> Expr {
        let mut left = self.parse_and();
        while self.match_token(&Token::Or) {
            self.skip_newlines();
            let right = self.parse_and();
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        left
    }

    /// Logical AND, short-circuit. A newline may follow `&&`.
    fn parse_and(&mut self) -> Expr {
        let mut left = self.parse_in_expr();
        while self.match_token(&Token::And) {
            self.skip_newlines();
            let right = self.parse_in_expr();
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        left
    }

    /// Array membership: `key in arr`, `(k1, k2) in arr`.
    fn parse_in_expr(&mut self) -> Expr {
        let mut left = self.parse_match_expr();
        while self.match_token(&Token::In) {
            let array = match self.current().clone() {
                Token::Ident(name) => {
                    self.advance();
                    self.qualify(&name)
                }
                other => {
                    self.error(format!("expected array name after `in`, found {}", other));
                    return Expr::Error;
                }
            };
            let keys = match left {
                Expr::Group(list) => list,
                single => vec![single],
            };
            left = Expr::In { keys, array };
        }
        left
    }

    /// Regex match: `subject ~ pat`, `subject !~ pat`.
    fn parse_match_expr(&mut self) -> Expr {
        let mut left = self.parse_comparison();
        loop {
            let negated = match self.current() {
                Token::Match => false,
                Token::NotMatch => true,
                _ => return left,
            };
            self.advance();
            let pattern = self.parse_comparison();
            left = Expr::MatchOp {
                negated,
                subject: Box::new(left),
                pattern: Box::new(pattern),
            };
        }
    }

    /// Comparison; non-associative per POSIX, so at most one operator
    /// is consumed. Inside an unparenthesized print list `>` is left
    /// for the redirect.
    fn parse_comparison(&mut self) -> Expr {
        let left = self.parse_pipeline();
        let op = match self.current() {
            Token::Lt => BinOp::Lt,
            Token::Le => BinOp::Le,
            Token::Gt if !self.no_gt => BinOp::Gt,
            Token::Ge => BinOp::Ge,
            Token::Eq => BinOp::Eq,
            Token::Ne => BinOp::Ne,
            _ => return left,
        };
        self.advance();
        let right = self.parse_pipeline();
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    /// Pipe-getline: `cmd | getline [var]`, `cmd |& getline [var]`.
    /// Inside an unparenthesized print list the pipes are redirects
    /// and are left alone.
    fn parse_pipeline(&mut self) -> Expr {
        let mut left = self.parse_concat();
        loop {
            let coprocess = match self.current() {
                Token::Pipe if !self.no_gt => false,
                Token::TwoWayPipe if !self.no_gt => true,
                _ => return left,
            };
            if *self.peek() != Token::Getline {
                return left;
            }
            self.advance(); // pipe
            self.advance(); // getline
            let target = self.parse_getline_target();
            let source = if coprocess {
                GetlineSource::Coprocess(Box::new(left))
            } else {
                GetlineSource::Command(Box::new(left))
            };
            left = Expr::Getline(GetlineExpr { target, source });
        }
    }

    /// Concatenation by juxtaposition: while the next token can start
    /// a primary, parse another additive part.
    pub(crate) fn parse_concat(&mut self) -> Expr {
        let first = self.parse_additive();
        if !self.concat_continues() {
            return first;
        }
        let mut parts = vec![first];
        while self.concat_continues() {
            parts.push(self.parse_additive());
        }
        Expr::Concat(parts)
    }

    /// True if the current token can begin a concatenated operand.
    fn concat_continues(&self) -> bool {
        matches!(
            self.current(),
            Token::Number(_)
                | Token::Str(_)
                | Token::Ident(_)
                | Token::FuncName(_)
                | Token::Dollar
                | Token::LParen
                | Token::Not
                | Token::Incr
                | Token::Decr
                | Token::At
        )
    }

    /// Additive: `+ -`, left-associative.
    fn parse_additive(&mut self) -> Expr {
        let mut left = self.parse_multiplicative();
        loop {
            let op = match self.current() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => return left,
            };
            self.advance();
            let right = self.parse_multiplicative();
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    /// Multiplicative: `* / %`, left-associative.
    fn parse_multiplicative(&mut self) -> Expr {
        let mut left = self.parse_unary();
        loop {
            let op = match self.current() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => return left,
            };
            self.advance();
            let right = self.parse_unary();
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    /// Unary `! - +` and prefix `++ --`.
    fn parse_unary(&mut self) -> Expr {
        match self.current() {
            Token::Not => {
                self.advance();
                Expr::Unary(UnOp::Not, Box::new(self.parse_unary()))
            }
            Token::Minus => {
                self.advance();
                Expr::Unary(UnOp::Neg, Box::new(self.parse_unary()))
            }
            Token::Plus => {
                self.advance();
                Expr::Unary(UnOp::Pos, Box::new(self.parse_unary()))
            }
            Token::Incr | Token::Decr => {
                let op = if self.check(&Token::Incr) {
                    IncDecOp::Incr
                } else {
                    IncDecOp::Decr
                };
                self.advance();
                let operand = self.parse_unary();
                match operand.as_lvalue() {
                    Some(target) => Expr::IncrDecr {
                        op,
                        postfix: false,
                        target,
                    },
                    None => {
                        self.error("operand of increment/decrement is not an lvalue");
                        Expr::Error
                    }
                }
            }
            _ => self.parse_power(),
        }
    }

    /// Power `^`, right-associative; the exponent re-enters at the
    /// unary level so `2^-3` parses.
    fn parse_power(&mut self) -> Expr {
        let base = self.parse_postfix();
        if !self.match_token(&Token::Caret) {
            return base;
        }
        let exponent = self.parse_unary();
        Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent))
    }

    /// Postfix `++ --`; applies only when the operand is an l-value,
    /// otherwise the token is left for a following prefix use.
    fn parse_postfix(&mut self) -> Expr {
        let expr = self.parse_primary();
        let target = match self.current() {
            Token::Incr | Token::Decr => match expr.as_lvalue() {
                Some(target) => target,
                None => return expr,
            },
            _ => return expr,
        };
        let op = if self.check(&Token::Incr) {
            IncDecOp::Incr
        } else {
            IncDecOp::Decr
        };
        self.advance();
        Expr::IncrDecr {
            op,
            postfix: true,
            target,
        }
    }

    /// Primary expressions.
    fn parse_primary(&mut self) -> Expr {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Expr::Num(n)
            }
            Token::Str(s) => {
                self.advance();
                Expr::Str(s)
            }
            Token::Regex(pattern) => {
                self.advance();
                Expr::Regex(pattern)
            }
            Token::Ident(name) => {
                self.advance();
                // POSIX allows `length` with no parentheses.
                if name == "length" && !self.check(&Token::LBracket) {
                    return Expr::Call {
                        name,
                        args: Vec::new(),
                    };
                }
                let name = self.qualify(&name);
                if self.match_token(&Token::LBracket) {
                    let indices = self.parse_index_list();
                    Expr::Index(name, indices)
                } else {
                    Expr::Var(name)
                }
            }
            Token::FuncName(name) => {
                self.advance();
                self.expect(&Token::LParen);
                let args = self.parse_call_args();
                Expr::Call {
                    name: self.qualify_func(&name),
                    args,
                }
            }
            Token::Dollar => {
                self.advance();
                Expr::Field(Box::new(self.parse_field_operand()))
            }
            Token::LParen => {
                self.advance();
                self.parse_paren_group()
            }
            Token::Getline => {
                self.advance();
                self.parse_simple_getline()
            }
            Token::At => {
                self.advance();
                self.parse_indirect_call()
            }
            Token::Error(_) => {
                // The lexer already reported it.
                self.advance();
                Expr::Error
            }
            other => {
                self.error(format!("unexpected {} in expression", other));
                self.advance();
                Expr::Error
            }
        }
    }

    /// The rest of `( ... )`: either a parenthesized expression or an
    /// expression list (valid only before `in` or as a print list).
    /// The print restriction flag is lifted inside.
    fn parse_paren_group(&mut self) -> Expr {
        let saved = self.no_gt;
        self.no_gt = false;

        let first = self.parse_expr();
        let expr = if self.check(&Token::Comma) {
            let mut list = vec![first];
            while self.match_token(&Token::Comma) {
                self.skip_newlines();
                list.push(self.parse_expr());
            }
            Expr::Group(list)
        } else {
            first
        };

        self.no_gt = saved;
        self.expect(&Token::RParen);
        expr
    }

    /// `getline` and `getline < file` forms (the pipe forms are parsed
    /// at the pipeline level where the command is already known).
    fn parse_simple_getline(&mut self) -> Expr {
        let target = self.parse_getline_target();
        let source = if self.match_token(&Token::Lt) {
            GetlineSource::File(Box::new(self.parse_concat()))
        } else {
            GetlineSource::Main
        };
        Expr::Getline(GetlineExpr { target, source })
    }

    /// Optional l-value following `getline`.
    pub(crate) fn parse_getline_target(&mut self) -> Option<LValue> {
        match self.current().clone() {
            Token::Ident(name) => {
                self.advance();
                let name = self.qualify(&name);
                if self.match_token(&Token::LBracket) {
                    let indices = self.parse_index_list();
                    Some(LValue::Index(name, indices))
                } else {
                    Some(LValue::Var(name))
                }
            }
            Token::Dollar => {
                self.advance();
                Some(LValue::Field(Box::new(self.parse_field_operand())))
            }
            _ => None,
        }
    }

    /// Indirect call after `@`: `@name(args)` or `@(expr)(args)`.
    fn parse_indirect_call(&mut self) -> Expr {
        let target = match self.current().clone() {
            Token::FuncName(name) => {
                self.advance();
                Expr::Var(self.qualify(&name))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(&Token::RParen);
                inner
            }
            other => {
                self.error(format!("expected function name after `@`, found {}", other));
                return Expr::Error;
            }
        };
        self.expect(&Token::LParen);
        let args = self.parse_call_args();
        Expr::IndirectCall {
            target: Box::new(target),
            args,
        }
    }

    /// Call arguments after `(`, consuming the closing `)`. The print
    /// restriction is lifted inside.
    fn parse_call_args(&mut self) -> Vec<Expr> {
        let saved = self.no_gt;
        self.no_gt = false;

        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                args.push(self.parse_expr());
                if !self.match_token(&Token::Comma) {
                    break;
                }
                self.skip_newlines();
            }
        }

        self.no_gt = saved;
        self.expect(&Token::RParen);
        args
    }

    /// Index list after `[`, consuming the closing `]`.
    pub(crate) fn parse_index_list(&mut self) -> Vec<Expr> {
        let mut indices = Vec::new();
        loop {
            indices.push(self.parse_expr());
            if !self.match_token(&Token::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(&Token::RBracket);
        indices
    }

    /// Operand of `$`. Binds tighter than postfix `++`/`--` (so
    /// `$i++` increments the field), but prefix operators are allowed
    /// through (`$++i`, `$-n`, `$$1`).
    pub(crate) fn parse_field_operand(&mut self) -> Expr {
        match self.current().clone() {
            Token::Dollar => {
                self.advance();
                Expr::Field(Box::new(self.parse_field_operand()))
            }
            Token::Incr | Token::Decr => {
                let op = if self.check(&Token::Incr) {
                    IncDecOp::Incr
                } else {
                    IncDecOp::Decr
                };
                self.advance();
                let operand = self.parse_field_operand();
                match operand.as_lvalue() {
                    Some(target) => Expr::IncrDecr {
                        op,
                        postfix: false,
                        target,
                    },
                    None => {
                        self.error("operand of increment/decrement is not an lvalue");
                        Expr::Error
                    }
                }
            }
            Token::Minus => {
                self.advance();
                Expr::Unary(UnOp::Neg, Box::new(self.parse_field_operand()))
            }
            Token::Not => {
                self.advance();
                Expr::Unary(UnOp::Not, Box::new(self.parse_field_operand()))
            }
            _ => self.parse_primary(),
        }
    }
}
