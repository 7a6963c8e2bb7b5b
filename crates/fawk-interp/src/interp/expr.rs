//! Expression evaluation.

use fawk_par::{AssignOp, BinOp, Expr, GetlineExpr, GetlineSource, IncDecOp, LValue, UnOp};

use crate::interp::{Eval, Exec, Interpreter, Unwind};
use crate::io::RecordSep;
use crate::value::{make_array_key, Value};

impl Interpreter {
    /// Evaluates an expression to a value.
    pub(crate) fn eval(&mut self, expr: &Expr) -> Eval {
        match expr {
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),

            // A regex literal in value position matches against `$0`.
            Expr::Regex(pattern) => {
                let ofs = self.specials.ofs.clone();
                let subject = self.record.record(&ofs).to_string();
                let matched = self.regex_matches(pattern, &subject);
                Ok(Value::Num(if matched { 1.0 } else { 0.0 }))
            }

            Expr::Var(name) => Ok(self.read_var(name)),
            Expr::Field(index) => {
                let index = self.eval(index)?.to_number();
                Ok(self.read_field(index))
            }
            Expr::Index(name, indices) => self.read_index(name, indices),

            Expr::Assign { op, target, value } => self.eval_assign(*op, target, value),
            Expr::IncrDecr {
                op,
                postfix,
                target,
            } => self.eval_incr_decr(*op, *postfix, target),

            Expr::Binary(op, left, right) => self.eval_binary(*op, left, right),
            Expr::Unary(op, operand) => {
                let value = self.eval_scalar(operand)?;
                Ok(match op {
                    UnOp::Not => Value::Num(if value.to_bool() { 0.0 } else { 1.0 }),
                    UnOp::Neg => Value::Num(-value.to_number()),
                    UnOp::Pos => Value::Num(value.to_number()),
                })
            }

            Expr::Ternary(cond, then_expr, else_expr) => {
                if self.eval(cond)?.to_bool() {
                    self.eval(then_expr)
                } else {
                    self.eval(else_expr)
                }
            }

            Expr::Concat(parts) => {
                let convfmt = self.specials.convfmt.clone();
                let mut text = String::new();
                for part in parts {
                    let value = self.eval_scalar(part)?;
                    text.push_str(&value.to_str(&convfmt));
                }
                Ok(Value::Str(text))
            }

            Expr::MatchOp {
                negated,
                subject,
                pattern,
            } => {
                let convfmt = self.specials.convfmt.clone();
                let subject = self.eval_scalar(subject)?.to_str(&convfmt);
                let pattern = self.pattern_text(pattern)?;
                let matched = self.regex_matches(&pattern, &subject);
                let truth = matched != *negated;
                Ok(Value::Num(if truth { 1.0 } else { 0.0 }))
            }

            Expr::In { keys, array } => {
                let key = self.array_key(keys)?;
                let contained = if array == "SYMTAB" {
                    !matches!(self.env.get_global(&key), Value::Uninit)
                        || self.env.global_names().contains(&key)
                } else {
                    match self.env.get_array(array) {
                        Ok(arr) => arr.borrow().contains_key(&key),
                        Err(message) => {
                            self.warn(message);
                            false
                        }
                    }
                };
                Ok(Value::Num(if contained { 1.0 } else { 0.0 }))
            }

            Expr::Call { name, args } => self.call_function(name, args),

            Expr::IndirectCall { target, args } => {
                let convfmt = self.specials.convfmt.clone();
                let name = self.eval(target)?.to_str(&convfmt);
                if name.is_empty() {
                    self.warn("indirect call through empty function name");
                    return Ok(Value::Uninit);
                }
                self.call_function(&name, args)
            }

            Expr::Getline(getline) => self.eval_getline(getline),

            Expr::Group(list) => {
                self.warn("expression list used in value context");
                match list.first() {
                    Some(first) => self.eval(first),
                    None => Ok(Value::Uninit),
                }
            }

            Expr::Error => Ok(Value::Uninit),
        }
    }

    /// Evaluates an expression and rejects arrays in scalar context.
    pub(crate) fn eval_scalar(&mut self, expr: &Expr) -> Eval {
        let value = self.eval(expr)?;
        if value.is_array() {
            self.warn("attempt to use array in scalar context");
            return Ok(Value::Uninit);
        }
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Variables, fields, arrays
    // ------------------------------------------------------------------

    /// Reads a variable; `NF` reads from the record machine.
    pub(crate) fn read_var(&mut self, name: &str) -> Value {
        if name == "NF" {
            return Value::Num(self.record.nf() as f64);
        }
        self.env.get(name)
    }

    /// Reads `$index`.
    pub(crate) fn read_field(&mut self, index: f64) -> Value {
        let index = index.trunc();
        if index < 0.0 {
            self.warn(format!("attempt to access field {}", index));
            return Value::Uninit;
        }
        if index == 0.0 {
            let ofs = self.specials.ofs.clone();
            return Value::from_input(&self.record.record(&ofs).to_string());
        }
        Value::from_input(self.record.field(index as usize))
    }

    /// Reads `name[indices]`, auto-vivifying the element.
    fn read_index(&mut self, name: &str, indices: &[Expr]) -> Eval {
        let key = self.array_key_exprs(indices)?;

        // SYMTAB[name] aliases the global variable of that name.
        if name == "SYMTAB" {
            return Ok(self.env.get_global(&key));
        }

        match self.env.get_array(name) {
            Ok(array) => {
                let mut array = array.borrow_mut();
                let value = array.entry(key).or_insert(Value::Uninit);
                Ok(value.clone())
            }
            Err(message) => {
                self.warn(message);
                Ok(Value::Uninit)
            }
        }
    }

    /// Joins evaluated index expressions with `SUBSEP`.
    pub(crate) fn array_key_exprs(&mut self, indices: &[Expr]) -> Result<String, Unwind> {
        let mut values = Vec::with_capacity(indices.len());
        for index in indices {
            values.push(self.eval_scalar(index)?);
        }
        Ok(make_array_key(
            &values,
            &self.specials.subsep.clone(),
            &self.specials.convfmt.clone(),
        ))
    }

    /// Joins already-parsed `in` keys with `SUBSEP`.
    fn array_key(&mut self, keys: &[Expr]) -> Result<String, Unwind> {
        self.array_key_exprs(keys)
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    fn eval_assign(&mut self, op: AssignOp, target: &LValue, value: &Expr) -> Eval {
        let assigned = match op {
            AssignOp::Assign => {
                let value = self.eval(value)?;
                if value.is_array() {
                    self.warn("attempt to use array in scalar context");
                    Value::Uninit
                } else {
                    value
                }
            }
            _ => {
                let old = self.read_lvalue(target)?.to_number();
                let rhs = self.eval_scalar(value)?.to_number();
                let result = match op {
                    AssignOp::Add => old + rhs,
                    AssignOp::Sub => old - rhs,
                    AssignOp::Mul => old * rhs,
                    AssignOp::Div => old / rhs,
                    AssignOp::Mod => old % rhs,
                    AssignOp::Pow => old.powf(rhs),
                    AssignOp::Assign => unreachable!("handled above"),
                };
                Value::Num(result)
            }
        };
        self.assign(target, assigned.clone())?;
        Ok(assigned)
    }

    fn eval_incr_decr(&mut self, op: IncDecOp, postfix: bool, target: &LValue) -> Eval {
        let old = self.read_lvalue(target)?.to_number();
        let new = match op {
            IncDecOp::Incr => old + 1.0,
            IncDecOp::Decr => old - 1.0,
        };
        self.assign(target, Value::Num(new))?;
        Ok(Value::Num(if postfix { old } else { new }))
    }

    /// Reads the current value of an l-value.
    pub(crate) fn read_lvalue(&mut self, target: &LValue) -> Eval {
        match target {
            LValue::Var(name) => Ok(self.read_var(name)),
            LValue::Field(index) => {
                let index = self.eval(index)?.to_number();
                Ok(self.read_field(index))
            }
            LValue::Index(name, indices) => self.read_index(name, indices),
        }
    }

    /// Writes a value through an l-value, handling every special
    /// case: `NF` resizes the field vector, `$0` re-splits, `$i`
    /// marks the record stale, `SYMTAB[x]` writes the global `x`, and
    /// assignments to cached specials refresh the cache.
    pub(crate) fn assign(&mut self, target: &LValue, value: Value) -> Exec {
        match target {
            LValue::Var(name) => {
                if name == "NF" {
                    let n = value.to_number().trunc().max(0.0) as usize;
                    self.record.set_nf(n);
                    self.sync_nf();
                    return Ok(());
                }
                if let Err(message) = self.env.set(name, value) {
                    self.warn(message);
                }
                if crate::environ::is_cached_special(name) {
                    self.specials.refresh(&self.env);
                }
                Ok(())
            }
            LValue::Field(index) => {
                let index = self.eval(index)?.to_number().trunc();
                let convfmt = self.specials.convfmt.clone();
                let text = value.to_str(&convfmt);
                if index < 0.0 {
                    self.warn(format!("attempt to assign to field {}", index));
                    return Ok(());
                }
                if index == 0.0 {
                    self.set_record_text(&text);
                } else {
                    self.record.set_field(index as usize, text);
                    self.sync_nf();
                }
                Ok(())
            }
            LValue::Index(name, indices) => {
                let key = self.array_key_exprs(indices)?;
                if name == "SYMTAB" {
                    if let Err(message) = self.env.set_global(&key, value) {
                        self.warn(message);
                    }
                    if crate::environ::is_cached_special(&key) {
                        self.specials.refresh(&self.env);
                    }
                    return Ok(());
                }
                if name == "FUNCTAB" {
                    self.warn("FUNCTAB is read-only");
                    return Ok(());
                }
                match self.env.get_array(name) {
                    Ok(array) => {
                        array.borrow_mut().insert(key, value);
                    }
                    Err(message) => self.warn(message),
                }
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> Eval {
        // Short-circuit forms first; they always yield 0 or 1.
        match op {
            BinOp::And => {
                if !self.eval(left)?.to_bool() {
                    return Ok(Value::Num(0.0));
                }
                let right = self.eval(right)?.to_bool();
                return Ok(Value::Num(if right { 1.0 } else { 0.0 }));
            }
            BinOp::Or => {
                if self.eval(left)?.to_bool() {
                    return Ok(Value::Num(1.0));
                }
                let right = self.eval(right)?.to_bool();
                return Ok(Value::Num(if right { 1.0 } else { 0.0 }));
            }
            _ => {}
        }

        let left = self.eval_scalar(left)?;
        let right = self.eval_scalar(right)?;

        let result = match op {
            BinOp::Add => Value::Num(left.to_number() + right.to_number()),
            BinOp::Sub => Value::Num(left.to_number() - right.to_number()),
            BinOp::Mul => Value::Num(left.to_number() * right.to_number()),
            // Division and modulo by zero follow IEEE-754: infinity
            // and NaN, not errors.
            BinOp::Div => Value::Num(left.to_number() / right.to_number()),
            BinOp::Mod => Value::Num(left.to_number() % right.to_number()),
            BinOp::Pow => Value::Num(left.to_number().powf(right.to_number())),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne => {
                let convfmt = self.specials.convfmt.clone();
                let ordering = left.compare(&right, &convfmt);
                let truth = match op {
                    BinOp::Lt => ordering.is_lt(),
                    BinOp::Le => ordering.is_le(),
                    BinOp::Gt => ordering.is_gt(),
                    BinOp::Ge => ordering.is_ge(),
                    BinOp::Eq => ordering.is_eq(),
                    BinOp::Ne => ordering.is_ne(),
                    _ => unreachable!(),
                };
                Value::Num(if truth { 1.0 } else { 0.0 })
            }
            BinOp::And | BinOp::Or => unreachable!("short-circuit handled above"),
        };
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Regex helpers
    // ------------------------------------------------------------------

    /// The pattern text of a match operand: a regex literal is the
    /// pattern itself, anything else stringifies.
    pub(crate) fn pattern_text(&mut self, expr: &Expr) -> Result<String, Unwind> {
        match expr {
            Expr::Regex(pattern) => Ok(pattern.clone()),
            other => {
                let convfmt = self.specials.convfmt.clone();
                let value = self.eval(other)?;
                Ok(match value {
                    Value::Regex(pattern) => pattern.to_string(),
                    scalar => scalar.to_str(&convfmt),
                })
            }
        }
    }

    /// Compiles a pattern under the current `IGNORECASE`, reporting
    /// compile errors and returning `None` so callers yield a neutral
    /// value.
    pub(crate) fn compile_pattern(&mut self, pattern: &str) -> Option<std::rc::Rc<regex::Regex>> {
        let ignore_case = self.specials.ignore_case;
        match self.cache.compile(pattern, ignore_case) {
            Ok(regex) => Some(regex),
            Err(err) => {
                self.warn(format!("invalid regex `{}`: {}", pattern, err));
                None
            }
        }
    }

    /// Whether `pattern` matches `subject`; compile failure is false.
    pub(crate) fn regex_matches(&mut self, pattern: &str, subject: &str) -> bool {
        match self.compile_pattern(pattern) {
            Some(regex) => regex.is_match(subject),
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // getline
    // ------------------------------------------------------------------

    /// Evaluates any `getline` form. Returns 1 on success, 0 at end
    /// of input, -1 on error.
    fn eval_getline(&mut self, getline: &GetlineExpr) -> Eval {
        match &getline.source {
            GetlineSource::Main => {
                match self.next_main_record()? {
                    Some((record, terminator)) => {
                        // Main-input forms update NR and FNR.
                        self.bump_record_counts();
                        self.set_rt(&terminator);
                        self.store_getline_record(&getline.target, &record)?;
                        Ok(Value::Num(1.0))
                    }
                    None => Ok(Value::Num(0.0)),
                }
            }
            GetlineSource::File(file) => {
                let convfmt = self.specials.convfmt.clone();
                let name = self.eval_scalar(file)?.to_str(&convfmt);
                self.getline_from_source(SourceKind::File, &name, &getline.target)
            }
            GetlineSource::Command(command) => {
                let convfmt = self.specials.convfmt.clone();
                let command = self.eval_scalar(command)?.to_str(&convfmt);
                self.getline_from_source(SourceKind::Pipe, &command, &getline.target)
            }
            GetlineSource::Coprocess(command) => {
                let convfmt = self.specials.convfmt.clone();
                let command = self.eval_scalar(command)?.to_str(&convfmt);
                self.getline_from_source(SourceKind::Coprocess, &command, &getline.target)
            }
        }
    }

    /// Shared body of the file / pipe / coprocess getline forms.
    /// These do not touch `NR`/`FNR`.
    fn getline_from_source(
        &mut self,
        kind: SourceKind,
        name: &str,
        target: &Option<LValue>,
    ) -> Eval {
        let sep = RecordSep::from_rs(&self.specials.rs);
        let ignore_case = self.specials.ignore_case;

        let result = {
            let source = match kind {
                SourceKind::File => self.io.input_file(name),
                SourceKind::Pipe => self.io.input_pipe(name),
                SourceKind::Coprocess => self.io.coproc_reader(name),
            };
            match source {
                Ok(source) => source.read_record(&sep, &mut self.cache, ignore_case),
                Err(err) => {
                    self.warn(format!("can't open `{}`: {}", name, err));
                    return Ok(Value::Num(-1.0));
                }
            }
        };

        match result {
            Ok(Some((record, terminator))) => {
                self.set_rt(&terminator);
                self.store_getline_record(target, &record)?;
                Ok(Value::Num(1.0))
            }
            Ok(None) => Ok(Value::Num(0.0)),
            Err(err) => {
                self.warn(format!("error reading `{}`: {}", name, err));
                Ok(Value::Num(-1.0))
            }
        }
    }

    /// Stores a record read by getline: into the named l-value as a
    /// numeric string, or into `$0` with a field re-split.
    fn store_getline_record(&mut self, target: &Option<LValue>, record: &str) -> Exec {
        match target {
            Some(lvalue) => self.assign(lvalue, Value::from_input(record)),
            None => {
                self.set_record_text(record);
                Ok(())
            }
        }
    }
}

/// The three redirected getline source kinds.
#[derive(Clone, Copy)]
enum SourceKind {
    File,
    Pipe,
    Coprocess,
}
