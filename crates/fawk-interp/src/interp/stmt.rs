//! Statement execution and user-function calls.

use rustc_hash::FxHashMap;

use fawk_par::{
    AssignOp, CaseLabel, Expr, Function, LValue, PrintStmt, RedirectKind, Stmt, SwitchStmt,
};

use crate::interp::{Eval, Exec, Interpreter, Unwind, MAX_CALL_DEPTH};
use crate::value::Value;

impl Interpreter {
    /// Executes a statement list.
    pub(crate) fn exec_stmts(&mut self, stmts: &[Stmt]) -> Exec {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    /// Executes one statement.
    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt) -> Exec {
        match stmt {
            Stmt::Block(stmts) => self.exec_stmts(stmts),

            Stmt::Expr(expr) => {
                if self.try_concat_accumulate(expr)? {
                    return Ok(());
                }
                self.eval(expr)?;
                Ok(())
            }

            Stmt::Print(print) => self.exec_print(print),
            Stmt::Printf(print) => self.exec_printf(print),

            Stmt::If(if_stmt) => {
                if self.eval(&if_stmt.cond)?.to_bool() {
                    self.exec_stmt(&if_stmt.then_branch)
                } else if let Some(else_branch) = &if_stmt.else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(())
                }
            }

            Stmt::While(while_stmt) => {
                while self.eval(&while_stmt.cond)?.to_bool() {
                    match self.exec_stmt(&while_stmt.body) {
                        Err(Unwind::Break) => break,
                        Err(Unwind::Continue) => continue,
                        other => other?,
                    }
                }
                Ok(())
            }

            Stmt::DoWhile(do_stmt) => {
                loop {
                    match self.exec_stmt(&do_stmt.body) {
                        Err(Unwind::Break) => break,
                        Err(Unwind::Continue) => {}
                        other => other?,
                    }
                    if !self.eval(&do_stmt.cond)?.to_bool() {
                        break;
                    }
                }
                Ok(())
            }

            Stmt::For(for_stmt) => {
                if let Some(init) = &for_stmt.init {
                    self.exec_stmt(init)?;
                }
                loop {
                    if let Some(cond) = &for_stmt.cond {
                        if !self.eval(cond)?.to_bool() {
                            break;
                        }
                    }
                    match self.exec_stmt(&for_stmt.body) {
                        Err(Unwind::Break) => break,
                        Err(Unwind::Continue) => {}
                        other => other?,
                    }
                    if let Some(update) = &for_stmt.update {
                        self.exec_stmt(update)?;
                    }
                }
                Ok(())
            }

            Stmt::ForIn(for_in) => {
                // Iterate a snapshot of the keys: deletions during the
                // loop affect lookups but not the iteration set.
                let keys = self.array_key_snapshot(&for_in.array);
                for key in keys {
                    self.assign(&LValue::Var(for_in.var.clone()), Value::from_input(&key))?;
                    match self.exec_stmt(&for_in.body) {
                        Err(Unwind::Break) => break,
                        Err(Unwind::Continue) => continue,
                        other => other?,
                    }
                }
                Ok(())
            }

            Stmt::Switch(switch) => self.exec_switch(switch),

            Stmt::Delete(delete) => {
                if delete.array == "SYMTAB" {
                    if delete.indices.is_empty() {
                        self.warn("cannot delete SYMTAB");
                    } else {
                        let key = self.array_key_exprs(&delete.indices)?;
                        let _ = self.env.set_global(&key, Value::Uninit);
                    }
                    return Ok(());
                }
                if delete.array == "FUNCTAB" {
                    self.warn("FUNCTAB is read-only");
                    return Ok(());
                }
                let array = match self.env.get_array(&delete.array) {
                    Ok(array) => array,
                    Err(message) => {
                        self.warn(message);
                        return Ok(());
                    }
                };
                if delete.indices.is_empty() {
                    array.borrow_mut().clear();
                } else {
                    let key = self.array_key_exprs(&delete.indices)?;
                    array.borrow_mut().shift_remove(&key);
                }
                Ok(())
            }

            Stmt::Break => Err(Unwind::Break),
            Stmt::Continue => Err(Unwind::Continue),
            Stmt::Next => Err(Unwind::Next),
            Stmt::NextFile => Err(Unwind::NextFile),

            Stmt::Exit(status) => {
                let code = match status {
                    Some(expr) => self.eval(expr)?.to_number() as i32,
                    None => 0,
                };
                Err(Unwind::Exit(code & 0xFF))
            }

            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Uninit,
                };
                Err(Unwind::Return(value))
            }
        }
    }

    /// Snapshot of an array's keys for `for (k in arr)`. `SYMTAB`
    /// iterates the global names.
    fn array_key_snapshot(&mut self, array: &str) -> Vec<String> {
        if array == "SYMTAB" {
            return self.env.global_names();
        }
        match self.env.get_array(array) {
            Ok(array) => array.borrow().keys().cloned().collect(),
            Err(message) => {
                self.warn(message);
                Vec::new()
            }
        }
    }

    /// `switch`: find the matching case in source order (`default`
    /// when nothing matches), then fall through until `break`.
    fn exec_switch(&mut self, switch: &SwitchStmt) -> Exec {
        let subject = self.eval(&switch.subject)?;
        let convfmt = self.specials.convfmt.clone();

        let mut start = None;
        for (index, case) in switch.cases.iter().enumerate() {
            let matched = match &case.label {
                CaseLabel::Num(n) => subject.compare(&Value::Num(*n), &convfmt).is_eq(),
                CaseLabel::Str(s) => subject.compare(&Value::Str(s.clone()), &convfmt).is_eq(),
                CaseLabel::Regex(pattern) => {
                    let text = subject.to_str(&convfmt);
                    self.regex_matches(pattern, &text)
                }
                CaseLabel::Default => false,
            };
            if matched {
                start = Some(index);
                break;
            }
        }
        let start = start.or_else(|| {
            switch
                .cases
                .iter()
                .position(|case| matches!(case.label, CaseLabel::Default))
        });

        if let Some(start) = start {
            for case in &switch.cases[start..] {
                match self.exec_stmts(&case.body) {
                    Err(Unwind::Break) => return Ok(()),
                    other => other?,
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // print / printf
    // ------------------------------------------------------------------

    fn exec_print(&mut self, print: &PrintStmt) -> Exec {
        let ofs = self.specials.ofs.clone();
        let ors = self.specials.ors.clone();
        let ofmt = self.specials.ofmt.clone();

        let text = if print.args.is_empty() {
            let mut text = self.record.record(&ofs).to_string();
            text.push_str(&ors);
            text
        } else {
            let mut parts = Vec::with_capacity(print.args.len());
            for arg in &print.args {
                let value = self.eval_scalar(arg)?;
                parts.push(value.to_output_str(&ofmt));
            }
            let mut text = parts.join(&ofs);
            text.push_str(&ors);
            text
        };

        self.write_redirected(&print.redirect.clone(), &text)
    }

    fn exec_printf(&mut self, print: &PrintStmt) -> Exec {
        let convfmt = self.specials.convfmt.clone();
        let Some((format_expr, rest)) = print.args.split_first() else {
            return Ok(());
        };
        let format = self.eval_scalar(format_expr)?.to_str(&convfmt);
        let mut values = Vec::with_capacity(rest.len());
        for arg in rest {
            values.push(self.eval_scalar(arg)?);
        }
        let text = crate::printf::sprintf(&format, &values, &convfmt);
        self.write_redirected(&print.redirect.clone(), &text)
    }

    /// Routes print output to stdout or a redirect target.
    fn write_redirected(
        &mut self,
        redirect: &Option<fawk_par::Redirect>,
        text: &str,
    ) -> Exec {
        let Some(redirect) = redirect else {
            self.write_main_output(text);
            return Ok(());
        };

        let convfmt = self.specials.convfmt.clone();
        let target = self.eval_scalar(&redirect.target)?.to_str(&convfmt);

        let result = match redirect.kind {
            RedirectKind::File => self.io.write_file(&target, false, text),
            RedirectKind::Append => self.io.write_file(&target, true, text),
            RedirectKind::Pipe => self.io.write_pipe(&target, text),
            RedirectKind::Coprocess => self.io.coproc_write(&target, text),
        };
        if let Err(err) = result {
            self.warn(format!("can't write to `{}`: {}", target, err));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Concat accumulation fast path
    // ------------------------------------------------------------------

    /// The `v = v part...` statement shape appends directly into the
    /// variable's buffer instead of rebuilding the whole string. Only
    /// the side effect on `v` is observable in this shape (the
    /// statement discards the expression value).
    fn try_concat_accumulate(&mut self, expr: &Expr) -> Result<bool, Unwind> {
        let Expr::Assign {
            op: AssignOp::Assign,
            target: LValue::Var(name),
            value,
        } = expr
        else {
            return Ok(false);
        };
        let Expr::Concat(parts) = value.as_ref() else {
            return Ok(false);
        };
        if !matches!(parts.first(), Some(Expr::Var(first)) if first == name) {
            return Ok(false);
        }
        // Special variables route through the normal path so their
        // side effects (cache refresh, NF) stay correct.
        if fawk_par::is_special_var(name) {
            return Ok(false);
        }

        let convfmt = self.specials.convfmt.clone();
        let mut buffer = self.read_var(name).to_str(&convfmt);
        for part in &parts[1..] {
            let value = self.eval_scalar(part)?;
            buffer.push_str(&value.to_str(&convfmt));
        }
        self.assign(&LValue::Var(name.clone()), Value::Str(buffer))?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Function calls
    // ------------------------------------------------------------------

    /// Dispatches a call to a user function or builtin.
    pub(crate) fn call_function(&mut self, name: &str, args: &[Expr]) -> Eval {
        if let Some(function) = self.env.function(name) {
            return self.call_user_function(&function, args);
        }
        if fawk_par::is_builtin(name) {
            return self.call_builtin(name, args);
        }
        self.warn(format!("call to undefined function `{}`", name));
        Ok(Value::Uninit)
    }

    /// Calls a user function: scalars by value, arrays by reference,
    /// uninitialized bare names by deferred alias, missing arguments
    /// as fresh locals.
    fn call_user_function(&mut self, function: &Function, args: &[Expr]) -> Eval {
        if args.len() > function.params.len() {
            self.warn(format!(
                "function `{}` called with {} arguments, declares {}",
                function.name,
                args.len(),
                function.params.len()
            ));
        }
        if self.call_depth >= MAX_CALL_DEPTH {
            self.warn(format!(
                "function `{}` exceeded the recursion limit ({})",
                function.name, MAX_CALL_DEPTH
            ));
            return Ok(Value::Uninit);
        }

        // Bind arguments in the caller's scope before pushing the
        // frame.
        let mut locals = FxHashMap::default();
        let mut aliases = FxHashMap::default();
        for (i, param) in function.params.iter().enumerate() {
            match args.get(i) {
                Some(Expr::Var(name)) => match self.env.get(name) {
                    Value::Array(array) => {
                        locals.insert(param.clone(), Value::Array(array));
                    }
                    Value::Uninit => {
                        // The callee may use this as either scalar or
                        // array; remember the caller's slot so an
                        // array vivifies there and aliases.
                        locals.insert(param.clone(), Value::Uninit);
                        aliases.insert(param.clone(), self.env.slot_for_alias(name));
                    }
                    scalar => {
                        locals.insert(param.clone(), scalar);
                    }
                },
                Some(expr) => {
                    let value = self.eval(expr)?;
                    if value.is_array() {
                        self.warn("attempt to use array in scalar context");
                        locals.insert(param.clone(), Value::Uninit);
                    } else {
                        locals.insert(param.clone(), value);
                    }
                }
                None => {
                    // Extra parameters act as local variables.
                    locals.insert(param.clone(), Value::Uninit);
                }
            }
        }

        self.env.push_frame(locals, aliases);
        self.call_depth += 1;
        let outcome = self.exec_stmts(&function.body);
        self.call_depth -= 1;
        self.env.pop_frame();

        match outcome {
            Ok(()) => Ok(Value::Uninit),
            Err(Unwind::Return(value)) => Ok(value),
            // next/nextfile/exit unwind through function frames.
            Err(other) => Err(other),
        }
    }
}
