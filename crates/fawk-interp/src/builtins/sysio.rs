//! I/O builtins: `close`, `fflush`, `system`.

use fawk_par::Expr;

use crate::interp::{Eval, Interpreter};
use crate::value::Value;

impl Interpreter {
    /// `close(name[, how])`: closes a file, pipe, or coprocess by
    /// name. The two-argument form closes one side of a coprocess
    /// (`"to"` or `"from"`). After a close, a subsequent use of the
    /// same name reopens it.
    pub(super) fn builtin_close(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let Some(first) = args.first() else {
            self.warn("close: missing argument");
            return Ok(Value::Num(-1.0));
        };
        let name = self.builtin_arg(first)?.to_str(&convfmt);

        let status = match args.get(1) {
            Some(expr) => {
                let how = self.builtin_arg(expr)?.to_str(&convfmt);
                match how.to_ascii_lowercase().as_str() {
                    "to" => self.io.close_coproc_side(&name, true),
                    "from" => self.io.close_coproc_side(&name, false),
                    other => {
                        self.warn(format!("close: second argument must be `to` or `from`, not `{}`", other));
                        -1
                    }
                }
            }
            None => self.io.close(&name),
        };
        Ok(Value::Num(f64::from(status)))
    }

    /// `fflush([name])`: with no argument flushes stdout and every
    /// open output target; with an argument flushes that target.
    pub(super) fn builtin_fflush(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        match args.first() {
            None => {
                self.io.fflush_all();
                Ok(Value::Num(0.0))
            }
            Some(expr) => {
                let name = self.builtin_arg(expr)?.to_str(&convfmt);
                Ok(Value::Num(f64::from(self.io.fflush_target(&name))))
            }
        }
    }

    /// `system(cmd)`: runs a shell command to completion and returns
    /// its exit status.
    pub(super) fn builtin_system(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let command = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        if command.is_empty() {
            return Ok(Value::Num(0.0));
        }
        Ok(Value::Num(f64::from(self.io.system(&command))))
    }
}
