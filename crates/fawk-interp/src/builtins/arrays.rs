//! Array and type builtins: `asort`, `asorti`, `isarray`, `typeof`.

use fawk_par::Expr;

use crate::interp::{Eval, Interpreter};
use crate::value::Value;

impl Interpreter {
    /// `asort(src[, dst])` sorts values, `asorti(src[, dst])` sorts
    /// indices; the result lands in `dst` (leaving `src` untouched)
    /// or replaces `src`, indexed 1..n. Ordering is the tri-state
    /// comparison with ties broken by string form, so it is total.
    pub(super) fn builtin_asort(&mut self, args: &[Expr], by_index: bool) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let name = if by_index { "asorti" } else { "asort" };
        let Some(source) = self.builtin_array_arg(args, 0, name)? else {
            return Ok(Value::Num(0.0));
        };

        let mut items: Vec<Value> = if by_index {
            source
                .borrow()
                .keys()
                .map(|key| Value::from_input(key))
                .collect()
        } else {
            source.borrow().values().cloned().collect()
        };

        items.sort_by(|a, b| {
            a.compare(b, &convfmt)
                .then_with(|| a.to_str(&convfmt).cmp(&b.to_str(&convfmt)))
        });

        let destination = match args.get(1) {
            Some(_) => match self.builtin_array_arg(args, 1, name)? {
                Some(dst) => dst,
                None => return Ok(Value::Num(0.0)),
            },
            None => source,
        };

        let n = items.len();
        let mut destination = destination.borrow_mut();
        destination.clear();
        for (i, value) in items.into_iter().enumerate() {
            destination.insert((i + 1).to_string(), value);
        }
        Ok(Value::Num(n as f64))
    }

    /// `isarray(x)`.
    pub(super) fn builtin_isarray(&mut self, args: &[Expr]) -> Eval {
        let is_array = match args.first() {
            Some(Expr::Var(name)) => self.env.is_array(name),
            Some(expr) => self.eval(expr)?.is_array(),
            None => false,
        };
        Ok(Value::Num(if is_array { 1.0 } else { 0.0 }))
    }

    /// `typeof(x)`.
    pub(super) fn builtin_typeof(&mut self, args: &[Expr]) -> Eval {
        let name = match args.first() {
            Some(Expr::Var(var)) => self.env.get(var).type_name(),
            Some(expr) => self.builtin_arg(expr)?.type_name(),
            None => Value::Uninit.type_name(),
        };
        Ok(Value::Str(name.to_string()))
    }
}
