//! Built-in functions.
//!
//! One module per family, dispatched by name. Most builtins receive
//! already-evaluated values, but the functions whose semantics demand
//! l-value or whole-array access to particular arguments (`sub`,
//! `gsub`, `split`, `patsplit`, `match`, `asort`, `asorti`) get the
//! argument ASTs and route reads/writes themselves.

mod arrays;
mod i18n;
mod numbers;
mod strings;
mod sysio;
mod time;

pub use i18n::{Catalog, IdentityCatalog};

use fawk_par::Expr;

use crate::interp::{Eval, Interpreter, Unwind};
use crate::value::{ArrayRef, Value};

impl Interpreter {
    /// Dispatches a builtin call.
    pub(crate) fn call_builtin(&mut self, name: &str, args: &[Expr]) -> Eval {
        match name {
            // Strings
            "length" => self.builtin_length(args),
            "substr" => self.builtin_substr(args),
            "index" => self.builtin_index(args),
            "split" => self.builtin_split(args),
            "patsplit" => self.builtin_patsplit(args),
            "sub" => self.builtin_sub_gsub(args, false),
            "gsub" => self.builtin_sub_gsub(args, true),
            "gensub" => self.builtin_gensub(args),
            "match" => self.builtin_match(args),
            "sprintf" => self.builtin_sprintf(args),
            "tolower" => self.builtin_case(args, false),
            "toupper" => self.builtin_case(args, true),
            "strtonum" => self.builtin_strtonum(args),

            // Math
            "sin" | "cos" | "exp" | "log" | "sqrt" | "int" => self.builtin_math1(name, args),
            "atan2" => self.builtin_atan2(args),
            "rand" => self.builtin_rand(),
            "srand" => self.builtin_srand(args),

            // Bit operations
            "and" | "or" | "xor" | "lshift" | "rshift" => self.builtin_bits(name, args),
            "compl" => self.builtin_compl(args),

            // Arrays / types
            "asort" => self.builtin_asort(args, false),
            "asorti" => self.builtin_asort(args, true),
            "isarray" => self.builtin_isarray(args),
            "typeof" => self.builtin_typeof(args),

            // Time
            "systime" => self.builtin_systime(),
            "mktime" => self.builtin_mktime(args),
            "strftime" => self.builtin_strftime(args),

            // I/O
            "close" => self.builtin_close(args),
            "fflush" => self.builtin_fflush(args),
            "system" => self.builtin_system(args),

            // i18n
            "dcgettext" => self.builtin_dcgettext(args),
            "dcngettext" => self.builtin_dcngettext(args),
            "bindtextdomain" => self.builtin_bindtextdomain(args),

            other => {
                self.warn(format!("unknown built-in `{}`", other));
                Ok(Value::Uninit)
            }
        }
    }

    // ------------------------------------------------------------------
    // Shared argument helpers
    // ------------------------------------------------------------------

    /// Evaluates a scalar builtin argument. A regex literal becomes a
    /// first-class regex value (so it can reach the pattern-taking
    /// builtins and `typeof`).
    pub(crate) fn builtin_arg(&mut self, expr: &Expr) -> Eval {
        match expr {
            Expr::Regex(pattern) => Ok(Value::Regex(pattern.clone().into())),
            other => self.eval_scalar(other),
        }
    }

    /// Evaluates an optional argument, defaulting to uninitialized.
    pub(crate) fn builtin_arg_opt(&mut self, args: &[Expr], index: usize) -> Eval {
        match args.get(index) {
            Some(expr) => self.builtin_arg(expr),
            None => Ok(Value::Uninit),
        }
    }

    /// Resolves an argument that must name an array.
    pub(crate) fn builtin_array_arg(
        &mut self,
        args: &[Expr],
        index: usize,
        builtin: &str,
    ) -> Result<Option<ArrayRef>, Unwind> {
        match args.get(index) {
            Some(Expr::Var(name)) => match self.env.get_array(name) {
                Ok(array) => Ok(Some(array)),
                Err(message) => {
                    self.warn(message);
                    Ok(None)
                }
            },
            Some(_) => {
                self.warn(format!("{}: argument {} is not an array", builtin, index + 1));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// The pattern argument of a regex-taking builtin: regex literal
    /// text, a regex value's pattern, or the stringified value.
    pub(crate) fn builtin_pattern_arg(&mut self, expr: &Expr) -> Result<String, Unwind> {
        self.pattern_text(expr)
    }
}
