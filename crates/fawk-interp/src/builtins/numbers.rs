//! Math and bit-operation builtins.
//!
//! `rand`/`srand` use a self-contained linear congruential generator
//! so runs are reproducible under `srand(n)`. Bit operations work on
//! 53-bit nonnegative integers (the exactly-representable range of
//! the AWK number type), masking results back into that range.

use fawk_par::Expr;

use crate::interp::{Eval, Interpreter};
use crate::value::Value;

/// 2^53 - 1: the largest exactly-representable integer mask.
const BIT_MASK: u64 = (1 << 53) - 1;

/// Knuth's MMIX linear congruential constants.
const LCG_MUL: u64 = 6364136223846793005;
const LCG_ADD: u64 = 1442695040888963407;

impl Interpreter {
    /// One-argument math functions plus `int`.
    pub(super) fn builtin_math1(&mut self, name: &str, args: &[Expr]) -> Eval {
        let x = self.builtin_arg_opt(args, 0)?.to_number();
        let result = match name {
            "sin" => x.sin(),
            "cos" => x.cos(),
            "exp" => x.exp(),
            "log" => x.ln(),
            "sqrt" => x.sqrt(),
            "int" => x.trunc(),
            _ => unreachable!("dispatch"),
        };
        Ok(Value::Num(result))
    }

    /// `atan2(y, x)`.
    pub(super) fn builtin_atan2(&mut self, args: &[Expr]) -> Eval {
        let y = self.builtin_arg_opt(args, 0)?.to_number();
        let x = self.builtin_arg_opt(args, 1)?.to_number();
        Ok(Value::Num(y.atan2(x)))
    }

    /// `rand()`: uniform in [0, 1).
    pub(super) fn builtin_rand(&mut self) -> Eval {
        self.rng_state = self
            .rng_state
            .wrapping_mul(LCG_MUL)
            .wrapping_add(LCG_ADD);
        let bits = self.rng_state >> 11;
        Ok(Value::Num(bits as f64 / (1u64 << 53) as f64))
    }

    /// `srand([seed])`: reseeds (wall clock when no seed is given)
    /// and returns the previous seed.
    pub(super) fn builtin_srand(&mut self, args: &[Expr]) -> Eval {
        let seed = match args.first() {
            Some(expr) => self.builtin_arg(expr)?.to_number(),
            None => chrono::Utc::now().timestamp() as f64,
        };
        let previous = self.rng_prev_seed;
        self.rng_prev_seed = seed;
        self.rng_state = (seed as i64 as u64) ^ LCG_ADD;
        Ok(Value::Num(previous))
    }

    /// Two-argument bit operations.
    pub(super) fn builtin_bits(&mut self, name: &str, args: &[Expr]) -> Eval {
        let a = self.bit_operand(args, 0)?;
        let b = self.bit_operand(args, 1)?;
        let result = match name {
            "and" => a & b,
            "or" => a | b,
            "xor" => a ^ b,
            "lshift" => a.checked_shl(b as u32).unwrap_or(0),
            "rshift" => a.checked_shr(b as u32).unwrap_or(0),
            _ => unreachable!("dispatch"),
        } & BIT_MASK;
        Ok(Value::Num(result as f64))
    }

    /// `compl(x)`: complement within the 53-bit range.
    pub(super) fn builtin_compl(&mut self, args: &[Expr]) -> Eval {
        let x = self.bit_operand(args, 0)?;
        Ok(Value::Num((!x & BIT_MASK) as f64))
    }

    /// Truncates a bit-operation operand; negative operands are
    /// diagnosed and treated as zero.
    fn bit_operand(&mut self, args: &[Expr], index: usize) -> Result<u64, crate::interp::Unwind> {
        let n = self.builtin_arg_opt(args, index)?.to_number().trunc();
        if n < 0.0 {
            self.warn("bit operation on negative value");
            return Ok(0);
        }
        Ok((n as u64) & BIT_MASK)
    }
}
