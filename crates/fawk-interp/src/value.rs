//! The AWK value model.
//!
//! A value is one of six states. The tri-state between `Num`, `Str`,
//! and `Strnum` is the heart of AWK semantics: a *numeric string* is
//! text that arrived from a field, `getline`, `ARGV`, or a `-v`
//! assignment and looks numeric; it compares numerically against
//! numeric operands and as a string otherwise. Collapsing it into
//! either plain state breaks programs, so it is kept distinct.
//!
//! Conversions never fail: anything unparseable is 0 or the empty
//! string. Array-in-scalar misuse is diagnosed at the operation site
//! by the interpreter, not here.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

/// Scalar/array misuse. Value conversions never fail; these arise
/// only at the operation sites that demand one kind or the other,
/// where they are reported as diagnostics and execution continues.
#[derive(Debug, Error)]
pub enum TypeError {
    #[error("can't use scalar `{0}` as array")]
    ScalarAsArray(String),

    #[error("can't assign scalar to array `{0}`")]
    ArrayAsScalar(String),
}

/// Shared associative array storage.
///
/// Arrays are reference-counted so that passing one to a function
/// aliases it (callee mutations are visible to the caller) and so the
/// reflection views can hand out the same container.
pub type ArrayRef = Rc<RefCell<IndexMap<String, Value>>>;

/// Creates a fresh empty array.
pub fn new_array() -> ArrayRef {
    Rc::new(RefCell::new(IndexMap::new()))
}

/// A dynamically typed AWK value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Unset: acts as `""` or `0` and compares as numeric kind.
    Uninit,

    /// A number. AWK has a single numeric type, the IEEE double.
    Num(f64),

    /// A string produced by program text or string operations.
    Str(String),

    /// A numeric string: input text that looks numeric, carrying its
    /// parsed value.
    Strnum(String, f64),

    /// A regex literal captured as a value, for passing regex
    /// expressions to functions.
    Regex(Rc<str>),

    /// An associative array. Not a scalar: it cannot be coerced,
    /// returned from a function, or used in arithmetic.
    Array(ArrayRef),
}

impl Value {
    /// Classifies input text (field, `getline`, `ARGV`, `-v`): a
    /// numeric-looking string becomes a `Strnum`.
    pub fn from_input(text: &str) -> Value {
        match looks_numeric(text) {
            Some(n) => Value::Strnum(text.to_string(), n),
            None => Value::Str(text.to_string()),
        }
    }

    /// True for the numeric-kind states (`Num`, `Strnum`, `Uninit`)
    /// that force numeric comparison.
    pub fn is_numeric_kind(&self) -> bool {
        matches!(self, Value::Num(_) | Value::Strnum(_, _) | Value::Uninit)
    }

    /// True if this value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Numeric conversion. Never fails; unparseable text is 0.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Uninit => 0.0,
            Value::Num(n) => *n,
            Value::Strnum(_, n) => *n,
            Value::Str(s) => parse_number_prefix(s),
            Value::Regex(_) => 0.0,
            Value::Array(_) => 0.0,
        }
    }

    /// String conversion using `CONVFMT` for fractional numbers.
    pub fn to_str(&self, convfmt: &str) -> String {
        match self {
            Value::Uninit => String::new(),
            Value::Num(n) => format_number(*n, convfmt),
            Value::Str(s) => s.clone(),
            Value::Strnum(s, _) => s.clone(),
            Value::Regex(pattern) => pattern.to_string(),
            Value::Array(_) => String::new(),
        }
    }

    /// String conversion for `print`, which uses `OFMT` instead of
    /// `CONVFMT`.
    pub fn to_output_str(&self, ofmt: &str) -> String {
        match self {
            Value::Num(n) => format_number(*n, ofmt),
            other => other.to_str(ofmt),
        }
    }

    /// Truth value: nonzero number, non-empty plain string, or a
    /// numeric string with nonzero value.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Uninit => false,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Strnum(_, n) => *n != 0.0,
            Value::Regex(_) => false,
            Value::Array(array) => !array.borrow().is_empty(),
        }
    }

    /// The tri-state comparison: numeric when both operands are
    /// numeric kind, string otherwise.
    pub fn compare(&self, other: &Value, convfmt: &str) -> Ordering {
        if self.is_numeric_kind() && other.is_numeric_kind() {
            let a = self.to_number();
            let b = other.to_number();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        } else {
            self.to_str(convfmt).cmp(&other.to_str(convfmt))
        }
    }

    /// `typeof()` classification.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Uninit => "unassigned",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Strnum(_, _) => "strnum",
            Value::Regex(_) => "regexp",
            Value::Array(_) => "array",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Uninit
    }
}

/// Formats a number the way AWK does: integral values print as
/// integer literals, anything else goes through the conversion format
/// (`CONVFMT`/`OFMT`).
pub fn format_number(n: f64, convfmt: &str) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if n == n.trunc() && n.abs() < 1e16 {
        return format!("{}", n as i64);
    }
    crate::printf::sprintf_number(convfmt, n)
}

/// The numeric-string grammar:
/// `[ws]? [+-]? digits (. digits?)? ([eE] [+-]? digits)? [ws]?`
/// as a complete match. Returns the parsed value on acceptance.
pub fn looks_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim_matches(|c: char| c.is_ascii_whitespace());
    if trimmed.is_empty() {
        return None;
    }

    let bytes = trimmed.as_bytes();
    let mut i = 0;

    if matches!(bytes[i], b'+' | b'-') {
        i += 1;
    }

    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }

    if i != bytes.len() {
        return None;
    }

    trimmed.parse::<f64>().ok()
}

/// AWK's string-to-number rule: skip leading whitespace, optional
/// sign, then the longest numeric prefix. `0x` hex is accepted.
/// Failure is 0, never an error.
pub fn parse_number_prefix(s: &str) -> f64 {
    let trimmed = s.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let magnitude = if rest.len() > 2
        && rest.starts_with('0')
        && matches!(rest.as_bytes()[1], b'x' | b'X')
    {
        let hex = &rest[2..];
        let end = hex
            .bytes()
            .position(|b| !b.is_ascii_hexdigit())
            .unwrap_or(hex.len());
        if end == 0 {
            0.0
        } else {
            hex[..end]
                .bytes()
                .fold(0.0, |acc, b| acc * 16.0 + f64::from(hex_digit(b)))
        }
    } else {
        decimal_prefix(rest)
    };

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

fn hex_digit(b: u8) -> u32 {
    (b as char).to_digit(16).unwrap_or(0)
}

/// Longest decimal/scientific prefix of `s`, or 0.
fn decimal_prefix(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut saw_digit = false;

    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        saw_digit = true;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            saw_digit = true;
        }
    }
    if !saw_digit {
        return 0.0;
    }

    // Exponent only counts if at least one digit follows.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(0.0)
}

/// Joins stringified indices with `SUBSEP` to form an array key.
pub fn make_array_key(indices: &[Value], subsep: &str, convfmt: &str) -> String {
    indices
        .iter()
        .map(|v| v.to_str(convfmt))
        .collect::<Vec<_>>()
        .join(subsep)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FMT: &str = "%.6g";

    #[test]
    fn test_uninit_acts_as_zero_and_empty() {
        let v = Value::Uninit;
        assert_eq!(v.to_number(), 0.0);
        assert_eq!(v.to_str(FMT), "");
        assert!(!v.to_bool());
    }

    #[test]
    fn test_integer_formatting() {
        assert_eq!(Value::Num(42.0).to_str(FMT), "42");
        assert_eq!(Value::Num(-7.0).to_str(FMT), "-7");
        assert_eq!(Value::Num(0.0).to_str(FMT), "0");
        assert_eq!(Value::Num(1e15).to_str(FMT), "1000000000000000");
    }

    #[test]
    fn test_fractional_formatting_uses_convfmt() {
        assert_eq!(Value::Num(0.5).to_str(FMT), "0.5");
        assert_eq!(Value::Num(1.0 / 3.0).to_str(FMT), "0.333333");
        assert_eq!(Value::Num(3.25).to_str("%.2f"), "3.25");
    }

    #[test]
    fn test_nonfinite_formatting() {
        assert_eq!(Value::Num(f64::INFINITY).to_str(FMT), "inf");
        assert_eq!(Value::Num(f64::NEG_INFINITY).to_str(FMT), "-inf");
        assert_eq!(Value::Num(f64::NAN).to_str(FMT), "nan");
    }

    #[test]
    fn test_looks_numeric_accepts() {
        assert_eq!(looks_numeric("42"), Some(42.0));
        assert_eq!(looks_numeric("-3.5"), Some(-3.5));
        assert_eq!(looks_numeric("+7"), Some(7.0));
        assert_eq!(looks_numeric(" 10 "), Some(10.0));
        assert_eq!(looks_numeric("1e3"), Some(1000.0));
        assert_eq!(looks_numeric("2.5E-1"), Some(0.25));
        assert_eq!(looks_numeric("3."), Some(3.0));
    }

    #[test]
    fn test_looks_numeric_rejects() {
        assert_eq!(looks_numeric(""), None);
        assert_eq!(looks_numeric("  "), None);
        assert_eq!(looks_numeric("abc"), None);
        assert_eq!(looks_numeric("12abc"), None);
        assert_eq!(looks_numeric("1e"), None);
        assert_eq!(looks_numeric("."), None);
        assert_eq!(looks_numeric(".5"), None);
        assert_eq!(looks_numeric("0x10"), None);
        assert_eq!(looks_numeric("1 2"), None);
    }

    #[test]
    fn test_from_input_classification() {
        assert!(matches!(Value::from_input("10"), Value::Strnum(_, n) if n == 10.0));
        assert!(matches!(Value::from_input("ten"), Value::Str(_)));
        assert!(matches!(Value::from_input(""), Value::Str(_)));
    }

    #[test]
    fn test_parse_number_prefix() {
        assert_eq!(parse_number_prefix("42abc"), 42.0);
        assert_eq!(parse_number_prefix("  -3.5xyz"), -3.5);
        assert_eq!(parse_number_prefix("0x1Fzz"), 31.0);
        assert_eq!(parse_number_prefix("1e2end"), 100.0);
        assert_eq!(parse_number_prefix("1e"), 1.0);
        assert_eq!(parse_number_prefix("nope"), 0.0);
        assert_eq!(parse_number_prefix(""), 0.0);
    }

    #[test]
    fn test_strnum_numeric_comparison() {
        // A field value "10" compares numerically with 9.
        let field = Value::from_input("10");
        assert_eq!(field.compare(&Value::Num(9.0), FMT), Ordering::Greater);
        // A plain string "10" compares as text: "10" < "9".
        let string = Value::Str("10".into());
        assert_eq!(string.compare(&Value::Num(9.0), FMT), Ordering::Less);
    }

    #[test]
    fn test_strnum_vs_strnum_numeric() {
        let a = Value::from_input(" 10");
        let b = Value::from_input("9");
        assert_eq!(a.compare(&b, FMT), Ordering::Greater);
    }

    #[test]
    fn test_uninit_compares_as_numeric() {
        assert_eq!(Value::Uninit.compare(&Value::Num(0.0), FMT), Ordering::Equal);
        assert_eq!(
            Value::Uninit.compare(&Value::Num(-1.0), FMT),
            Ordering::Greater
        );
    }

    #[test]
    fn test_comparison_symmetry() {
        let values = [
            Value::Uninit,
            Value::Num(3.0),
            Value::Str("3".into()),
            Value::from_input("3"),
            Value::Str("abc".into()),
        ];
        for a in &values {
            for b in &values {
                assert_eq!(a.compare(b, FMT), b.compare(a, FMT).reverse());
            }
        }
    }

    #[test]
    fn test_to_bool_tristate() {
        assert!(Value::Num(1.0).to_bool());
        assert!(!Value::Num(0.0).to_bool());
        // Non-empty plain string is true, even "0".
        assert!(Value::Str("0".into()).to_bool());
        // Numeric string "0" is false.
        assert!(!Value::from_input("0").to_bool());
        assert!(Value::from_input("2").to_bool());
    }

    #[test]
    fn test_make_array_key() {
        let key = make_array_key(
            &[Value::Num(1.0), Value::Str("x".into())],
            "\u{1C}",
            FMT,
        );
        assert_eq!(key, "1\u{1C}x");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Uninit.type_name(), "unassigned");
        assert_eq!(Value::Num(1.0).type_name(), "number");
        assert_eq!(Value::from_input("1").type_name(), "strnum");
        assert_eq!(Value::Array(new_array()).type_name(), "array");
    }

    #[test]
    fn test_array_aliasing() {
        let array = new_array();
        let alias = Value::Array(array.clone());
        array
            .borrow_mut()
            .insert("k".to_string(), Value::Num(1.0));
        match alias {
            Value::Array(inner) => {
                assert_eq!(inner.borrow().get("k").unwrap().to_number(), 1.0);
            }
            _ => unreachable!(),
        }
    }
}
