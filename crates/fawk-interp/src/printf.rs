//! The printf engine.
//!
//! Parses format strings of the shape `%[flags][width][.precision]conv`
//! and renders arguments C-style. Rust's `format!` has no `%g`, no
//! `%e` with a two-digit signed exponent, and no dynamic `*`
//! width/precision, so the float conversions are built by hand on top
//! of `format!`'s correctly rounded `{:.*}` and `{:.*e}`.
//!
//! Extra arguments are ignored; missing arguments read as zero/empty;
//! `%c` takes the first character of a string or the code point of a
//! number.

use crate::value::Value;

/// Formats `format` with `args`. `convfmt` is used when a `%s`
/// conversion stringifies a fractional number.
pub fn sprintf(format: &str, args: &[Value], convfmt: &str) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    let mut next_arg = 0usize;

    let mut take_arg = |next_arg: &mut usize| -> Value {
        let value = args.get(*next_arg).cloned().unwrap_or(Value::Uninit);
        *next_arg += 1;
        value
    };

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();

        // Flags, each at most once.
        loop {
            match chars.peek() {
                Some('-') => spec.minus = true,
                Some('+') => spec.plus = true,
                Some(' ') => spec.space = true,
                Some('#') => spec.alt = true,
                Some('0') => spec.zero = true,
                _ => break,
            }
            chars.next();
        }

        // Width: literal or `*`.
        if chars.peek() == Some(&'*') {
            chars.next();
            let w = take_arg(&mut next_arg).to_number() as i64;
            if w < 0 {
                // Negative dynamic width means left-justify.
                spec.minus = true;
                spec.width = Some(w.unsigned_abs() as usize);
            } else {
                spec.width = Some(w as usize);
            }
        } else {
            let mut width = 0usize;
            let mut saw = false;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                width = width * 10 + d as usize;
                saw = true;
                chars.next();
            }
            if saw {
                spec.width = Some(width);
            }
        }

        // Precision: `.`, then literal or `*`.
        if chars.peek() == Some(&'.') {
            chars.next();
            if chars.peek() == Some(&'*') {
                chars.next();
                let p = take_arg(&mut next_arg).to_number() as i64;
                spec.precision = Some(p.max(0) as usize);
            } else {
                let mut precision = 0usize;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                    precision = precision * 10 + d as usize;
                    chars.next();
                }
                spec.precision = Some(precision);
            }
        }

        let conv = match chars.next() {
            Some(conv) => conv,
            None => {
                out.push('%');
                break;
            }
        };

        match conv {
            '%' => out.push('%'),
            'd' | 'i' => {
                let n = take_arg(&mut next_arg).to_number();
                out.push_str(&spec.pad_signed_integer(n));
            }
            'o' | 'u' | 'x' | 'X' => {
                let n = take_arg(&mut next_arg).to_number();
                out.push_str(&spec.pad_unsigned_integer(n, conv));
            }
            'e' | 'E' | 'f' | 'F' | 'g' | 'G' => {
                let n = take_arg(&mut next_arg).to_number();
                out.push_str(&spec.pad_float(n, conv));
            }
            'c' => {
                let value = take_arg(&mut next_arg);
                let text = match &value {
                    Value::Str(s) | Value::Strnum(s, _) => {
                        s.chars().next().map(String::from).unwrap_or_default()
                    }
                    Value::Num(n) => char::from_u32(*n as u32)
                        .map(String::from)
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                out.push_str(&spec.pad_string(&text));
            }
            's' => {
                let text = take_arg(&mut next_arg).to_str(convfmt);
                out.push_str(&spec.pad_string(&text));
            }
            other => {
                // Unknown conversion: emit it literally and continue.
                out.push('%');
                out.push(other);
            }
        }
    }

    out
}

/// Formats a single number with a one-conversion format string, for
/// `CONVFMT`/`OFMT` stringification.
pub fn sprintf_number(format: &str, n: f64) -> String {
    sprintf(format, &[Value::Num(n)], "%.6g")
}

/// One parsed conversion specification.
#[derive(Default)]
struct Spec {
    minus: bool,
    plus: bool,
    space: bool,
    alt: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Spec {
    /// `%d` / `%i`.
    fn pad_signed_integer(&self, n: f64) -> String {
        let v = clamp_to_i64(n);
        let digits = v.unsigned_abs().to_string();
        let digits = self.apply_int_precision(digits);
        let sign = if v < 0 {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        };
        // An explicit precision disables the zero flag for integers.
        self.pad_numeric(sign, "", &digits, self.zero && self.precision.is_none())
    }

    /// `%o` / `%u` / `%x` / `%X`: the operand is reinterpreted as the
    /// two's-complement unsigned value, as C does.
    fn pad_unsigned_integer(&self, n: f64, conv: char) -> String {
        let v = clamp_to_i64(n) as u64;
        let digits = match conv {
            'o' => format!("{:o}", v),
            'x' => format!("{:x}", v),
            'X' => format!("{:X}", v),
            _ => format!("{}", v),
        };
        let digits = self.apply_int_precision(digits);
        let prefix = if self.alt && v != 0 {
            match conv {
                'o' if !digits.starts_with('0') => "0",
                'x' => "0x",
                'X' => "0X",
                _ => "",
            }
        } else {
            ""
        };
        self.pad_numeric("", prefix, &digits, self.zero && self.precision.is_none())
    }

    /// Integer precision is a minimum digit count.
    fn apply_int_precision(&self, digits: String) -> String {
        match self.precision {
            Some(p) if digits.len() < p => {
                let mut padded = "0".repeat(p - digits.len());
                padded.push_str(&digits);
                padded
            }
            _ => digits,
        }
    }

    /// `%e E f F g G`.
    fn pad_float(&self, n: f64, conv: char) -> String {
        if n.is_nan() || n.is_infinite() {
            let body = if n.is_nan() {
                "nan".to_string()
            } else if n < 0.0 {
                "-inf".to_string()
            } else {
                "inf".to_string()
            };
            let body = if conv.is_ascii_uppercase() {
                body.to_ascii_uppercase()
            } else {
                body
            };
            return self.pad_string(&body);
        }

        let magnitude = n.abs();
        let body = match conv {
            'f' | 'F' => format_fixed(magnitude, self.precision.unwrap_or(6), self.alt),
            'e' | 'E' => {
                let s = format_exponential(magnitude, self.precision.unwrap_or(6), self.alt);
                if conv == 'E' {
                    s.to_ascii_uppercase()
                } else {
                    s
                }
            }
            _ => {
                let s = format_general(magnitude, self.precision.unwrap_or(6), self.alt);
                if conv == 'G' {
                    s.to_ascii_uppercase()
                } else {
                    s
                }
            }
        };

        let sign = if n.is_sign_negative() {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        };
        // For floats, precision does not disable the zero flag.
        self.pad_numeric(sign, "", &body, self.zero)
    }

    /// `%s` / `%c`. Precision truncates; width pads with spaces.
    fn pad_string(&self, s: &str) -> String {
        let truncated: String = match self.precision {
            Some(p) => s.chars().take(p).collect(),
            None => s.to_string(),
        };
        let width = self.width.unwrap_or(0);
        let len = truncated.chars().count();
        if len >= width {
            return truncated;
        }
        let pad = " ".repeat(width - len);
        if self.minus {
            truncated + &pad
        } else {
            pad + &truncated
        }
    }

    /// Applies sign, prefix, zero/space padding, and justification to
    /// a numeric body.
    fn pad_numeric(&self, sign: &str, prefix: &str, body: &str, zero_pad: bool) -> String {
        let content_len = sign.len() + prefix.len() + body.chars().count();
        let width = self.width.unwrap_or(0);

        if content_len >= width {
            return format!("{}{}{}", sign, prefix, body);
        }
        let fill = width - content_len;

        if self.minus {
            format!("{}{}{}{}", sign, prefix, body, " ".repeat(fill))
        } else if zero_pad {
            // Zero padding goes between the sign/prefix and digits.
            format!("{}{}{}{}", sign, prefix, "0".repeat(fill), body)
        } else {
            format!("{}{}{}{}", " ".repeat(fill), sign, prefix, body)
        }
    }
}

/// Saturating f64 -> i64.
fn clamp_to_i64(n: f64) -> i64 {
    if n.is_nan() {
        0
    } else {
        n as i64
    }
}

/// `%f` body (magnitude only).
fn format_fixed(magnitude: f64, precision: usize, alt: bool) -> String {
    let mut s = format!("{:.*}", precision, magnitude);
    if alt && precision == 0 {
        s.push('.');
    }
    s
}

/// `%e` body with a C-style two-digit signed exponent.
fn format_exponential(magnitude: f64, precision: usize, alt: bool) -> String {
    let raw = format!("{:.*e}", precision, magnitude);
    let (mantissa, exponent) = split_exponent(&raw);
    let mut mantissa = mantissa.to_string();
    if alt && precision == 0 && !mantissa.contains('.') {
        mantissa.push('.');
    }
    format!("{}e{}", mantissa, format_exponent(exponent))
}

/// Renders an exponent as sign plus at least two digits.
fn format_exponent(exponent: i32) -> String {
    if exponent < 0 {
        format!("-{:02}", -exponent)
    } else {
        format!("+{:02}", exponent)
    }
}

/// Splits Rust's `1.5e-3` notation into mantissa text and exponent.
fn split_exponent(s: &str) -> (&str, i32) {
    match s.split_once(['e', 'E']) {
        Some((mantissa, exp)) => (mantissa, exp.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

/// `%g` body: C's rule. With P the precision (1 if given as 0) and X
/// the exponent of the `%e` rendering at precision P-1: use `%f` with
/// precision P-1-X when -4 <= X < P, else `%e` with precision P-1.
/// Trailing zeros are stripped unless `#`.
fn format_general(magnitude: f64, precision: usize, alt: bool) -> String {
    let p = precision.max(1);
    let raw = format!("{:.*e}", p - 1, magnitude);
    let (_, exponent) = split_exponent(&raw);

    if exponent >= -4 && (exponent as i64) < p as i64 {
        let fixed_precision = (p as i64 - 1 - exponent as i64).max(0) as usize;
        let s = format!("{:.*}", fixed_precision, magnitude);
        if alt {
            s
        } else {
            strip_trailing_zeros(&s)
        }
    } else {
        let (mantissa, exponent) = split_exponent(&raw);
        let mantissa = if alt {
            mantissa.to_string()
        } else {
            strip_trailing_zeros(mantissa)
        };
        format!("{}e{}", mantissa, format_exponent(exponent))
    }
}

/// Removes trailing fractional zeros (and a bare trailing point).
fn strip_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    trimmed.trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(format: &str, args: &[Value]) -> String {
        sprintf(format, args, "%.6g")
    }

    #[test]
    fn test_plain_text_and_percent() {
        assert_eq!(fmt("hello", &[]), "hello");
        assert_eq!(fmt("100%%", &[]), "100%");
    }

    #[test]
    fn test_decimal() {
        assert_eq!(fmt("%d", &[Value::Num(42.0)]), "42");
        assert_eq!(fmt("%d", &[Value::Num(-42.0)]), "-42");
        assert_eq!(fmt("%d", &[Value::Num(3.9)]), "3");
        assert_eq!(fmt("%5d", &[Value::Num(42.0)]), "   42");
        assert_eq!(fmt("%-5d|", &[Value::Num(42.0)]), "42   |");
        assert_eq!(fmt("%05d", &[Value::Num(42.0)]), "00042");
        assert_eq!(fmt("%05d", &[Value::Num(-42.0)]), "-0042");
        assert_eq!(fmt("%+d", &[Value::Num(42.0)]), "+42");
        assert_eq!(fmt("% d", &[Value::Num(42.0)]), " 42");
        assert_eq!(fmt("%.4d", &[Value::Num(42.0)]), "0042");
    }

    #[test]
    fn test_unsigned_and_bases() {
        assert_eq!(fmt("%x", &[Value::Num(255.0)]), "ff");
        assert_eq!(fmt("%X", &[Value::Num(255.0)]), "FF");
        assert_eq!(fmt("%#x", &[Value::Num(255.0)]), "0xff");
        assert_eq!(fmt("%o", &[Value::Num(8.0)]), "10");
        assert_eq!(fmt("%#o", &[Value::Num(8.0)]), "010");
        assert_eq!(fmt("%u", &[Value::Num(7.0)]), "7");
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(fmt("%s", &[Value::Str("abc".into())]), "abc");
        assert_eq!(fmt("%5s", &[Value::Str("ab".into())]), "   ab");
        assert_eq!(fmt("%-5s|", &[Value::Str("ab".into())]), "ab   |");
        assert_eq!(fmt("%.2s", &[Value::Str("abcdef".into())]), "ab");
        // Numbers stringify; integral values print as integers.
        assert_eq!(fmt("%s", &[Value::Num(3.0)]), "3");
    }

    #[test]
    fn test_char_conversion() {
        assert_eq!(fmt("%c", &[Value::Str("abc".into())]), "a");
        assert_eq!(fmt("%c", &[Value::Num(65.0)]), "A");
        assert_eq!(fmt("%c", &[Value::Str(String::new())]), "");
    }

    #[test]
    fn test_fixed_float() {
        assert_eq!(fmt("%f", &[Value::Num(3.5)]), "3.500000");
        assert_eq!(fmt("%.2f", &[Value::Num(3.14159)]), "3.14");
        assert_eq!(fmt("%.0f", &[Value::Num(2.5)]), "2");
        assert_eq!(fmt("%8.2f", &[Value::Num(-3.5)]), "   -3.50");
        assert_eq!(fmt("%08.2f", &[Value::Num(-3.5)]), "-0003.50");
    }

    #[test]
    fn test_exponential() {
        assert_eq!(fmt("%e", &[Value::Num(31400.0)]), "3.140000e+04");
        assert_eq!(fmt("%.2e", &[Value::Num(0.0314)]), "3.14e-02");
        assert_eq!(fmt("%E", &[Value::Num(31400.0)]), "3.140000E+04");
        assert_eq!(fmt("%.0e", &[Value::Num(5.0)]), "5e+00");
    }

    #[test]
    fn test_general_float() {
        assert_eq!(fmt("%g", &[Value::Num(100000.0)]), "100000");
        assert_eq!(fmt("%g", &[Value::Num(1000000.0)]), "1e+06");
        assert_eq!(fmt("%g", &[Value::Num(0.0001)]), "0.0001");
        assert_eq!(fmt("%g", &[Value::Num(0.00001)]), "1e-05");
        assert_eq!(fmt("%g", &[Value::Num(0.5)]), "0.5");
        assert_eq!(fmt("%g", &[Value::Num(0.0)]), "0");
        assert_eq!(fmt("%.3g", &[Value::Num(3.14159)]), "3.14");
        assert_eq!(fmt("%G", &[Value::Num(0.00001)]), "1E-05");
    }

    #[test]
    fn test_dynamic_width_and_precision() {
        assert_eq!(
            fmt(
                "[%*.*f]",
                &[Value::Num(10.0), Value::Num(2.0), Value::Num(3.14159)]
            ),
            "[      3.14]"
        );
        // Negative dynamic width left-justifies.
        assert_eq!(
            fmt("[%*d]", &[Value::Num(-4.0), Value::Num(7.0)]),
            "[7   ]"
        );
    }

    #[test]
    fn test_missing_and_extra_args() {
        assert_eq!(fmt("%d-%s", &[]), "0-");
        assert_eq!(fmt("%d", &[Value::Num(1.0), Value::Num(2.0)]), "1");
    }

    #[test]
    fn test_sprintf_number() {
        assert_eq!(sprintf_number("%.6g", 0.3333333333), "0.333333");
        assert_eq!(sprintf_number("%.2f", 1.005), "1.00");
    }
}
