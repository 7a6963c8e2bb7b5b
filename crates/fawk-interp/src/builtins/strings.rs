//! String builtins: `length`, `substr`, `index`, `split`, `patsplit`,
//! `sub`, `gsub`, `gensub`, `match`, `sprintf`, `tolower`, `toupper`,
//! `strtonum`.

use fawk_par::{Expr, LValue};

use crate::interp::{Eval, Interpreter};
use crate::value::Value;

impl Interpreter {
    /// `length([s])`: characters of `s` (default `$0`), or element
    /// count for an array argument.
    pub(super) fn builtin_length(&mut self, args: &[Expr]) -> Eval {
        match args.first() {
            None => {
                let ofs = self.specials.ofs.clone();
                let n = self.record.record(&ofs).chars().count();
                Ok(Value::Num(n as f64))
            }
            Some(Expr::Var(name)) if self.env.is_array(name) => {
                let array = self.env.get_array(name).expect("checked is_array");
                let n = array.borrow().len();
                Ok(Value::Num(n as f64))
            }
            Some(expr) => {
                let convfmt = self.specials.convfmt.clone();
                let text = self.builtin_arg(expr)?.to_str(&convfmt);
                Ok(Value::Num(text.chars().count() as f64))
            }
        }
    }

    /// `substr(s, start[, len])`, 1-based, with AWK's out-of-range
    /// arithmetic: a start before 1 eats into the length.
    pub(super) fn builtin_substr(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let text = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        let start = self.builtin_arg_opt(args, 1)?.to_number();
        let length = match args.get(2) {
            Some(expr) => self.builtin_arg(expr)?.to_number(),
            None => f64::INFINITY,
        };

        let mut start = start.trunc();
        let mut length = if length.is_nan() { 0.0 } else { length.trunc() };
        if start < 1.0 {
            length += start - 1.0;
            start = 1.0;
        }
        if length <= 0.0 {
            return Ok(Value::Str(String::new()));
        }

        let skipped = (start - 1.0) as usize;
        let result: String = if length.is_finite() {
            text.chars().skip(skipped).take(length as usize).collect()
        } else {
            text.chars().skip(skipped).collect()
        };
        Ok(Value::Str(result))
    }

    /// `index(s, t)`: 1-based character position of the first
    /// occurrence, or 0. An empty needle finds nothing.
    pub(super) fn builtin_index(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let haystack = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        let needle = self.builtin_arg_opt(args, 1)?.to_str(&convfmt);
        if needle.is_empty() {
            return Ok(Value::Num(0.0));
        }
        let position = match haystack.find(&needle) {
            Some(byte) => haystack[..byte].chars().count() + 1,
            None => 0,
        };
        Ok(Value::Num(position as f64))
    }

    /// `split(s, arr[, sep[, seps]])`: clears `arr`, splits per the FS
    /// rules (default separator is `FS`), stores 1-based parts, and
    /// returns the count. The optional fourth argument collects the
    /// separator texts: `seps[i]` follows part `i`, with leading and
    /// trailing whitespace in `seps[0]` / `seps[n]` in default mode.
    pub(super) fn builtin_split(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let text = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        let Some(array) = self.builtin_array_arg(args, 1, "split")? else {
            return Ok(Value::Num(0.0));
        };
        let seps_array = self.builtin_array_arg(args, 3, "split")?;

        let sep = match args.get(2) {
            Some(Expr::Regex(pattern)) => SplitSep::Regex(pattern.clone()),
            Some(expr) => match self.builtin_arg(expr)? {
                Value::Regex(pattern) => SplitSep::Regex(pattern.to_string()),
                scalar => SplitSep::from_text(scalar.to_str(&convfmt)),
            },
            None => SplitSep::from_text(self.specials.fs.clone()),
        };

        let pieces = self.split_pieces(&text, &sep);
        store_split(&array, &pieces.parts);
        if let Some(seps_array) = seps_array {
            let mut seps_array = seps_array.borrow_mut();
            seps_array.clear();
            if let Some(leading) = &pieces.leading {
                seps_array.insert("0".to_string(), Value::Str(leading.clone()));
            }
            for (i, sep_text) in pieces.separators.iter().enumerate() {
                seps_array.insert((i + 1).to_string(), Value::Str(sep_text.clone()));
            }
            if let Some(trailing) = &pieces.trailing {
                seps_array.insert(pieces.parts.len().to_string(), Value::Str(trailing.clone()));
            }
        }
        Ok(Value::Num(pieces.parts.len() as f64))
    }

    /// Splits `text` into parts plus the separator fragments between
    /// them, per the separator classification.
    fn split_pieces(&mut self, text: &str, sep: &SplitSep) -> SplitPieces {
        let mut pieces = SplitPieces::default();
        if text.is_empty() {
            return pieces;
        }

        match sep {
            SplitSep::Whitespace => {
                let mut rest = text;
                let lead_end = rest.len() - rest.trim_start().len();
                if lead_end > 0 {
                    pieces.leading = Some(rest[..lead_end].to_string());
                    rest = &rest[lead_end..];
                }
                while !rest.is_empty() {
                    let part_end = rest
                        .find(|c: char| c.is_whitespace())
                        .unwrap_or(rest.len());
                    pieces.parts.push(rest[..part_end].to_string());
                    rest = &rest[part_end..];
                    let ws_end = rest.len() - rest.trim_start().len();
                    if ws_end > 0 {
                        let run = rest[..ws_end].to_string();
                        rest = &rest[ws_end..];
                        if rest.is_empty() {
                            pieces.trailing = Some(run);
                        } else {
                            pieces.separators.push(run);
                        }
                    }
                }
            }
            SplitSep::Empty => {
                pieces.parts = text.chars().map(String::from).collect();
                pieces.separators = vec![String::new(); pieces.parts.len().saturating_sub(1)];
            }
            SplitSep::Char(c) => {
                let mut parts: Vec<String> = text.split(*c).map(str::to_string).collect();
                let count = parts.len();
                pieces.separators = vec![c.to_string(); count.saturating_sub(1)];
                pieces.parts.append(&mut parts);
            }
            SplitSep::Regex(pattern) => {
                let Some(regex) = self.compile_pattern(pattern) else {
                    pieces.parts.push(text.to_string());
                    return pieces;
                };
                let mut last = 0usize;
                for m in regex.find_iter(text) {
                    pieces.parts.push(text[last..m.start()].to_string());
                    pieces.separators.push(m.as_str().to_string());
                    last = m.end();
                }
                pieces.parts.push(text[last..].to_string());
            }
        }
        pieces
    }

    /// `patsplit(s, arr, pat[, seps])`: fields are the *matches* of
    /// `pat`; `seps` collects the separating fragments (`seps[0]` is
    /// the text before the first match).
    pub(super) fn builtin_patsplit(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let text = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        let Some(array) = self.builtin_array_arg(args, 1, "patsplit")? else {
            return Ok(Value::Num(0.0));
        };
        let pattern = match args.get(2) {
            Some(expr) => self.builtin_pattern_arg(expr)?,
            None => self.specials.fpat.clone(),
        };
        let seps = self.builtin_array_arg(args, 3, "patsplit")?;

        let Some(regex) = self.compile_pattern(&pattern) else {
            array.borrow_mut().clear();
            return Ok(Value::Num(0.0));
        };

        let mut matches = Vec::new();
        let mut separators = Vec::new();
        let mut last = 0usize;
        for m in regex.find_iter(&text) {
            separators.push(text[last..m.start()].to_string());
            matches.push(m.as_str().to_string());
            last = m.end();
        }
        separators.push(text[last..].to_string());

        store_split(&array, &matches);
        if let Some(seps) = seps {
            let mut seps = seps.borrow_mut();
            seps.clear();
            for (i, sep) in separators.iter().enumerate() {
                seps.insert(i.to_string(), Value::Str(sep.clone()));
            }
        }
        Ok(Value::Num(matches.len() as f64))
    }

    /// `sub`/`gsub(pattern, replacement[, target])`: replaces the
    /// first (or all) match(es) in the target l-value (default `$0`)
    /// and returns the replacement count.
    pub(super) fn builtin_sub_gsub(&mut self, args: &[Expr], global: bool) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let pattern = match args.first() {
            Some(expr) => self.builtin_pattern_arg(expr)?,
            None => return Ok(Value::Num(0.0)),
        };
        let replacement = self.builtin_arg_opt(args, 1)?.to_str(&convfmt);

        let target = match args.get(2) {
            Some(expr) => match expr.as_lvalue() {
                Some(lvalue) => lvalue,
                None => {
                    self.warn("sub/gsub target is not assignable");
                    return Ok(Value::Num(0.0));
                }
            },
            None => LValue::Field(Box::new(Expr::Num(0.0))),
        };

        let Some(regex) = self.compile_pattern(&pattern) else {
            return Ok(Value::Num(0.0));
        };

        let subject = self.read_lvalue(&target)?.to_str(&convfmt);
        let mut result = String::with_capacity(subject.len());
        let mut last = 0usize;
        let mut count = 0usize;
        for m in regex.find_iter(&subject) {
            result.push_str(&subject[last..m.start()]);
            result.push_str(&expand_replacement(&replacement, m.as_str()));
            last = m.end();
            count += 1;
            if !global {
                break;
            }
        }
        result.push_str(&subject[last..]);

        if count > 0 {
            self.assign(&target, Value::Str(result))?;
        }
        Ok(Value::Num(count as f64))
    }

    /// `gensub(pattern, replacement, how[, target])`: returns a new
    /// string; `how` is `"g"`/`"G"` for all occurrences or a positive
    /// occurrence number. `\1`..`\9` reference capture groups.
    pub(super) fn builtin_gensub(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let pattern = match args.first() {
            Some(expr) => self.builtin_pattern_arg(expr)?,
            None => return Ok(Value::Str(String::new())),
        };
        let replacement = self.builtin_arg_opt(args, 1)?.to_str(&convfmt);
        let how = self.builtin_arg_opt(args, 2)?;
        let subject = match args.get(3) {
            Some(expr) => self.builtin_arg(expr)?.to_str(&convfmt),
            None => {
                let ofs = self.specials.ofs.clone();
                self.record.record(&ofs).to_string()
            }
        };

        let Some(regex) = self.compile_pattern(&pattern) else {
            return Ok(Value::Str(subject));
        };

        let how_text = how.to_str(&convfmt);
        let all = how_text.eq_ignore_ascii_case("g");
        let which = if all {
            0
        } else {
            let n = how.to_number().trunc();
            if n < 1.0 {
                self.warn(format!("gensub: invalid `how` value `{}`", how_text));
                1
            } else {
                n as usize
            }
        };

        let mut result = String::with_capacity(subject.len());
        let mut last = 0usize;
        let mut seen = 0usize;
        for caps in regex.captures_iter(&subject) {
            let m = caps.get(0).expect("whole match");
            seen += 1;
            if all || seen == which {
                result.push_str(&subject[last..m.start()]);
                result.push_str(&expand_gensub(&replacement, &caps));
                last = m.end();
            }
        }
        result.push_str(&subject[last..]);
        Ok(Value::Str(result))
    }

    /// `match(s, pattern[, arr])`: sets `RSTART`/`RLENGTH`, fills the
    /// capture array when given, and returns `RSTART`.
    pub(super) fn builtin_match(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let subject = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        let pattern = match args.get(1) {
            Some(expr) => self.builtin_pattern_arg(expr)?,
            None => return Ok(Value::Num(0.0)),
        };
        let capture_array = self.builtin_array_arg(args, 2, "match")?;
        let subsep = self.specials.subsep.clone();

        let Some(regex) = self.compile_pattern(&pattern) else {
            let _ = self.env.set_global("RSTART", Value::Num(0.0));
            let _ = self.env.set_global("RLENGTH", Value::Num(-1.0));
            return Ok(Value::Num(0.0));
        };

        match regex.captures(&subject) {
            Some(caps) => {
                let whole = caps.get(0).expect("whole match");
                let rstart = subject[..whole.start()].chars().count() + 1;
                let rlength = whole.as_str().chars().count();
                let _ = self.env.set_global("RSTART", Value::Num(rstart as f64));
                let _ = self.env.set_global("RLENGTH", Value::Num(rlength as f64));

                if let Some(array) = capture_array {
                    let mut array = array.borrow_mut();
                    array.clear();
                    for (i, group) in caps.iter().enumerate() {
                        let (text, start, length) = match group {
                            Some(g) => (
                                g.as_str().to_string(),
                                subject[..g.start()].chars().count() + 1,
                                g.as_str().chars().count(),
                            ),
                            None => (String::new(), 0, 0),
                        };
                        array.insert(i.to_string(), Value::from_input(&text));
                        array.insert(
                            format!("{}{}start", i, subsep),
                            Value::Num(start as f64),
                        );
                        array.insert(
                            format!("{}{}length", i, subsep),
                            Value::Num(length as f64),
                        );
                    }
                }
                Ok(Value::Num(rstart as f64))
            }
            None => {
                let _ = self.env.set_global("RSTART", Value::Num(0.0));
                let _ = self.env.set_global("RLENGTH", Value::Num(-1.0));
                if let Some(array) = capture_array {
                    array.borrow_mut().clear();
                }
                Ok(Value::Num(0.0))
            }
        }
    }

    /// `sprintf(fmt, ...)`.
    pub(super) fn builtin_sprintf(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let Some((format_expr, rest)) = args.split_first() else {
            return Ok(Value::Str(String::new()));
        };
        let format = self.builtin_arg(format_expr)?.to_str(&convfmt);
        let mut values = Vec::with_capacity(rest.len());
        for arg in rest {
            values.push(self.builtin_arg(arg)?);
        }
        Ok(Value::Str(crate::printf::sprintf(
            &format, &values, &convfmt,
        )))
    }

    /// `tolower`/`toupper`.
    pub(super) fn builtin_case(&mut self, args: &[Expr], upper: bool) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let text = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        Ok(Value::Str(if upper {
            text.to_uppercase()
        } else {
            text.to_lowercase()
        }))
    }

    /// `strtonum(s)`: full numeric prefix including `0x` hex and
    /// leading-zero octal.
    pub(super) fn builtin_strtonum(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let text = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        let trimmed = text.trim_start_matches(|c: char| c.is_ascii_whitespace());
        let (negative, rest) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let magnitude = if rest.len() > 2
            && rest.starts_with('0')
            && matches!(rest.as_bytes()[1], b'x' | b'X')
        {
            crate::value::parse_number_prefix(trimmed)
                .abs()
        } else if rest.len() > 1
            && rest.starts_with('0')
            && rest[1..].bytes().all(|b| (b'0'..=b'7').contains(&b))
        {
            rest[1..]
                .bytes()
                .fold(0.0, |acc, b| acc * 8.0 + f64::from(b - b'0'))
        } else {
            crate::value::parse_number_prefix(rest)
        };
        Ok(Value::Num(if negative { -magnitude } else { magnitude }))
    }
}

/// How a `split` separator behaves, per the FS ladder.
enum SplitSep {
    /// `" "`: whitespace runs, with leading/trailing trimming.
    Whitespace,
    /// `""`: every character becomes a part.
    Empty,
    /// A single literal character.
    Char(char),
    /// A regex separator.
    Regex(String),
}

impl SplitSep {
    fn from_text(sep: String) -> Self {
        if sep == " " {
            return SplitSep::Whitespace;
        }
        let mut chars = sep.chars();
        match (chars.next(), chars.next()) {
            (None, _) => SplitSep::Empty,
            (Some(c), None) => SplitSep::Char(c),
            _ => SplitSep::Regex(sep),
        }
    }
}

/// The output of a separator-collecting split.
#[derive(Default)]
struct SplitPieces {
    parts: Vec<String>,
    /// `separators[i]` sits between `parts[i]` and `parts[i + 1]`.
    separators: Vec<String>,
    /// Whitespace before the first part (default mode only).
    leading: Option<String>,
    /// Whitespace after the last part (default mode only).
    trailing: Option<String>,
}

/// Stores split parts into an array under 1-based keys, classifying
/// each part as a numeric string where it looks numeric.
fn store_split(array: &crate::value::ArrayRef, parts: &[String]) {
    let mut array = array.borrow_mut();
    array.clear();
    for (i, part) in parts.iter().enumerate() {
        array.insert((i + 1).to_string(), Value::from_input(part));
    }
}

/// `sub`/`gsub` replacement expansion: `&` is the whole match, `\&`
/// a literal ampersand, any other `\X` the literal `X`.
fn expand_replacement(replacement: &str, matched: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str(matched),
            '\\' => match chars.next() {
                Some('&') => out.push('&'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            other => out.push(other),
        }
    }
    out
}

/// `gensub` replacement expansion: `\0`..`\9` are capture groups
/// (`\0` and `&` the whole match), `\\&` a literal ampersand.
fn expand_gensub(replacement: &str, caps: &regex::Captures<'_>) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars();
    while let Some(c) = chars.next() {
        match c {
            '&' => {
                if let Some(whole) = caps.get(0) {
                    out.push_str(whole.as_str());
                }
            }
            '\\' => match chars.next() {
                Some(d @ '0'..='9') => {
                    let i = d.to_digit(10).expect("digit") as usize;
                    if let Some(group) = caps.get(i) {
                        out.push_str(group.as_str());
                    }
                }
                Some('&') => out.push('&'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            other => out.push(other),
        }
    }
    out
}

