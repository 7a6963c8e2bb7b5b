//! Time builtins: `systime`, `mktime`, `strftime`.

use chrono::{Local, TimeZone};

use fawk_par::Expr;

use crate::interp::{Eval, Interpreter};
use crate::value::Value;

/// gawk's default `strftime` format.
const DEFAULT_FORMAT: &str = "%a %b %e %H:%M:%S %Z %Y";

impl Interpreter {
    /// `systime()`: seconds since the epoch.
    pub(super) fn builtin_systime(&mut self) -> Eval {
        Ok(Value::Num(chrono::Utc::now().timestamp() as f64))
    }

    /// `mktime("YYYY MM DD HH MM SS [DST]")`: local time to epoch
    /// seconds, -1 on malformed input.
    pub(super) fn builtin_mktime(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let spec = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);

        let parts: Vec<i64> = spec
            .split_ascii_whitespace()
            .map(|part| part.parse::<i64>())
            .collect::<Result<_, _>>()
            .unwrap_or_default();
        if parts.len() < 6 || parts.len() > 7 {
            return Ok(Value::Num(-1.0));
        }

        let (year, month, day, hour, minute, second) = (
            parts[0], parts[1], parts[2], parts[3], parts[4], parts[5],
        );
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Ok(Value::Num(-1.0));
        }

        let timestamp = Local
            .with_ymd_and_hms(
                year as i32,
                month as u32,
                day as u32,
                hour as u32,
                minute as u32,
                second as u32,
            )
            .earliest()
            .map(|dt| dt.timestamp());
        match timestamp {
            Some(t) => Ok(Value::Num(t as f64)),
            None => Ok(Value::Num(-1.0)),
        }
    }

    /// `strftime([format[, timestamp]])`: defaults to the standard
    /// `date`-style format and the current time.
    pub(super) fn builtin_strftime(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let format = match args.first() {
            Some(expr) => self.builtin_arg(expr)?.to_str(&convfmt),
            None => DEFAULT_FORMAT.to_string(),
        };
        let timestamp = match args.get(1) {
            Some(expr) => self.builtin_arg(expr)?.to_number() as i64,
            None => chrono::Utc::now().timestamp(),
        };

        match Local.timestamp_opt(timestamp, 0).earliest() {
            Some(datetime) => Ok(Value::Str(datetime.format(&format).to_string())),
            None => {
                self.warn(format!("strftime: invalid timestamp {}", timestamp));
                Ok(Value::Str(String::new()))
            }
        }
    }
}
