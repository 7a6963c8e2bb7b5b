//! The record/field machine.
//!
//! Owns `$0` and the 1-indexed field vector, keeping the two mutually
//! consistent: mutating any `$i` marks `$0` stale, and a stale `$0`
//! rebuilds lazily from the fields joined by `OFS`. Assigning `$0`
//! re-splits eagerly under the current splitting rules.
//!
//! Field splitting ladder, checked in order: `FPAT` matches win; the
//! default `FS == " "` splits on whitespace runs with trimming; a
//! single-character `FS` splits literally (adjacent separators keep
//! empty fields); anything else is a regex separator. In paragraph
//! mode (`RS == ""`) a newline always separates fields in addition to
//! `FS`.

use crate::environ::Specials;
use crate::recache::RegexCache;

/// `$0` plus fields, with lazy rebuild.
#[derive(Default)]
pub struct RecordState {
    record: String,
    fields: Vec<String>,
    /// True when a field write invalidated `record`.
    stale: bool,
}

impl RecordState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly read (or assigned) record and its fields.
    pub fn load(&mut self, record: String, fields: Vec<String>) {
        self.record = record;
        self.fields = fields;
        self.stale = false;
    }

    /// Number of fields.
    pub fn nf(&self) -> usize {
        self.fields.len()
    }

    /// Reads `$0`, rebuilding from the fields when stale.
    pub fn record(&mut self, ofs: &str) -> &str {
        if self.stale {
            self.record = self.fields.join(ofs);
            self.stale = false;
        }
        &self.record
    }

    /// Reads field `i` (1-based). Out-of-range fields read as empty.
    pub fn field(&self, i: usize) -> &str {
        debug_assert!(i >= 1);
        self.fields.get(i - 1).map(String::as_str).unwrap_or("")
    }

    /// Writes field `i` (1-based), materializing empty intermediate
    /// fields when assigning beyond `NF`. Marks `$0` stale.
    pub fn set_field(&mut self, i: usize, value: String) {
        debug_assert!(i >= 1);
        if self.fields.len() < i {
            self.fields.resize(i, String::new());
        }
        self.fields[i - 1] = value;
        self.stale = true;
    }

    /// Sets `NF` directly: a smaller value truncates, a larger one
    /// materializes empty fields. Marks `$0` stale.
    pub fn set_nf(&mut self, n: usize) {
        self.fields.resize(n, String::new());
        self.stale = true;
    }
}

/// Splits a record into fields per the current `FPAT`/`FS` rules.
/// `paragraph` is true when `RS == ""`. Regex-compile failures are
/// reported through `report` and leave the whole record as one field.
pub fn split_record(
    record: &str,
    specials: &Specials,
    cache: &mut RegexCache,
    paragraph: bool,
    report: &mut dyn FnMut(String),
) -> Vec<String> {
    if !specials.fpat.is_empty() {
        return match cache.compile(&specials.fpat, specials.ignore_case) {
            Ok(regex) => regex
                .find_iter(record)
                .map(|m| m.as_str().to_string())
                .collect(),
            Err(err) => {
                report(format!("invalid FPAT `{}`: {}", specials.fpat, err));
                vec![record.to_string()]
            }
        };
    }

    if record.is_empty() {
        return Vec::new();
    }

    let fs = specials.fs.as_str();

    if fs == " " {
        // Default mode: split on whitespace runs, leading/trailing
        // whitespace trimmed. Newlines count, which also covers
        // paragraph mode.
        return record
            .split_ascii_whitespace()
            .map(str::to_string)
            .collect();
    }

    if fs.chars().count() == 1 && !paragraph {
        let sep = fs.chars().next().expect("single char");
        return record.split(sep).map(str::to_string).collect();
    }

    // Regex separator. A single-character FS in paragraph mode also
    // lands here so the newline alternative applies.
    let mut pattern = if fs.chars().count() == 1 {
        regex::escape(fs)
    } else {
        fs.to_string()
    };
    if paragraph {
        pattern = format!("{}|\n", pattern);
    }

    match cache.compile(&pattern, specials.ignore_case) {
        Ok(regex) => regex.split(record).map(str::to_string).collect(),
        Err(err) => {
            report(format!("invalid FS `{}`: {}", fs, err));
            vec![record.to_string()]
        }
    }
}
