//! Compiled-regex cache.
//!
//! Dynamic regexes arrive constantly in AWK hot loops (`FS`, match
//! operators with string patterns, `sub`/`gsub`/`split`), so compiled
//! patterns are cached keyed by `(pattern, ignore_case)`. The
//! `ignore_case` bit tracks `IGNORECASE` at the time of the call. On
//! overflow the oldest half of the entries is evicted in bulk; the hit
//! counter is observable so tests can assert that identical lookups
//! compile at most once.

use std::rc::Rc;

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};

/// Default number of cached compiled patterns.
const DEFAULT_CAPACITY: usize = 64;

/// Bounded compiled-pattern cache.
pub struct RegexCache {
    map: IndexMap<(String, bool), Rc<Regex>>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache bounded to `capacity` entries (at least 2).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: IndexMap::new(),
            capacity: capacity.max(2),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the compiled regex for `(pattern, ignore_case)`,
    /// compiling and caching on first use.
    pub fn compile(&mut self, pattern: &str, ignore_case: bool) -> Result<Rc<Regex>, regex::Error> {
        let key = (pattern.to_string(), ignore_case);
        if let Some(regex) = self.map.get(&key) {
            self.hits += 1;
            return Ok(regex.clone());
        }

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()?;
        self.misses += 1;

        if self.map.len() >= self.capacity {
            // Bulk eviction: drop the older half, keep the newer.
            let keep_from = self.map.len() / 2;
            self.map = self.map.split_off(keep_from);
        }

        let regex = Rc::new(regex);
        self.map.insert(key, regex.clone());
        Ok(regex)
    }

    /// Number of lookups served from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of compilations performed.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Current number of cached entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
