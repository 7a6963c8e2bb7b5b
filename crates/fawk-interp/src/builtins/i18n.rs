//! i18n builtins: `dcgettext`, `dcngettext`, `bindtextdomain`.
//!
//! Message-catalog loading (`.mo` parsing) is an external concern;
//! the interpreter goes through the pluggable [`Catalog`] hook, whose
//! default implementation translates nothing. `TEXTDOMAIN` supplies
//! the default domain.

use fawk_par::Expr;

use crate::interp::{Eval, Interpreter};
use crate::value::Value;

/// Default `bindtextdomain` directory when a domain has no binding.
const DEFAULT_LOCALE_DIR: &str = "/usr/share/locale";

/// A message catalog. Implementations translate message ids per
/// domain and locale category; returning `None` falls back to the
/// untranslated text.
pub trait Catalog {
    /// Translates `msgid` in `domain` under `category`.
    fn lookup(&self, domain: &str, category: &str, msgid: &str) -> Option<String>;

    /// Translates a singular/plural pair for quantity `n`.
    fn lookup_plural(
        &self,
        domain: &str,
        category: &str,
        msgid: &str,
        msgid_plural: &str,
        n: f64,
    ) -> Option<String>;
}

/// The default catalog: translates nothing.
pub struct IdentityCatalog;

impl Catalog for IdentityCatalog {
    fn lookup(&self, _domain: &str, _category: &str, _msgid: &str) -> Option<String> {
        None
    }

    fn lookup_plural(
        &self,
        _domain: &str,
        _category: &str,
        _msgid: &str,
        _msgid_plural: &str,
        _n: f64,
    ) -> Option<String> {
        None
    }
}

impl Interpreter {
    /// `dcgettext(string[, domain[, category]])`.
    pub(super) fn builtin_dcgettext(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let msgid = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        let domain = match args.get(1) {
            Some(expr) => self.builtin_arg(expr)?.to_str(&convfmt),
            None => self.specials.textdomain.clone(),
        };
        let category = match args.get(2) {
            Some(expr) => self.builtin_arg(expr)?.to_str(&convfmt),
            None => "LC_MESSAGES".to_string(),
        };

        let translated = self
            .catalog
            .lookup(&domain, &category, &msgid)
            .unwrap_or(msgid);
        Ok(Value::Str(translated))
    }

    /// `dcngettext(singular, plural, count[, domain[, category]])`.
    pub(super) fn builtin_dcngettext(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let singular = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        let plural = self.builtin_arg_opt(args, 1)?.to_str(&convfmt);
        let count = self.builtin_arg_opt(args, 2)?.to_number();
        let domain = match args.get(3) {
            Some(expr) => self.builtin_arg(expr)?.to_str(&convfmt),
            None => self.specials.textdomain.clone(),
        };
        let category = match args.get(4) {
            Some(expr) => self.builtin_arg(expr)?.to_str(&convfmt),
            None => "LC_MESSAGES".to_string(),
        };

        let translated = self
            .catalog
            .lookup_plural(&domain, &category, &singular, &plural, count)
            .unwrap_or(if count == 1.0 { singular } else { plural });
        Ok(Value::Str(translated))
    }

    /// `bindtextdomain(directory[, domain])`: binds (or with an empty
    /// directory, queries) the catalog directory for a domain.
    pub(super) fn builtin_bindtextdomain(&mut self, args: &[Expr]) -> Eval {
        let convfmt = self.specials.convfmt.clone();
        let directory = self.builtin_arg_opt(args, 0)?.to_str(&convfmt);
        let domain = match args.get(1) {
            Some(expr) => self.builtin_arg(expr)?.to_str(&convfmt),
            None => self.specials.textdomain.clone(),
        };

        if directory.is_empty() {
            let bound = self
                .domain_dirs
                .get(&domain)
                .cloned()
                .unwrap_or_else(|| DEFAULT_LOCALE_DIR.to_string());
            return Ok(Value::Str(bound));
        }
        self.domain_dirs.insert(domain, directory.clone());
        Ok(Value::Str(directory))
    }
}
