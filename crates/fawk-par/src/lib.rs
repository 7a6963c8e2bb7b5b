//! fawk-par - Recursive-descent parser for AWK programs.
//!
//! The parser consumes the token stream from `fawk-lex` and produces
//! the AST in [`ast`]. The grammar's defining quirks all live here:
//!
//! - **Implicit concatenation**: after an additive expression, any
//!   token that can start a primary begins another concatenated part.
//!   Concatenation binds tighter than comparison, looser than `+`.
//! - **Print redirection**: inside an unparenthesized `print`/`printf`
//!   argument list a top-level `>` is a redirect and `|`/`|&` are pipe
//!   targets, never operators. A restriction flag suppresses those
//!   operators at that level and is lifted inside parentheses.
//! - **Getline**: all eight forms, with `cmd | getline [var]` parsed
//!   at its own precedence level between comparison and concatenation.
//! - **Directives**: `@include` (with cycle suppression over
//!   normalized paths) and `@namespace` (parse-time rewriting of
//!   unqualified identifiers, with the special variables exempt).
//! - **Recovery**: panic-mode; on error the parser syncs to a
//!   statement boundary and keeps going so one run surfaces multiple
//!   diagnostics. The emitted AST stays well-formed via `Expr::Error`.

pub mod ast;
mod edge_cases;
mod expr;
mod program;
mod stmt;

pub use ast::*;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use fawk_lex::{Lexer, SpannedToken, Token};
use fawk_util::{DiagnosticBuilder, Handler, Span};

/// Special variables that are always globally addressable, regardless
/// of the current namespace.
pub const SPECIAL_VARS: &[&str] = &[
    "FS", "RS", "OFS", "ORS", "NR", "NF", "FNR", "FILENAME", "SUBSEP", "CONVFMT", "OFMT", "RSTART",
    "RLENGTH", "IGNORECASE", "RT", "FPAT", "TEXTDOMAIN", "ARGC", "ARGV", "ENVIRON", "SYMTAB",
    "FUNCTAB", "PROCINFO",
];

/// True for the special variables of [`SPECIAL_VARS`].
pub fn is_special_var(name: &str) -> bool {
    SPECIAL_VARS.contains(&name)
}

/// Built-in function names. Calls to these are never
/// namespace-qualified, and user functions may not shadow them.
pub const BUILTIN_FUNCS: &[&str] = &[
    // string
    "length", "substr", "index", "split", "patsplit", "sub", "gsub", "gensub", "match", "sprintf",
    "tolower", "toupper", "strtonum",
    // math
    "sin", "cos", "atan2", "exp", "log", "sqrt", "int", "rand", "srand",
    // array
    "asort", "asorti", "isarray", "typeof",
    // time
    "systime", "mktime", "strftime",
    // bit
    "and", "or", "xor", "compl", "lshift", "rshift",
    // i/o
    "close", "fflush", "system",
    // i18n
    "dcgettext", "dcngettext", "bindtextdomain",
];

/// True for built-in function names.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_FUNCS.contains(&name)
}

/// Parses a complete program, expanding `@include` directives.
///
/// `file` is the path the source was read from, used to resolve
/// relative includes and to label diagnostics; pass `None` for
/// command-line program text. Errors are reported to `handler`; the
/// returned AST is well-formed regardless.
pub fn parse_program(source: &str, file: Option<&Path>, handler: &Handler) -> Program {
    let mut included = HashSet::new();
    if let Some(path) = file {
        if let Ok(normalized) = path.canonicalize() {
            included.insert(normalized);
        }
    }
    let mut program = Program::default();
    parse_into(source, file, handler, &mut included, &mut program);
    program
}

/// Parses one source unit, appending items (and those of any files it
/// includes) to `program`.
fn parse_into(
    source: &str,
    file: Option<&Path>,
    handler: &Handler,
    included: &mut HashSet<PathBuf>,
    program: &mut Program,
) {
    let mut parser = Parser::new(source, file, handler);
    parser.run(included, program);
}

/// Recursive-descent parser over a single source unit.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    handler: &'a Handler,

    /// Current token (one consumed lookahead; the lexer provides one
    /// more token of peek).
    current: SpannedToken,

    /// Source file being parsed, if any.
    file: Option<PathBuf>,

    /// Current namespace; `"awk"` is the global namespace.
    namespace: String,

    /// Parameters of the function currently being parsed. These are
    /// locals and bypass namespace qualification.
    func_params: Vec<String>,

    /// True while parsing a function body (`return` legality).
    in_function: bool,

    /// While true, a top-level `>` is not a comparison and `|`/`|&`
    /// are not getline pipes (unparenthesized print argument lists).
    no_gt: bool,
}

impl<'a> Parser<'a> {
    /// Creates a parser over `source`.
    pub fn new(source: &'a str, file: Option<&Path>, handler: &'a Handler) -> Self {
        let mut lexer = Lexer::new(source, handler);
        let current = lexer.next_token();
        Self {
            lexer,
            handler,
            current,
            file: file.map(Path::to_path_buf),
            namespace: "awk".to_string(),
            func_params: Vec::new(),
            in_function: false,
            no_gt: false,
        }
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    /// Consumes the current token and returns it.
    pub(crate) fn advance(&mut self) -> SpannedToken {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    /// The current token.
    pub(crate) fn current(&self) -> &Token {
        &self.current.token
    }

    /// The current token's span.
    pub(crate) fn current_span(&self) -> Span {
        self.current.span
    }

    /// Peeks one token past the current one.
    pub(crate) fn peek(&mut self) -> &Token {
        &self.lexer.peek_token().token
    }

    /// True if the current token equals `token`.
    pub(crate) fn check(&self, token: &Token) -> bool {
        self.current.token == *token
    }

    /// Consumes the current token if it equals `token`.
    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes `token` or reports an error. Returns whether it
    /// matched.
    pub(crate) fn expect(&mut self, token: &Token) -> bool {
        if self.match_token(token) {
            true
        } else {
            self.error(format!("expected {}, found {}", token, self.current.token));
            false
        }
    }

    /// True at end of input.
    pub(crate) fn at_end(&self) -> bool {
        self.current.token == Token::Eof
    }

    /// Skips newline tokens.
    pub(crate) fn skip_newlines(&mut self) {
        while self.check(&Token::Newline) {
            self.advance();
        }
    }

    /// Skips newline and semicolon tokens (statement terminators).
    pub(crate) fn skip_terminators(&mut self) {
        while matches!(self.current.token, Token::Newline | Token::Semicolon) {
            self.advance();
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics and recovery
    // ------------------------------------------------------------------

    /// Reports a parse error at the current token.
    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let mut builder = DiagnosticBuilder::error(message).span(self.current.span);
        if let Some(file) = &self.file {
            builder = builder.file(file.display().to_string());
        }
        builder.emit(self.handler);
    }

    /// Panic-mode resynchronization: advances to a statement boundary
    /// (newline, `;`, `}`) or the start of a top-level construct.
    pub(crate) fn recover_to_sync(&mut self) {
        loop {
            match self.current.token {
                Token::Eof => return,
                Token::Newline | Token::Semicolon => {
                    self.advance();
                    return;
                }
                Token::RBrace => return,
                Token::Function
                | Token::Begin
                | Token::End
                | Token::BeginFile
                | Token::EndFile
                | Token::If
                | Token::While
                | Token::For
                | Token::Return
                | Token::Print
                | Token::Printf
                | Token::AtInclude => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Namespace qualification
    // ------------------------------------------------------------------

    /// Qualifies a variable or array name with the current namespace.
    ///
    /// Special variables, function parameters, explicitly qualified
    /// names, and everything in the global `awk` namespace pass through
    /// untouched; `awk::name` normalizes to `name`.
    pub(crate) fn qualify(&self, name: &str) -> String {
        if let Some(rest) = name.strip_prefix("awk::") {
            return rest.to_string();
        }
        if name.contains("::")
            || self.namespace == "awk"
            || is_special_var(name)
            || self.func_params.iter().any(|p| p == name)
        {
            return name.to_string();
        }
        format!("{}::{}", self.namespace, name)
    }

    /// The diagnostic handler this parser reports to.
    pub(crate) fn handler(&self) -> &'a Handler {
        self.handler
    }

    /// Directory of the file being parsed, for include resolution.
    pub(crate) fn include_dir(&self) -> Option<&Path> {
        self.file.as_deref().and_then(Path::parent)
    }

    /// Switches the current namespace.
    pub(crate) fn set_namespace(&mut self, namespace: String) {
        self.namespace = namespace;
    }

    /// Qualifies a function name. Built-in names are never qualified.
    pub(crate) fn qualify_func(&self, name: &str) -> String {
        if is_builtin(name) {
            return name.to_string();
        }
        if let Some(rest) = name.strip_prefix("awk::") {
            return rest.to_string();
        }
        if name.contains("::") || self.namespace == "awk" {
            return name.to_string();
        }
        format!("{}::{}", self.namespace, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parses source, asserting no syntax errors.
    pub(crate) fn parse_ok(source: &str) -> Program {
        let handler = Handler::new();
        let program = parse_program(source, None, &handler);
        assert!(
            !handler.has_errors(),
            "unexpected parse errors: {:?}",
            handler.take()
        );
        program
    }

    /// Parses source expecting at least one error.
    pub(crate) fn parse_err(source: &str) -> Program {
        let handler = Handler::new();
        let program = parse_program(source, None, &handler);
        assert!(handler.has_errors(), "expected parse errors for {source:?}");
        program
    }

    #[test]
    fn test_empty_program() {
        let program = parse_ok("");
        assert!(program.items.is_empty());
    }

    #[test]
    fn test_special_var_names() {
        assert!(is_special_var("NF"));
        assert!(is_special_var("PROCINFO"));
        assert!(!is_special_var("nf"));
    }

    #[test]
    fn test_builtin_names() {
        assert!(is_builtin("gsub"));
        assert!(is_builtin("strftime"));
        assert!(!is_builtin("frobnicate"));
    }
}
