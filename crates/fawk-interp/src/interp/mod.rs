//! The tree-walking interpreter.
//!
//! One `Interpreter` value owns all mutable execution state: the
//! variable environment, the record/field machine, the special-variable
//! cache, the regex cache, and the I/O tables. There are no globals;
//! everything threads through `&mut self`.
//!
//! Control-flow unwinds (`break`, `continue`, `next`, `nextfile`,
//! `return`, `exit`) are ordinary `Result` errors carrying an
//! [`Unwind`] payload, propagated with `?` and consumed at the
//! statically correct catcher: loops catch `Break`/`Continue`, the
//! record loop catches `Next`, the file loop catches `NextFile`, the
//! function-call site catches `Return`, and the driver catches `Exit`.

mod expr;
mod stmt;

use std::io::{Read, Write};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use fawk_par::{Item, Pattern, Program, Rule};

use crate::builtins::Catalog;
use crate::environ::{Environment, Specials};
use crate::io::{InputSource, IoManager, RecordSep};
use crate::recache::RegexCache;
use crate::record::{split_record, RecordState};
use crate::value::Value;

/// A non-local control transfer in flight.
#[derive(Debug, Clone)]
pub enum Unwind {
    /// `break` - caught by the innermost loop or switch.
    Break,
    /// `continue` - caught by the innermost loop.
    Continue,
    /// `next` - caught by the record loop.
    Next,
    /// `nextfile` - caught by the file loop.
    NextFile,
    /// `return [value]` - caught by the function-call site.
    Return(Value),
    /// `exit [status]` - caught by the driver.
    Exit(i32),
}

/// Statement outcome.
pub type Exec = Result<(), Unwind>;

/// Expression outcome.
pub type Eval = Result<Value, Unwind>;

/// Maximum user-function call depth before the interpreter refuses to
/// recurse further (keeps runaway recursion from exhausting the
/// process stack).
pub(crate) const MAX_CALL_DEPTH: usize = 1000;

/// Main-input state: the current source plus the `ARGV` scan cursor.
struct MainState {
    source: Option<InputSource>,
    /// Next `ARGV` index to examine.
    argv_index: usize,
    /// Whether any file operand has been consumed.
    consumed_file: bool,
    /// Whether stdin has been used as the sole input.
    stdin_taken: bool,
    /// Injectable stdin (tests pass a cursor); `None` means the
    /// process stdin.
    stdin: Option<Box<dyn Read>>,
}

impl MainState {
    fn new() -> Self {
        Self {
            source: None,
            argv_index: 1,
            consumed_file: false,
            stdin_taken: false,
            stdin: None,
        }
    }
}

/// The interpreter instance.
pub struct Interpreter {
    program: Rc<Program>,
    pub(crate) env: Environment,
    pub(crate) record: RecordState,
    pub(crate) specials: Specials,
    pub(crate) cache: RegexCache,
    pub(crate) io: IoManager,

    /// Per-rule activation state for range patterns, indexed by item
    /// position.
    range_active: Vec<bool>,

    /// Linear-congruential state for `rand`, plus the previous seed
    /// that `srand` returns.
    pub(crate) rng_state: u64,
    pub(crate) rng_prev_seed: f64,

    /// Message-catalog hook for the i18n builtins.
    pub(crate) catalog: Box<dyn Catalog>,
    /// `bindtextdomain` bindings: domain -> directory.
    pub(crate) domain_dirs: FxHashMap<String, String>,

    main: MainState,
    pub(crate) call_depth: usize,

    /// Exit status from non-fatal runtime failures (missing input
    /// files), reported when the program does not `exit` explicitly.
    error_status: i32,
}

impl Interpreter {
    /// Creates an interpreter for a parsed program, writing to the
    /// process stdout/stderr until the streams are replaced.
    pub fn new(program: Program) -> Self {
        let mut env = Environment::new();
        for function in program.functions() {
            env.define_function(function.clone());
        }
        let range_active = vec![false; program.items.len()];
        let specials = Specials::from_env(&env);

        Self {
            program: Rc::new(program),
            env,
            record: RecordState::new(),
            specials,
            cache: RegexCache::new(),
            io: IoManager::new(
                Box::new(std::io::stdout()),
                Box::new(std::io::stderr()),
            ),
            range_active,
            rng_state: 0,
            rng_prev_seed: 0.0,
            catalog: Box::new(crate::builtins::IdentityCatalog),
            domain_dirs: FxHashMap::default(),
            main: MainState::new(),
            call_depth: 0,
            error_status: 0,
        }
    }

    /// Replaces the normal output stream.
    pub fn set_stdout(&mut self, stdout: Box<dyn Write>) {
        self.io.stdout = stdout;
    }

    /// Replaces the diagnostic stream.
    pub fn set_stderr(&mut self, stderr: Box<dyn Write>) {
        self.io.stderr = stderr;
    }

    /// Replaces stdin (used when no file operands are given).
    pub fn set_stdin(&mut self, stdin: Box<dyn Read>) {
        self.main.stdin = Some(stdin);
    }

    /// Installs a message catalog for the i18n builtins.
    pub fn set_catalog(&mut self, catalog: Box<dyn Catalog>) {
        self.catalog = catalog;
    }

    /// Applies a `-v var=value` style assignment (before `BEGIN`).
    /// The value classifies as a numeric string when it looks numeric.
    pub fn assign_var(&mut self, name: &str, value: &str) {
        if let Err(message) = self.env.set_global(name, Value::from_input(value)) {
            self.warn(message);
        }
        self.specials.refresh(&self.env);
    }

    /// Observability hook: the regex cache (hit counters for tests).
    pub fn regex_cache(&self) -> &RegexCache {
        &self.cache
    }

    // ------------------------------------------------------------------
    // Driver
    // ------------------------------------------------------------------

    /// Runs the program over the given input files (empty = stdin) and
    /// returns the exit status.
    pub fn run(&mut self, input_files: &[String]) -> i32 {
        self.init_argv(input_files);
        self.init_reflection();
        self.specials.refresh(&self.env);

        let mut status = 0;
        let mut exited = false;

        match self.run_special(SpecialKind::Begin) {
            Err(Unwind::Exit(code)) => {
                status = code;
                exited = true;
            }
            Err(other) => self.report_stray_unwind(&other),
            Ok(()) => {}
        }

        if !exited && self.wants_input() {
            match self.run_main_loop() {
                Err(Unwind::Exit(code)) => {
                    status = code;
                    exited = true;
                }
                Err(other) => self.report_stray_unwind(&other),
                Ok(()) => {}
            }
        }

        // END rules run even after exit - unless exit came from END
        // itself, which Unwind::Exit's propagation below handles.
        match self.run_special(SpecialKind::End) {
            Err(Unwind::Exit(code)) => {
                status = code;
                exited = true;
            }
            Err(other) => self.report_stray_unwind(&other),
            Ok(()) => {}
        }

        self.io.fflush_all();
        if exited || status != 0 {
            status
        } else {
            self.error_status
        }
    }

    /// True when the program has anything beyond `BEGIN` rules, which
    /// is what forces reading the input (an `END`-only program still
    /// reads).
    fn wants_input(&self) -> bool {
        self.program
            .rules()
            .any(|rule| !matches!(rule.pattern, Pattern::Begin))
    }

    /// Seeds `ARGV`/`ARGC`.
    fn init_argv(&mut self, input_files: &[String]) {
        let argv = crate::value::new_array();
        {
            let mut argv = argv.borrow_mut();
            argv.insert("0".to_string(), Value::Str("awk".to_string()));
            for (i, file) in input_files.iter().enumerate() {
                argv.insert((i + 1).to_string(), Value::from_input(file));
            }
        }
        let _ = self.env.set_global("ARGV", Value::Array(argv));
        let _ = self
            .env
            .set_global("ARGC", Value::Num((input_files.len() + 1) as f64));
    }

    /// Populates `ENVIRON`, `PROCINFO`, and `FUNCTAB`.
    fn init_reflection(&mut self) {
        let environ = crate::value::new_array();
        {
            let mut environ = environ.borrow_mut();
            for (key, value) in std::env::vars() {
                environ.insert(key, Value::from_input(&value));
            }
        }
        let _ = self.env.set_global("ENVIRON", Value::Array(environ));

        let procinfo = crate::value::new_array();
        {
            let mut procinfo = procinfo.borrow_mut();
            procinfo.insert("pid".into(), Value::Num(f64::from(std::process::id())));
            #[cfg(unix)]
            procinfo.insert(
                "ppid".into(),
                Value::Num(f64::from(std::os::unix::process::parent_id())),
            );
            procinfo.insert(
                "version".into(),
                Value::Str(env!("CARGO_PKG_VERSION").to_string()),
            );
            procinfo.insert(
                "platform".into(),
                Value::Str(std::env::consts::OS.to_string()),
            );
        }
        let _ = self.env.set_global("PROCINFO", Value::Array(procinfo));

        // FUNCTAB lists user and built-in functions; writes to it are
        // rejected at the assignment site.
        let functab = crate::value::new_array();
        {
            let mut functab = functab.borrow_mut();
            for name in self.env.function_names() {
                functab.insert(name.clone(), Value::Str(name));
            }
            for name in fawk_par::BUILTIN_FUNCS {
                functab.insert((*name).to_string(), Value::Str((*name).to_string()));
            }
        }
        let _ = self.env.set_global("FUNCTAB", Value::Array(functab));
    }

    /// The per-file / per-record driver loop.
    fn run_main_loop(&mut self) -> Exec {
        'files: loop {
            if self.main.source.is_none() && !self.open_next_main_file()? {
                break;
            }

            match self.run_special(SpecialKind::BeginFile) {
                // `nextfile` in BEGINFILE skips the file entirely,
                // without its ENDFILE rules.
                Err(Unwind::NextFile) => {
                    self.main.source = None;
                    continue 'files;
                }
                other => other?,
            }

            loop {
                self.specials.refresh(&self.env);
                let next = self.read_main_record()?;
                match next {
                    None => break,
                    Some((record, terminator)) => {
                        self.bump_record_counts();
                        self.set_rt(&terminator);
                        self.set_record_text(&record);
                        match self.run_rules_for_record() {
                            Err(Unwind::Next) => continue,
                            Err(Unwind::NextFile) => break,
                            other => other?,
                        }
                    }
                }
            }

            self.main.source = None;
            self.run_special(SpecialKind::EndFile)?;
        }
        Ok(())
    }

    /// Runs the `BEGIN`/`END`/`BEGINFILE`/`ENDFILE` rules of one kind
    /// in program order.
    fn run_special(&mut self, kind: SpecialKind) -> Exec {
        let program = self.program.clone();
        for item in &program.items {
            let Item::Rule(rule) = item else { continue };
            let matches = matches!(
                (&rule.pattern, kind),
                (Pattern::Begin, SpecialKind::Begin)
                    | (Pattern::End, SpecialKind::End)
                    | (Pattern::BeginFile, SpecialKind::BeginFile)
                    | (Pattern::EndFile, SpecialKind::EndFile)
            );
            if matches {
                self.run_action(rule)?;
            }
        }
        Ok(())
    }

    /// Evaluates patterns against the current record and runs matching
    /// actions in source order.
    fn run_rules_for_record(&mut self) -> Exec {
        let program = self.program.clone();
        for (index, item) in program.items.iter().enumerate() {
            let Item::Rule(rule) = item else { continue };
            match &rule.pattern {
                Pattern::Begin | Pattern::End | Pattern::BeginFile | Pattern::EndFile => {}
                Pattern::Always => self.run_action(rule)?,
                Pattern::Expr(expr) => {
                    if self.eval(expr)?.to_bool() {
                        self.run_action(rule)?;
                    }
                }
                Pattern::Range(start, stop) => {
                    if self.range_active[index] {
                        if self.eval(stop)?.to_bool() {
                            self.range_active[index] = false;
                        }
                        self.run_action(rule)?;
                    } else if self.eval(start)?.to_bool() {
                        // A record matching both endpoints is a
                        // one-record range.
                        if !self.eval(stop)?.to_bool() {
                            self.range_active[index] = true;
                        }
                        self.run_action(rule)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs a rule's action; a missing action prints the record.
    fn run_action(&mut self, rule: &Rule) -> Exec {
        match &rule.action {
            Some(stmts) => self.exec_stmts(stmts),
            None => {
                let ors = self.specials.ors.clone();
                let ofs = self.specials.ofs.clone();
                let text = format!("{}{}", self.record.record(&ofs), ors);
                self.write_main_output(&text);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Main input management
    // ------------------------------------------------------------------

    /// Opens the next input source named by `ARGV`, applying
    /// `var=value` operands along the way. Falls back to stdin when no
    /// file operand exists at all. Returns false when input is
    /// exhausted.
    fn open_next_main_file(&mut self) -> Result<bool, Unwind> {
        loop {
            let argc = self.env.get_global("ARGC").to_number().max(0.0) as usize;
            if self.main.argv_index >= argc {
                if !self.main.consumed_file && !self.main.stdin_taken {
                    self.main.stdin_taken = true;
                    let reader: Box<dyn Read> = match self.main.stdin.take() {
                        Some(reader) => reader,
                        None => Box::new(std::io::stdin()),
                    };
                    self.main.source = Some(InputSource::new(reader));
                    self.set_filename("");
                    self.reset_fnr();
                    return Ok(true);
                }
                return Ok(false);
            }

            let arg = self.argv_element(self.main.argv_index);
            self.main.argv_index += 1;

            if arg.is_empty() {
                continue;
            }

            // A `var=value` operand assigns instead of naming a file;
            // its value undergoes command-line escape processing.
            if let Some((name, value)) = split_assignment(&arg) {
                let value = fawk_util::unescape(value);
                self.assign_var(name, &value);
                continue;
            }

            match self.open_main_source(&arg) {
                Ok(source) => {
                    self.main.source = Some(source);
                    self.main.consumed_file = true;
                    self.set_filename(&arg);
                    self.reset_fnr();
                    return Ok(true);
                }
                Err(err) => {
                    self.warn(format!("can't open file `{}`: {}", arg, err));
                    self.error_status = 2;
                    continue;
                }
            }
        }
    }

    /// Opens one main-input source, honoring the stdin spellings.
    fn open_main_source(&mut self, name: &str) -> std::io::Result<InputSource> {
        let reader: Box<dyn Read> = match name {
            "-" | "/dev/stdin" => match self.main.stdin.take() {
                Some(reader) => reader,
                None => Box::new(std::io::stdin()),
            },
            path => Box::new(std::fs::File::open(path)?),
        };
        Ok(InputSource::new(reader))
    }

    /// Reads `ARGV[i]`.
    fn argv_element(&mut self, index: usize) -> String {
        let convfmt = self.specials.convfmt.clone();
        match self.env.get_global("ARGV") {
            Value::Array(argv) => argv
                .borrow()
                .get(&index.to_string())
                .map(|v| v.to_str(&convfmt))
                .unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Reads one record from the current main source. Does not cross
    /// file boundaries.
    fn read_main_record(&mut self) -> Result<Option<(String, String)>, Unwind> {
        let sep = RecordSep::from_rs(&self.specials.rs);
        let ignore_case = self.specials.ignore_case;
        let Some(source) = self.main.source.as_mut() else {
            return Ok(None);
        };
        match source.read_record(&sep, &mut self.cache, ignore_case) {
            Ok(next) => Ok(next),
            Err(err) => {
                self.warn(format!("error reading input: {}", err));
                Ok(None)
            }
        }
    }

    /// `getline` (no redirection): reads the next main record,
    /// crossing file boundaries silently.
    pub(crate) fn next_main_record(&mut self) -> Result<Option<(String, String)>, Unwind> {
        loop {
            if self.main.source.is_some() {
                if let Some(found) = self.read_main_record()? {
                    return Ok(Some(found));
                }
                self.main.source = None;
            }
            if !self.open_next_main_file()? {
                return Ok(None);
            }
        }
    }

    // ------------------------------------------------------------------
    // Record plumbing
    // ------------------------------------------------------------------

    /// Installs new record text as `$0`, re-splitting fields and
    /// synchronizing `NF`.
    pub(crate) fn set_record_text(&mut self, text: &str) {
        let paragraph = RecordSep::from_rs(&self.specials.rs) == RecordSep::Paragraph;
        let mut reports = Vec::new();
        let fields = split_record(
            text,
            &self.specials,
            &mut self.cache,
            paragraph,
            &mut |message| reports.push(message),
        );
        for message in reports {
            self.warn(message);
        }
        self.record.load(text.to_string(), fields);
        self.sync_nf();
    }

    /// Mirrors the field count into the `NF` global.
    pub(crate) fn sync_nf(&mut self) {
        let nf = self.record.nf() as f64;
        let _ = self.env.set_global("NF", Value::Num(nf));
    }

    /// Increments `NR` and `FNR`.
    pub(crate) fn bump_record_counts(&mut self) {
        let nr = self.env.get_global("NR").to_number() + 1.0;
        let fnr = self.env.get_global("FNR").to_number() + 1.0;
        let _ = self.env.set_global("NR", Value::Num(nr));
        let _ = self.env.set_global("FNR", Value::Num(fnr));
    }

    pub(crate) fn set_rt(&mut self, terminator: &str) {
        let _ = self
            .env
            .set_global("RT", Value::Str(terminator.to_string()));
    }

    fn set_filename(&mut self, name: &str) {
        let _ = self
            .env
            .set_global("FILENAME", Value::Str(name.to_string()));
    }

    fn reset_fnr(&mut self) {
        let _ = self.env.set_global("FNR", Value::Num(0.0));
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Emits a runtime diagnostic to the error stream. Runtime faults
    /// are reported, not thrown; execution continues.
    pub(crate) fn warn(&mut self, message: impl std::fmt::Display) {
        let _ = writeln!(self.io.stderr, "fawk: {}", message);
    }

    /// A control unwind that escaped to the toplevel is an internal
    /// error.
    fn report_stray_unwind(&mut self, unwind: &Unwind) {
        self.warn(format!(
            "internal error: `{}` escaped to the top level",
            match unwind {
                Unwind::Break => "break",
                Unwind::Continue => "continue",
                Unwind::Next => "next",
                Unwind::NextFile => "nextfile",
                Unwind::Return(_) => "return",
                Unwind::Exit(_) => "exit",
            }
        ));
    }

    /// Writes to the main output stream.
    pub(crate) fn write_main_output(&mut self, text: &str) {
        if let Err(err) = self.io.stdout.write_all(text.as_bytes()) {
            let _ = writeln!(self.io.stderr, "fawk: write error: {}", err);
        }
    }
}

/// The four special rule kinds.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SpecialKind {
    Begin,
    End,
    BeginFile,
    EndFile,
}

/// Splits a `var=value` command-line operand; `None` when the operand
/// is a file name.
fn split_assignment(arg: &str) -> Option<(&str, &str)> {
    let eq = arg.find('=')?;
    let name = &arg[..eq];
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':') {
        return None;
    }
    Some((name, &arg[eq + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment("x=1"), Some(("x", "1")));
        assert_eq!(split_assignment("FS=:"), Some(("FS", ":")));
        assert_eq!(split_assignment("ns::v=a"), Some(("ns::v", "a")));
        assert_eq!(split_assignment("file.txt"), None);
        assert_eq!(split_assignment("2=x"), None);
        assert_eq!(split_assignment("a/b=c"), None);
    }
}
