//! fawk-drv - the driver.
//!
//! The driver orchestrates one run: assemble the program source (text
//! or `-f` files), parse it, render any diagnostics, and hand the AST
//! to the interpreter with the initial `-v` assignments and `-F`
//! field-separator override applied before `BEGIN`.
//!
//! Exit codes: 0 on normal completion, 1 on parse errors, 2 on usage
//! or input-file problems, otherwise whatever the program passed to
//! `exit`.

use std::io::{Read, Write};
use std::path::PathBuf;

use fawk_interp::Interpreter;
use fawk_par::Program;
use fawk_util::{Handler, SourceError};

/// Where the program source comes from.
#[derive(Debug, Clone)]
pub enum ProgramSource {
    /// Program text given on the command line.
    Text(String),
    /// One or more `-f` program files, concatenated in order.
    Files(Vec<PathBuf>),
}

/// One run's configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The program to run.
    pub source: ProgramSource,

    /// `var=value` assignments applied before `BEGIN`.
    pub assigns: Vec<(String, String)>,

    /// `-F` field-separator override.
    pub field_separator: Option<String>,

    /// Input file operands (empty reads stdin). `var=value` operands
    /// assign between files.
    pub input_files: Vec<String>,
}

/// A single driver invocation.
///
/// Output streams are injectable so tests can capture them; they
/// default to the process stdout/stderr.
pub struct Session {
    config: Config,
    stdout: Option<Box<dyn Write>>,
    stderr: Option<Box<dyn Write>>,
    stdin: Option<Box<dyn Read>>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            stdout: None,
            stderr: None,
            stdin: None,
        }
    }

    /// Captures normal output into the given writer.
    pub fn with_stdout(mut self, stdout: Box<dyn Write>) -> Self {
        self.stdout = Some(stdout);
        self
    }

    /// Captures diagnostics into the given writer.
    pub fn with_stderr(mut self, stderr: Box<dyn Write>) -> Self {
        self.stderr = Some(stderr);
        self
    }

    /// Supplies stdin (used when no file operands are given).
    pub fn with_stdin(mut self, stdin: Box<dyn Read>) -> Self {
        self.stdin = Some(stdin);
        self
    }

    /// Parses and runs the program, returning the exit status.
    pub fn run(mut self) -> anyhow::Result<i32> {
        let handler = Handler::new();
        let program = self.parse_program(&handler)?;

        if handler.has_errors() {
            let mut stderr: Box<dyn Write> = match self.stderr.take() {
                Some(stderr) => stderr,
                None => Box::new(std::io::stderr()),
            };
            let _ = handler.render(&mut stderr);
            return Ok(1);
        }

        tracing::debug!(
            items = program.items.len(),
            "program parsed, starting interpreter"
        );

        let mut interp = Interpreter::new(program);
        if let Some(stdout) = self.stdout.take() {
            interp.set_stdout(stdout);
        }
        if let Some(stderr) = self.stderr.take() {
            interp.set_stderr(stderr);
        }
        if let Some(stdin) = self.stdin.take() {
            interp.set_stdin(stdin);
        }

        if let Some(fs) = &self.config.field_separator {
            interp.assign_var("FS", fs);
        }
        for (name, value) in &self.config.assigns {
            interp.assign_var(name, value);
        }

        Ok(interp.run(&self.config.input_files))
    }

    /// Assembles and parses the program source. Each `-f` file parses
    /// with its own path so relative `@include`s resolve against it.
    fn parse_program(&self, handler: &Handler) -> anyhow::Result<Program> {
        match &self.config.source {
            ProgramSource::Text(text) => Ok(fawk_par::parse_program(text, None, handler)),
            ProgramSource::Files(paths) => {
                let mut program = Program::default();
                for path in paths {
                    let text = std::fs::read_to_string(path).map_err(|source| {
                        SourceError::Unreadable {
                            path: path.display().to_string(),
                            source,
                        }
                    })?;
                    tracing::debug!(file = %path.display(), "parsing program file");
                    let parsed = fawk_par::parse_program(&text, Some(path), handler);
                    program.items.extend(parsed.items);
                }
                Ok(program)
            }
        }
    }
}

/// Escape processing for `-v` / `-F` values, shared with the
/// interpreter's `var=value` operand handling.
pub use fawk_util::unescape;
