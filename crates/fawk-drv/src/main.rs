//! fawk - an AWK implementation.
//!
//! The command-line front end: parse arguments with clap, build a
//! driver [`Config`], and run a [`Session`]. The interesting work
//! lives in the engine crates; this binary only decides what program
//! text to run over which inputs.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fawk_drv::{unescape, Config, ProgramSource, Session};

/// fawk - pattern scanning and processing language
#[derive(Parser, Debug)]
#[command(name = "fawk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pattern scanning and processing language", long_about = None)]
struct Cli {
    /// Read the program source from a file; may be repeated
    #[arg(short = 'f', long = "file", value_name = "progfile")]
    program_files: Vec<PathBuf>,

    /// Assign var=value before BEGIN; may be repeated
    #[arg(short = 'v', long = "assign", value_name = "var=value")]
    assigns: Vec<String>,

    /// Use fs as the input field separator
    #[arg(short = 'F', long = "field-separator", value_name = "fs")]
    field_separator: Option<String>,

    /// Program text (unless -f is given), then input files.
    /// A `var=value` operand assigns between files.
    #[arg(value_name = "program | file")]
    operands: Vec<String>,
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("FAWK_LOG"))
        .init();

    let cli = Cli::parse();
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let mut operands = cli.operands.into_iter();

    let source = if cli.program_files.is_empty() {
        match operands.next() {
            Some(text) => ProgramSource::Text(text),
            None => {
                eprintln!("fawk: no program text");
                eprintln!("usage: fawk [-F fs] [-v var=value] ('program' | -f progfile) [file ...]");
                return 2;
            }
        }
    } else {
        ProgramSource::Files(cli.program_files)
    };

    let mut assigns = Vec::with_capacity(cli.assigns.len());
    for assign in &cli.assigns {
        match assign.split_once('=') {
            Some((name, value)) if is_valid_name(name) => {
                assigns.push((name.to_string(), unescape(value)));
            }
            _ => {
                eprintln!("fawk: invalid -v assignment `{}`", assign);
                return 2;
            }
        }
    }

    let config = Config {
        source,
        assigns,
        field_separator: cli.field_separator.as_deref().map(unescape),
        input_files: operands.collect(),
    };

    match Session::new(config).run() {
        Ok(status) => status,
        Err(err) => {
            eprintln!("fawk: {:#}", err);
            2
        }
    }
}

/// A valid assignment target: an identifier, optionally
/// namespace-qualified.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.split("::").all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
