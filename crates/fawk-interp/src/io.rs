//! The I/O manager: record sources, output targets, pipes, and
//! coprocesses.
//!
//! Streams are held in tables keyed by file name or command text,
//! created on first use, and destroyed on `close` or teardown.
//! Duplicate opens of the same target return the existing handle. The
//! special files `/dev/stdin`, `/dev/stdout`, `/dev/stderr`,
//! `/dev/null`, and `-` are recognized on both directions.
//!
//! Coprocesses (`cmd |& ...`) are children with both ends piped; the
//! write side is flushed before every read to prevent deadlock.
//! Teardown is Drop-based, so children are reaped on every exit path.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

use indexmap::IndexMap;

use crate::recache::RegexCache;

/// How records are delimited, derived from `RS`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordSep {
    /// `RS == "\n"`: line mode.
    Line,
    /// `RS == ""`: paragraph mode.
    Paragraph,
    /// Any other single character.
    Char(char),
    /// Multi-character `RS`: a regex separator.
    Regex(String),
}

impl RecordSep {
    /// Classifies an `RS` value.
    pub fn from_rs(rs: &str) -> Self {
        let mut chars = rs.chars();
        match (chars.next(), chars.next()) {
            (None, _) => RecordSep::Paragraph,
            (Some('\n'), None) => RecordSep::Line,
            (Some(c), None) => RecordSep::Char(c),
            _ => RecordSep::Regex(rs.to_string()),
        }
    }
}

/// Read chunk size for record scanning.
const CHUNK: usize = 64 * 1024;

/// A buffered record source over any byte reader.
pub struct InputSource {
    reader: Box<dyn Read>,
    buffer: String,
    eof: bool,
}

impl InputSource {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self {
            reader,
            buffer: String::new(),
            eof: false,
        }
    }

    /// Pulls one chunk from the reader into the buffer. Returns the
    /// number of bytes read (0 at EOF).
    fn fill(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; CHUNK];
        let n = self.reader.read(&mut chunk)?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
        }
        Ok(n)
    }

    /// Consumes `record_end..sep_end` and returns the record plus the
    /// terminator text (`RT`).
    fn take(&mut self, record_end: usize, sep_end: usize) -> (String, String) {
        let record = self.buffer[..record_end].to_string();
        let terminator = self.buffer[record_end..sep_end].to_string();
        self.buffer.drain(..sep_end);
        (record, terminator)
    }

    /// Reads one record according to `sep`. Returns `None` at end of
    /// input. The second element is the matched terminator (`RT`).
    pub fn read_record(
        &mut self,
        sep: &RecordSep,
        cache: &mut RegexCache,
        ignore_case: bool,
    ) -> io::Result<Option<(String, String)>> {
        match sep {
            RecordSep::Line => self.read_delimited("\n"),
            RecordSep::Char(c) => {
                let mut delim = [0u8; 4];
                let delim = c.encode_utf8(&mut delim).to_string();
                self.read_delimited(&delim)
            }
            RecordSep::Paragraph => self.read_paragraph(),
            RecordSep::Regex(pattern) => self.read_regex(pattern, cache, ignore_case),
        }
    }

    /// Single-delimiter mode (line mode and one-character `RS`).
    fn read_delimited(&mut self, delim: &str) -> io::Result<Option<(String, String)>> {
        loop {
            if let Some(pos) = self.buffer.find(delim) {
                return Ok(Some(self.take(pos, pos + delim.len())));
            }
            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let record = std::mem::take(&mut self.buffer);
                return Ok(Some((record, String::new())));
            }
            self.fill()?;
        }
    }

    /// Paragraph mode: skip leading blank lines, read to a blank line
    /// or EOF; runs of blank lines collapse into one terminator.
    fn read_paragraph(&mut self) -> io::Result<Option<(String, String)>> {
        // Skip the leading newline run.
        loop {
            let lead = self.buffer.bytes().take_while(|&b| b == b'\n').count();
            self.buffer.drain(..lead);
            if !self.buffer.is_empty() || self.eof {
                break;
            }
            self.fill()?;
        }
        if self.buffer.is_empty() && self.eof {
            return Ok(None);
        }

        loop {
            if let Some(pos) = self.buffer.find("\n\n") {
                // The terminator is the whole blank-line run, which
                // may still be growing; pull until it stops.
                let mut end = pos + 2;
                loop {
                    while end < self.buffer.len() && self.buffer.as_bytes()[end] == b'\n' {
                        end += 1;
                    }
                    if end < self.buffer.len() || self.eof {
                        break;
                    }
                    self.fill()?;
                }
                return Ok(Some(self.take(pos, end)));
            }
            if self.eof {
                let mut record = std::mem::take(&mut self.buffer);
                let mut terminator = String::new();
                if record.ends_with('\n') {
                    record.pop();
                    terminator.push('\n');
                }
                return Ok(Some((record, terminator)));
            }
            self.fill()?;
        }
    }

    /// Regex `RS`: scan the pending buffer for the first match; a
    /// match touching the end of the buffer waits for more input so a
    /// longer terminator is not cut short. `RT` is the exact matched
    /// text.
    fn read_regex(
        &mut self,
        pattern: &str,
        cache: &mut RegexCache,
        ignore_case: bool,
    ) -> io::Result<Option<(String, String)>> {
        let regex = match cache.compile(pattern, ignore_case) {
            Ok(regex) => regex,
            Err(_) => {
                // Diagnosed by the caller's compile path; degrade to
                // line mode rather than lose input.
                return self.read_delimited("\n");
            }
        };

        loop {
            if let Some(m) = regex.find(&self.buffer) {
                if m.end() < self.buffer.len() || self.eof {
                    let (start, end) = (m.start(), m.end());
                    return Ok(Some(self.take(start, end)));
                }
            } else if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let record = std::mem::take(&mut self.buffer);
                return Ok(Some((record, String::new())));
            }
            self.fill()?;
        }
    }
}

/// A resolved output sink.
enum OutSink {
    Main,
    ErrStream,
    Null,
    File(BufWriter<File>),
}

/// A unidirectional output pipe (`print ... | "cmd"`).
struct OutputPipe {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
}

/// A unidirectional input pipe (`"cmd" | getline`).
struct InputPipe {
    child: Child,
    source: InputSource,
}

/// A bidirectional coprocess (`cmd |& ...`).
struct Coprocess {
    child: Child,
    writer: Option<BufWriter<ChildStdin>>,
    reader: Option<InputSource>,
}

/// File, pipe, and coprocess tables plus the main output streams.
pub struct IoManager {
    /// Normal output (default stdout); injectable for tests.
    pub stdout: Box<dyn Write>,
    /// Diagnostic output (default stderr); injectable for tests.
    pub stderr: Box<dyn Write>,

    output_files: IndexMap<String, OutSink>,
    output_pipes: IndexMap<String, OutputPipe>,
    input_files: IndexMap<String, InputSource>,
    input_pipes: IndexMap<String, InputPipe>,
    coprocs: IndexMap<String, Coprocess>,
}

impl IoManager {
    pub fn new(stdout: Box<dyn Write>, stderr: Box<dyn Write>) -> Self {
        Self {
            stdout,
            stderr,
            output_files: IndexMap::new(),
            output_pipes: IndexMap::new(),
            input_files: IndexMap::new(),
            input_pipes: IndexMap::new(),
            coprocs: IndexMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Writes to a `>`/`>>` redirect target, opening it on first use.
    /// `append` only matters for the first open.
    pub fn write_file(&mut self, name: &str, append: bool, data: &str) -> io::Result<()> {
        if !self.output_files.contains_key(name) {
            let sink = match name {
                "-" | "/dev/stdout" => OutSink::Main,
                "/dev/stderr" => OutSink::ErrStream,
                "/dev/null" => OutSink::Null,
                path => {
                    let file = OpenOptions::new()
                        .write(true)
                        .create(true)
                        .append(append)
                        .truncate(!append)
                        .open(path)?;
                    OutSink::File(BufWriter::new(file))
                }
            };
            self.output_files.insert(name.to_string(), sink);
        }
        match self.output_files.get_mut(name).expect("just inserted") {
            OutSink::Main => self.stdout.write_all(data.as_bytes()),
            OutSink::ErrStream => self.stderr.write_all(data.as_bytes()),
            OutSink::Null => Ok(()),
            OutSink::File(writer) => writer.write_all(data.as_bytes()),
        }
    }

    /// Writes to an output pipe, spawning the command on first use.
    pub fn write_pipe(&mut self, command: &str, data: &str) -> io::Result<()> {
        if !self.output_pipes.contains_key(command) {
            let mut child = shell(command).stdin(Stdio::piped()).spawn()?;
            let stdin = child.stdin.take().map(BufWriter::new);
            self.output_pipes
                .insert(command.to_string(), OutputPipe { child, stdin });
        }
        let pipe = self.output_pipes.get_mut(command).expect("just inserted");
        match &mut pipe.stdin {
            Some(writer) => writer.write_all(data.as_bytes()),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")),
        }
    }

    /// Writes to a coprocess's input, spawning it on first use.
    pub fn coproc_write(&mut self, command: &str, data: &str) -> io::Result<()> {
        self.ensure_coproc(command)?;
        let coproc = self.coprocs.get_mut(command).expect("just ensured");
        match &mut coproc.writer {
            Some(writer) => writer.write_all(data.as_bytes()),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "coprocess write side closed",
            )),
        }
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// The record source for `getline < file`, opened on first use.
    pub fn input_file(&mut self, name: &str) -> io::Result<&mut InputSource> {
        if !self.input_files.contains_key(name) {
            let reader: Box<dyn Read> = match name {
                "-" | "/dev/stdin" => Box::new(io::stdin()),
                path => Box::new(File::open(path)?),
            };
            self.input_files
                .insert(name.to_string(), InputSource::new(reader));
        }
        Ok(self.input_files.get_mut(name).expect("just inserted"))
    }

    /// The record source for `"cmd" | getline`, spawned on first use.
    pub fn input_pipe(&mut self, command: &str) -> io::Result<&mut InputSource> {
        if !self.input_pipes.contains_key(command) {
            // The child shares our stdout; flush so its output
            // interleaves after anything already printed.
            let _ = self.stdout.flush();
            let mut child = shell(command).stdout(Stdio::piped()).spawn()?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no pipe stdout"))?;
            self.input_pipes.insert(
                command.to_string(),
                InputPipe {
                    child,
                    source: InputSource::new(Box::new(stdout)),
                },
            );
        }
        Ok(&mut self.input_pipes.get_mut(command).expect("just inserted").source)
    }

    /// The read side of a coprocess. The write side is flushed first
    /// so a request/response exchange cannot deadlock.
    pub fn coproc_reader(&mut self, command: &str) -> io::Result<&mut InputSource> {
        self.ensure_coproc(command)?;
        let coproc = self.coprocs.get_mut(command).expect("just ensured");
        if let Some(writer) = &mut coproc.writer {
            writer.flush()?;
        }
        coproc.reader.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "coprocess read side closed")
        })
    }

    fn ensure_coproc(&mut self, command: &str) -> io::Result<()> {
        if self.coprocs.contains_key(command) {
            return Ok(());
        }
        let mut child = shell(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let writer = child.stdin.take().map(BufWriter::new);
        let reader = child
            .stdout
            .take()
            .map(|stdout| InputSource::new(Box::new(stdout)));
        self.coprocs.insert(
            command.to_string(),
            Coprocess {
                child,
                writer,
                reader,
            },
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // close / fflush / system
    // ------------------------------------------------------------------

    /// Closes any open target by name. Returns the child's exit
    /// status for pipes and coprocesses, 0 for files, -1 when nothing
    /// by that name is open.
    pub fn close(&mut self, name: &str) -> i32 {
        if let Some(mut sink) = self.output_files.shift_remove(name) {
            if let OutSink::File(writer) = &mut sink {
                let _ = writer.flush();
            }
            return 0;
        }
        if self.input_files.shift_remove(name).is_some() {
            return 0;
        }
        if let Some(mut pipe) = self.output_pipes.shift_remove(name) {
            if let Some(mut writer) = pipe.stdin.take() {
                let _ = writer.flush();
            }
            return wait_status(&mut pipe.child);
        }
        if let Some(mut pipe) = self.input_pipes.shift_remove(name) {
            drop(pipe.source);
            return wait_status(&mut pipe.child);
        }
        if let Some(mut coproc) = self.coprocs.shift_remove(name) {
            if let Some(mut writer) = coproc.writer.take() {
                let _ = writer.flush();
            }
            drop(coproc.reader.take());
            return wait_status(&mut coproc.child);
        }
        -1
    }

    /// Closes one side of a coprocess: `"to"` ends the write side
    /// (EOF for the child), `"from"` the read side.
    pub fn close_coproc_side(&mut self, command: &str, to_side: bool) -> i32 {
        match self.coprocs.get_mut(command) {
            Some(coproc) => {
                if to_side {
                    match coproc.writer.take() {
                        Some(mut writer) => {
                            let _ = writer.flush();
                            0
                        }
                        None => -1,
                    }
                } else {
                    match coproc.reader.take() {
                        Some(_) => 0,
                        None => -1,
                    }
                }
            }
            None => -1,
        }
    }

    /// Flushes one named target. Returns 0 on success, -1 if nothing
    /// by that name is open for output.
    pub fn fflush_target(&mut self, name: &str) -> i32 {
        if name.is_empty() || name == "-" || name == "/dev/stdout" {
            let _ = self.stdout.flush();
            return 0;
        }
        if let Some(sink) = self.output_files.get_mut(name) {
            if let OutSink::File(writer) = sink {
                let _ = writer.flush();
            }
            return 0;
        }
        if let Some(pipe) = self.output_pipes.get_mut(name) {
            if let Some(writer) = &mut pipe.stdin {
                let _ = writer.flush();
            }
            return 0;
        }
        if let Some(coproc) = self.coprocs.get_mut(name) {
            if let Some(writer) = &mut coproc.writer {
                let _ = writer.flush();
            }
            return 0;
        }
        -1
    }

    /// Flushes stdout and every open output file, pipe, and
    /// coprocess.
    pub fn fflush_all(&mut self) {
        let _ = self.stdout.flush();
        for sink in self.output_files.values_mut() {
            if let OutSink::File(writer) = sink {
                let _ = writer.flush();
            }
        }
        for pipe in self.output_pipes.values_mut() {
            if let Some(writer) = &mut pipe.stdin {
                let _ = writer.flush();
            }
        }
        for coproc in self.coprocs.values_mut() {
            if let Some(writer) = &mut coproc.writer {
                let _ = writer.flush();
            }
        }
    }

    /// Runs a shell command to completion (the `system` builtin).
    /// Pending output is flushed first so ordering is preserved.
    pub fn system(&mut self, command: &str) -> i32 {
        self.fflush_all();
        match shell(command).status() {
            Ok(status) => status.code().unwrap_or(-1),
            Err(err) => {
                let _ = writeln!(self.stderr, "fawk: can't run `{}`: {}", command, err);
                -1
            }
        }
    }
}

impl Drop for IoManager {
    /// Teardown: flush everything and reap every child.
    fn drop(&mut self) {
        self.fflush_all();
        let commands: Vec<String> = self
            .output_pipes
            .keys()
            .chain(self.input_pipes.keys())
            .chain(self.coprocs.keys())
            .cloned()
            .collect();
        for command in commands {
            self.close(&command);
        }
    }
}

/// Builds the shell invocation for pipes, coprocesses, and `system`.
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Waits for a child and extracts its exit status.
fn wait_status(child: &mut Child) -> i32 {
    match child.wait() {
        Ok(status) => status.code().unwrap_or(-1),
        Err(_) => -1,
    }
}
