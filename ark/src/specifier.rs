//! Opening archives from Kaldi-style read specifiers.
//!
//! ```text
//! ark:feats.ark           -> file
//! ark,t:-                 -> stdin
//! feats.ark:1024          -> file, seek to byte 1024
//! nnet-forward ... ark:- | -> sh -c "nnet-forward ... ark:-", read stdout
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::process::{Child, ChildStdout, Command, Stdio};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{ArkError, ArkResult};
use crate::reader::ArkReader;

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(ark|scp)(,scp|,b|,t|,n?f|,n?p|,b?o|,n?s|,n?cs)*:").unwrap());

static OFFSET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r":([0-9]+)$").unwrap());

/// Where a specifier points after its prefix is stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Standard input (`-` or empty).
    Stdin,
    /// A shell command whose stdout is read.
    Pipe(String),
    /// A file, optionally at a byte offset.
    File { path: String, offset: Option<u64> },
}

/// Removes a leading `ark:` / `scp,...:` option prefix if present.
pub fn strip_prefix(spec: &str) -> &str {
    match PREFIX_RE.find(spec) {
        Some(m) => &spec[m.end()..],
        None => spec,
    }
}

/// Classifies a read specifier.
pub fn parse_rspecifier(spec: &str) -> Source {
    let s = strip_prefix(spec).trim();
    if s.is_empty() || s == "-" {
        return Source::Stdin;
    }
    if let Some(cmd) = s.strip_suffix('|') {
        return Source::Pipe(cmd.trim_end().to_string());
    }
    if let Some(caps) = OFFSET_RE.captures(s) {
        if let Ok(offset) = caps[1].parse::<u64>() {
            let path = &s[..s.len() - caps[0].len()];
            return Source::File {
                path: path.to_string(),
                offset: Some(offset),
            };
        }
    }
    Source::File {
        path: s.to_string(),
        offset: None,
    }
}

/// A byte stream opened from a read specifier.
pub enum Input {
    Stdin(io::StdinLock<'static>),
    File(BufReader<File>),
    Pipe(PipeInput),
}

impl Read for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::Stdin(r) => r.read(buf),
            Input::File(r) => r.read(buf),
            Input::Pipe(r) => r.read(buf),
        }
    }
}

impl BufRead for Input {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            Input::Stdin(r) => r.fill_buf(),
            Input::File(r) => r.fill_buf(),
            Input::Pipe(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            Input::Stdin(r) => r.consume(amt),
            Input::File(r) => r.consume(amt),
            Input::Pipe(r) => r.consume(amt),
        }
    }
}

/// Stdout of a `sh -c` child.
///
/// The child is reaped on drop. A non-zero exit after the stream was read
/// to the end is logged as a warning; an early drop (the consumer stopped
/// reading) only logs at debug level since the child usually dies of
/// SIGPIPE then.
pub struct PipeInput {
    command: String,
    child: Child,
    stdout: Option<BufReader<ChildStdout>>,
    eof: bool,
}

impl PipeInput {
    /// Spawns `command` through the shell with stdout piped.
    pub fn spawn(command: &str) -> ArkResult<Self> {
        debug!(command, "spawning pipe");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| ArkError::Spawn {
                command: command.to_string(),
                source,
            })?;
        let stdout = child.stdout.take().map(BufReader::new);
        Ok(Self {
            command: command.to_string(),
            child,
            stdout,
            eof: false,
        })
    }

    fn stdout(&mut self) -> io::Result<&mut BufReader<ChildStdout>> {
        self.stdout
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "pipe already closed"))
    }
}

impl Read for PipeInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.stdout()?.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.eof = true;
        }
        Ok(n)
    }
}

impl BufRead for PipeInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let eof = self.stdout()?.fill_buf()?.is_empty();
        if eof {
            self.eof = true;
        }
        // Re-borrow; the buffer is unchanged by the check above.
        self.stdout()?.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if let Some(r) = self.stdout.as_mut() {
            r.consume(amt);
        }
    }
}

impl Drop for PipeInput {
    fn drop(&mut self) {
        // Close our end first so a blocked child sees EPIPE.
        self.stdout.take();
        match self.child.wait() {
            Ok(status) if status.success() => {}
            Ok(status) if self.eof => {
                warn!(command = %self.command, %status, "pipe command exited with failure");
            }
            Ok(status) => {
                debug!(command = %self.command, %status, "pipe closed before end of stream");
            }
            Err(e) => warn!(command = %self.command, error = %e, "failed to wait for pipe command"),
        }
    }
}

/// Opens a read specifier as a byte stream.
pub fn open_input(spec: &str) -> ArkResult<Input> {
    match parse_rspecifier(spec) {
        Source::Stdin => Ok(Input::Stdin(io::stdin().lock())),
        Source::Pipe(cmd) => Ok(Input::Pipe(PipeInput::spawn(&cmd)?)),
        Source::File { path, offset } => {
            let mut f = File::open(&path)?;
            if let Some(off) = offset {
                f.seek(SeekFrom::Start(off))?;
            }
            Ok(Input::File(BufReader::new(f)))
        }
    }
}

/// Opens a read specifier as a matrix archive reader.
pub fn open_rspecifier(spec: &str) -> ArkResult<ArkReader<Input>> {
    Ok(ArkReader::new(open_input(spec)?))
}
