// src/io/process_io.rs

//! Production stream wiring for task processes.

use std::fs::File;
use std::future::Future;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{Level, debug};

use crate::logger::log_best_effort;

use super::{
    AttachedStreams, IoAttachment, OutputLine, PUMP_DRAIN_TIMEOUT, StreamContext, StreamKind,
    drain_pumps,
};

/// Source for the child's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Null,
    Inherit,
    File(PathBuf),
}

/// Destination for the child's stdout or stderr.
#[derive(Debug, Clone)]
pub enum OutputMode {
    Inherit,
    Null,
    /// Pipe and forward each line to the task logger (or `tracing` at debug
    /// when the task has no logger).
    Log,
    /// Truncate/create the file and write the stream into it.
    File(PathBuf),
    /// Pipe and forward each line to a caller-owned channel.
    Channel(mpsc::UnboundedSender<OutputLine>),
}

impl OutputMode {
    fn is_piped(&self) -> bool {
        matches!(self, OutputMode::Log | OutputMode::Channel(_))
    }

    fn stdio(&self) -> std::io::Result<Stdio> {
        Ok(match self {
            OutputMode::Inherit => Stdio::inherit(),
            OutputMode::Null => Stdio::null(),
            OutputMode::Log | OutputMode::Channel(_) => Stdio::piped(),
            OutputMode::File(path) => Stdio::from(File::create(path)?),
        })
    }
}

/// Stream wiring described by plain values.
///
/// Defaults to stdin from `/dev/null` with stdout and stderr inherited.
#[derive(Debug, Clone)]
pub struct ProcessIo {
    stdin: InputMode,
    stdout: OutputMode,
    stderr: OutputMode,
}

impl Default for ProcessIo {
    fn default() -> Self {
        Self {
            stdin: InputMode::Null,
            stdout: OutputMode::Inherit,
            stderr: OutputMode::Inherit,
        }
    }
}

impl ProcessIo {
    pub fn new(stdin: InputMode, stdout: OutputMode, stderr: OutputMode) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }

    /// Discard everything; stdin reads as empty.
    pub fn discard() -> Self {
        Self::new(InputMode::Null, OutputMode::Null, OutputMode::Null)
    }

    pub fn with_stdin(mut self, stdin: InputMode) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn with_stdout(mut self, stdout: OutputMode) -> Self {
        self.stdout = stdout;
        self
    }

    pub fn with_stderr(mut self, stderr: OutputMode) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn stdin(&self) -> &InputMode {
        &self.stdin
    }

    pub fn stdout(&self) -> &OutputMode {
        &self.stdout
    }

    pub fn stderr(&self) -> &OutputMode {
        &self.stderr
    }
}

impl IoAttachment for ProcessIo {
    fn attach(&self, cmd: &mut Command) -> std::io::Result<()> {
        let stdin = match &self.stdin {
            InputMode::Null => Stdio::null(),
            InputMode::Inherit => Stdio::inherit(),
            InputMode::File(path) => Stdio::from(File::open(path)?),
        };

        cmd.stdin(stdin)
            .stdout(self.stdout.stdio()?)
            .stderr(self.stderr.stdio()?);
        Ok(())
    }

    fn connect(&self, child: &mut Child, ctx: &StreamContext) -> AttachedStreams {
        let mut streams = AttachedStreams::empty();

        if self.stdout.is_piped() {
            if let Some(stdout) = child.stdout.take() {
                streams.push_pump(spawn_pump(
                    stdout,
                    StreamKind::Stdout,
                    self.stdout.clone(),
                    ctx.clone(),
                ));
            }
        }

        if self.stderr.is_piped() {
            if let Some(stderr) = child.stderr.take() {
                streams.push_pump(spawn_pump(
                    stderr,
                    StreamKind::Stderr,
                    self.stderr.clone(),
                    ctx.clone(),
                ));
            }
        }

        streams
    }

    fn release(&self, streams: AttachedStreams) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(drain_pumps(streams, PUMP_DRAIN_TIMEOUT))
    }

    fn shares_terminal(&self) -> bool {
        self.stdin == InputMode::Inherit && std::io::stdin().is_terminal()
    }
}

/// Consume a piped stream line by line until EOF.
///
/// The stream is always read to the end, even when nobody is listening any
/// more or a line is not valid UTF-8, so the child never blocks on a full
/// pipe or dies of SIGPIPE. Invalid bytes are replaced, not dropped.
fn spawn_pump<R>(
    reader: R,
    kind: StreamKind,
    mode: OutputMode,
    ctx: StreamContext,
) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let label = match kind {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        };

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => forward(&mode, &ctx, kind, label, decode_line(&buf)),
                Err(e) => {
                    debug!(program = %ctx.program_name, error = %e, "{label} read failed; discarding the rest");
                    let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                    break;
                }
            }
        }
    })
}

/// Strip the line terminator (`\n` or `\r\n`) and decode lossily.
fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

fn forward(mode: &OutputMode, ctx: &StreamContext, kind: StreamKind, label: &str, line: String) {
    match mode {
        OutputMode::Channel(tx) => {
            let _ = tx.send(OutputLine { stream: kind, line });
        }
        _ => match ctx.logger.as_deref() {
            Some(logger) => log_best_effort(
                Some(logger),
                Level::INFO,
                &format!("{} {label}: {line}", ctx.program_name),
            ),
            None => debug!(program = %ctx.program_name, "{label}: {}", line),
        },
    }
}
