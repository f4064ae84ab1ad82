//! Session management
//!
//! Runs a child process (or reads any byte stream), decodes its output and
//! feeds it into a [`TerminalEmulator`].

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::term::{OutputSink, TerminalEmulator};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to create output pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("failed to wait for child: {0}")]
    Wait(#[source] io::Error),
}

/// Session events
#[derive(Debug)]
pub enum SessionEvent {
    /// Raw bytes read from one of the streams
    Output(Vec<u8>),
    /// A stream reached EOF or failed
    Closed(&'static str),
}

/// Turns byte chunks into text, keeping UTF-8 sequences split across chunk
/// boundaries intact.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    /// Start of a multi-byte sequence still missing bytes
    partial: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk. Invalid bytes become U+FFFD.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.partial);
        input.extend_from_slice(bytes);

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // Validated by from_utf8 above
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more
                            self.partial.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Text for a sequence left incomplete at end of stream
    pub fn finish(&mut self) -> String {
        if self.partial.is_empty() {
            return String::new();
        }
        debug!("dangling {} byte UTF-8 sequence at end of stream", self.partial.len());
        self.partial.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }
}

/// A running output source
pub struct Session {
    /// Child process, when the session owns one
    child: Option<Child>,
    /// Reader thread handles
    readers: Vec<JoinHandle<()>>,
    /// Channel to receive stream output
    events: Receiver<SessionEvent>,
}

impl Session {
    /// Start `command` with stdout and stderr sharing one pipe, so the
    /// two streams arrive in the order the child wrote them
    pub fn spawn(command: &str, args: &[String], read_chunk_size: usize) -> Result<Self, SessionError> {
        let (reader, writer) = io::pipe().map_err(SessionError::Pipe)?;
        let stderr = writer.try_clone().map_err(SessionError::Pipe)?;

        let mut builder = Command::new(command);
        builder
            .args(args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr);
        let spawned = builder.spawn();
        // Close our copies of the write end, or the reader never sees EOF
        drop(builder);

        let child = spawned.map_err(|source| SessionError::Spawn {
            command: command.to_string(),
            source,
        })?;
        info!("spawned {:?} (pid {})", command, child.id());

        let (tx, rx) = mpsc::channel();
        Ok(Self {
            child: Some(child),
            readers: vec![spawn_reader("output", reader, read_chunk_size, tx)],
            events: rx,
        })
    }

    /// Read from any byte stream, e.g. stdin
    pub fn from_reader<R: Read + Send + 'static>(reader: R, read_chunk_size: usize) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            child: None,
            readers: vec![spawn_reader("input", reader, read_chunk_size, tx)],
            events: rx,
        }
    }

    /// Feed everything the session produces into `emulator` until all
    /// streams close, then drain it. Returns the child's exit code, or
    /// `None` when the session reads a plain stream.
    pub fn run<S: OutputSink>(
        mut self,
        emulator: &mut TerminalEmulator<S>,
    ) -> Result<Option<i32>, SessionError> {
        let mut decoder = Utf8ChunkDecoder::new();

        // Ends once every reader has dropped its sender
        for event in self.events.iter() {
            match event {
                SessionEvent::Output(bytes) => {
                    let text = decoder.decode(&bytes);
                    if !text.is_empty() {
                        emulator.feed(&text);
                    }
                }
                SessionEvent::Closed(stream) => debug!("{} closed", stream),
            }
        }

        let rest = decoder.finish();
        if !rest.is_empty() {
            emulator.feed(&rest);
        }
        emulator.flush_remaining();

        for handle in self.readers.drain(..) {
            if handle.join().is_err() {
                warn!("reader thread panicked");
            }
        }

        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };
        let status = child.wait().map_err(SessionError::Wait)?;
        info!("child exited with {}", status);
        Ok(Some(exit_code(status)))
    }
}

/// Shell convention: a child killed by signal N exits with 128 + N
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

impl Drop for Session {
    fn drop(&mut self) {
        // Dropped before `run` finished: don't leave the child behind
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    name: &'static str,
    mut reader: R,
    chunk_size: usize,
    tx: Sender<SessionEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut buffer = vec![0u8; chunk_size.max(1)];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(SessionEvent::Output(buffer[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("read from {} failed: {}", name, e);
                    break;
                }
            }
        }

        let _ = tx.send(SessionEvent::Closed(name));
    })
}
