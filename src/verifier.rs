//! Client for the long-lived external verifier process.
//!
//! # Protocol
//!
//! Each request is a script prefix written to the verifier's stdin and
//! terminated by `\n\x03\n`. The verifier answers exactly once:
//!
//! - success: the rendered proof state as UTF-8 on stdout
//! - rejection: one JSON object on stderr
//!
//! ```text
//! {"lineFailed": 4, "lineChecked": 3, "state": "...", "message": "..."}
//! ```
//!
//! The first chunk read from either stream is the whole reply. Replies carry
//! no request id, so requests are strictly serialized: `verify` takes
//! `&mut self` and blocks until the reply has been parsed.
//!
//! # Termination
//!
//! The process is spawned once and never respawned. Once either output
//! stream closes or a request cannot be written, every later call fails with
//! [`VerifierError::ProcessTerminated`].
use crate::config::VerifierConfig;
use crate::util::truncate_string;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Instant;
use thiserror::Error;

/// Bytes appended to every request payload.
pub(crate) const REQUEST_TERMINATOR: &str = "\n\x03\n";

const READ_CHUNK_BYTES: usize = 64 * 1024;
const MAX_PAYLOAD_IN_ERROR: usize = 512;

/// Result of one verification round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub(crate) enum VerificationOutcome {
    /// Every line of the prefix verified.
    Success { proof_state: String },
    /// The verifier rejected the prefix.
    Failure(ProofFailure),
}

/// Rejection details reported by the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ProofFailure {
    /// First line that failed.
    pub(crate) failed_line: usize,
    /// Last line that was checked successfully, if any.
    pub(crate) checked_line: Option<usize>,
    /// Proof state at the point of failure.
    pub(crate) state: String,
    pub(crate) message: String,
}

impl VerificationOutcome {
    pub(crate) fn empty() -> Self {
        Self::Success {
            proof_state: String::new(),
        }
    }

    /// Whether the proof state reports a finished proof.
    pub(crate) fn is_complete(&self) -> bool {
        matches!(self, Self::Success { proof_state } if proof_state.contains("Q.E.D."))
    }
}

/// Errors that abort a verification round trip.
#[derive(Debug, Error)]
pub(crate) enum VerifierError {
    #[error("failed to start verifier `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("verifier process terminated: {detail}")]
    ProcessTerminated { detail: String },

    #[error("malformed verifier reply ({reason}): {payload}")]
    Protocol { reason: String, payload: String },
}

/// Turns a script prefix into a verification outcome.
pub(crate) trait Verifier {
    fn verify(&mut self, script: &str) -> Result<VerificationOutcome, VerifierError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn label(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

#[derive(Debug)]
enum StreamEvent {
    Data(Stream, Vec<u8>),
    Closed(Stream),
}

/// Wire shape of a rejection reply.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FailureReply {
    line_failed: i64,
    line_checked: i64,
    state: String,
    message: String,
}

/// The verifier process and its reply channel.
pub(crate) struct VerifierProcess {
    child: Child,
    stdin: ChildStdin,
    replies: Receiver<StreamEvent>,
    terminated: Option<String>,
}

impl VerifierProcess {
    /// Spawn the verifier described by `config`.
    pub(crate) fn spawn(config: &VerifierConfig) -> Result<Self, VerifierError> {
        let program = config.program().to_string();
        let mut command = Command::new(&program);
        command
            .args(config.args())
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }
        let mut child = command.spawn().map_err(|source| VerifierError::Spawn {
            program: program.clone(),
            source,
        })?;

        let (stdin, stdout, stderr) = match (
            child.stdin.take(),
            child.stdout.take(),
            child.stderr.take(),
        ) {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VerifierError::ProcessTerminated {
                    detail: "verifier pipes unavailable".to_string(),
                });
            }
        };

        let (tx, replies) = mpsc::channel();
        forward_stream(stdout, Stream::Stdout, tx.clone());
        forward_stream(stderr, Stream::Stderr, tx);

        tracing::info!(program = %program, pid = child.id(), "verifier spawned");
        Ok(Self {
            child,
            stdin,
            replies,
            terminated: None,
        })
    }

    fn terminate(&mut self, cause: &str) -> VerifierError {
        let status = match self.child.try_wait() {
            Ok(Some(status)) => status.to_string(),
            Ok(None) => "still running".to_string(),
            Err(err) => format!("status unknown: {err}"),
        };
        let detail = format!("{cause} ({status})");
        tracing::error!(detail = %detail, "verifier terminated");
        self.terminated = Some(detail.clone());
        VerifierError::ProcessTerminated { detail }
    }

    /// Discard output that arrived while no request was in flight.
    ///
    /// Best effort: only chunks already received are seen. Output that lands
    /// after the drain is taken as the reply to the next request.
    fn drain_stale(&mut self) -> Result<(), VerifierError> {
        loop {
            match self.replies.try_recv() {
                Ok(StreamEvent::Data(stream, bytes)) => {
                    tracing::warn!(
                        stream = stream.label(),
                        bytes = bytes.len(),
                        "discarding unsolicited verifier output"
                    );
                }
                Ok(StreamEvent::Closed(stream)) => {
                    return Err(self.terminate(&format!("{} closed", stream.label())));
                }
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    return Err(self.terminate("output streams closed"));
                }
            }
        }
    }

    fn send(&mut self, script: &str) -> Result<(), VerifierError> {
        let mut request = String::with_capacity(script.len() + REQUEST_TERMINATOR.len());
        request.push_str(script);
        request.push_str(REQUEST_TERMINATOR);
        let written = self
            .stdin
            .write_all(request.as_bytes())
            .and_then(|()| self.stdin.flush());
        // A partial write leaves an unterminated request on the pipe.
        match written {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                Err(self.terminate("stdin closed"))
            }
            Err(err) => Err(self.terminate(&format!("request write failed: {err}"))),
        }
    }
}

impl Verifier for VerifierProcess {
    fn verify(&mut self, script: &str) -> Result<VerificationOutcome, VerifierError> {
        if let Some(detail) = &self.terminated {
            return Err(VerifierError::ProcessTerminated {
                detail: detail.clone(),
            });
        }
        self.drain_stale()?;

        let start = Instant::now();
        self.send(script)?;
        let reply = match self.replies.recv() {
            Ok(StreamEvent::Data(stream, bytes)) => parse_reply(stream, &bytes),
            Ok(StreamEvent::Closed(stream)) => {
                Err(self.terminate(&format!("{} closed", stream.label())))
            }
            Err(_) => Err(self.terminate("output streams closed")),
        };
        tracing::info!(
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            request_bytes = script.len(),
            ok = reply.is_ok(),
            "verify complete"
        );
        reply
    }
}

impl Drop for VerifierProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Forward raw chunks from one output stream until it closes.
fn forward_stream<R>(mut reader: R, stream: Stream, tx: Sender<StreamEvent>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(StreamEvent::Data(stream, buf[..n].to_vec())).is_err() {
                        return;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::warn!(stream = stream.label(), error = %err, "verifier read failed");
                    break;
                }
            }
        }
        let _ = tx.send(StreamEvent::Closed(stream));
    });
}

/// Interpret one reply chunk according to the stream it arrived on.
fn parse_reply(stream: Stream, bytes: &[u8]) -> Result<VerificationOutcome, VerifierError> {
    let text = String::from_utf8_lossy(bytes);
    match stream {
        Stream::Stdout => Ok(VerificationOutcome::Success {
            proof_state: text.into_owned(),
        }),
        Stream::Stderr => parse_failure(&text).map(VerificationOutcome::Failure),
    }
}

fn parse_failure(text: &str) -> Result<ProofFailure, VerifierError> {
    let protocol_error = |reason: String| {
        tracing::warn!(reason = %reason, "malformed verifier reply");
        VerifierError::Protocol {
            reason,
            payload: truncate_string(text.trim(), MAX_PAYLOAD_IN_ERROR),
        }
    };
    let reply: FailureReply = serde_json::from_str(text.trim())
        .map_err(|err| protocol_error(format!("invalid failure JSON: {err}")))?;
    let failed_line = usize::try_from(reply.line_failed)
        .map_err(|_| protocol_error(format!("negative lineFailed {}", reply.line_failed)))?;
    let checked_line = usize::try_from(reply.line_checked).ok();
    if checked_line.is_some_and(|checked| checked >= failed_line) {
        return Err(protocol_error(format!(
            "lineChecked {} is not before lineFailed {}",
            reply.line_checked, reply.line_failed
        )));
    }
    Ok(ProofFailure {
        failed_line,
        checked_line,
        state: reply.state,
        message: reply.message,
    })
}

#[cfg(test)]
#[path = "verifier_tests.rs"]
mod tests;
