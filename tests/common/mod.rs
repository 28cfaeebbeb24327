//! Shared test infrastructure for integration tests.
//!
//! Every test runs the `pstep` binary against `tests/mock-verifier.sh`, which
//! rejects the first line containing `sorry`, answers `garbage` with a
//! non-JSON reply, and exits on `crash`.
#![allow(dead_code)]

use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Output, Stdio};
use tempfile::TempDir;

/// Scratch directory holding a verifier config and proof scripts.
pub struct Workspace {
    pub dir: TempDir,
    pub config: PathBuf,
}

impl Workspace {
    pub fn create() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = dir.path().join("verifier.json");
        write_mock_config(&config);
        Self { dir, config }
    }

    /// Write (or overwrite) a proof script and return its path.
    pub fn script(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, text).expect("write script");
        path
    }

    pub fn pstep(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_pstep"));
        command
            .arg("--config")
            .arg(&self.config)
            .env_remove("RUST_LOG")
            .env_remove("PSTEP_VERIFIER");
        command
    }

    /// `pstep` with no `--config`, isolated from the caller's environment.
    ///
    /// The user config directory points at `<workspace>/xdg`, which holds
    /// no config until a test writes one with [`Workspace::user_config`].
    pub fn pstep_unconfigured(&self) -> Command {
        let xdg = self.dir.path().join("xdg");
        let mut command = Command::new(env!("CARGO_BIN_EXE_pstep"));
        command
            .env_remove("RUST_LOG")
            .env_remove("PSTEP_VERIFIER")
            .env("XDG_CONFIG_HOME", &xdg)
            .env("HOME", self.dir.path());
        command
    }

    /// Install the mock verifier config as the user-level `pstep/verifier.json`.
    pub fn user_config(&self) -> PathBuf {
        let dir = self.dir.path().join("xdg/pstep");
        std::fs::create_dir_all(&dir).expect("create user config dir");
        let path = dir.join("verifier.json");
        write_mock_config(&path);
        path
    }

    pub fn check(&self, args: &[&str]) -> Output {
        self.pstep()
            .arg("check")
            .args(args)
            .output()
            .expect("run pstep check")
    }

    /// Start an interactive JSON session, optionally opening `file` first.
    pub fn session(&self, file: Option<&Path>) -> SessionDriver {
        let mut command = self.pstep();
        command.arg("session").arg("--json");
        if let Some(file) = file {
            command.arg(file);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn pstep session");
        let stdin = child.stdin.take().expect("session stdin");
        let stdout = BufReader::new(child.stdout.take().expect("session stdout"));
        SessionDriver {
            child,
            stdin: Some(stdin),
            stdout,
        }
    }
}

pub fn mock_script() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/mock-verifier.sh")
}

/// The mock verifier as a shell-style command line.
pub fn mock_command_line() -> String {
    format!("sh {}", shell_words::quote(&mock_script().display().to_string()))
}

fn write_mock_config(path: &Path) {
    let body = serde_json::json!({
        "command": ["sh", mock_script().display().to_string()],
    });
    std::fs::write(path, body.to_string()).expect("write verifier config");
}

/// Sends one command at a time and reads its single JSON reply line.
pub struct SessionDriver {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl SessionDriver {
    pub fn read_reply(&mut self) -> Value {
        let mut line = String::new();
        self.stdout.read_line(&mut line).expect("read session reply");
        assert!(!line.is_empty(), "session closed its output");
        serde_json::from_str(&line).unwrap_or_else(|err| panic!("bad reply {line:?}: {err}"))
    }

    pub fn send(&mut self, command: &str) -> Value {
        let stdin = self.stdin.as_mut().expect("session stdin open");
        writeln!(stdin, "{command}").expect("write session command");
        stdin.flush().expect("flush session command");
        self.read_reply()
    }

    /// Close stdin and wait for the session to exit.
    pub fn finish(mut self) -> Output {
        drop(self.stdin.take());
        self.child.wait_with_output().expect("wait for session")
    }
}

pub fn passed(reply: &Value) -> Option<u64> {
    reply["checkpoint"]["passed"].as_u64()
}

pub fn failed(reply: &Value) -> Option<u64> {
    reply["checkpoint"]["failed"].as_u64()
}
