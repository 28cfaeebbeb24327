//! CLI argument parsing for the proof stepper.
//!
//! The CLI only wires files and the verifier into the navigation controller;
//! stepping policy lives in the controller so an editor host can reuse it.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "pstep",
    version,
    about = "Step through a proof script against an external verifier",
    after_help = "Session commands:\n  open <FILE>   Focus a script, resuming its checkpoint\n  next          Verify one more line, or retry the failed line\n  back          Step back one line\n  cursor <N>    Verify through line N\n  line <N>      Verify through line N (0 resets)\n  end           Verify the whole script\n  reset         Forget verified progress\n  reload        Re-read the script and re-verify edited lines\n  status        Show the current checkpoint\n  quit          Leave the session\n\nExamples:\n  pstep check proof.dd\n  pstep --verifier 'python -m deduckprover.vscode' check proof.dd --line 12\n  pstep session proof.dd --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// JSON file with the verifier command, working_dir and env
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Verifier command line (overrides PSTEP_VERIFIER)
    #[arg(long, value_name = "CMD", global = true, conflicts_with = "config")]
    pub verifier: Option<String>,

    /// Emit debug logs on stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Check(CheckArgs),
    Session(SessionArgs),
}

/// One-shot verification of a script prefix.
#[derive(Parser, Debug)]
#[command(about = "Verify a script once and exit non-zero if it is rejected")]
pub struct CheckArgs {
    /// Proof script to verify
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Verify through this 1-based line instead of the whole script
    #[arg(long, value_name = "N")]
    pub line: Option<usize>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Interactive stepping over stdin commands.
#[derive(Parser, Debug)]
#[command(about = "Read stepping commands from stdin, one per line")]
pub struct SessionArgs {
    /// Script to open before reading commands
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Emit one JSON object per command
    #[arg(long)]
    pub json: bool,
}
