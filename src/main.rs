use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod checkpoint;
mod cli;
mod config;
mod controller;
mod document;
mod invalidation;
mod output;
mod session;
mod util;
mod verifier;

use checkpoint::CheckpointStore;
use cli::{CheckArgs, Command, RootArgs, SessionArgs};
use controller::NavigationController;
use document::ScriptDocument;
use output::{write_report, OutputFormat, Report};
use session::{Session, SessionCommand};
use verifier::VerifierProcess;

fn main() -> Result<ExitCode> {
    let args = RootArgs::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = config::resolve_config(args.config.as_deref(), args.verifier.as_deref())?;
    let verifier = VerifierProcess::spawn(&config)?;
    let controller = NavigationController::new(verifier, CheckpointStore::new());

    match args.command {
        Command::Check(args) => run_check(controller, args),
        Command::Session(args) => run_session(controller, args),
    }
}

fn run_check(
    mut controller: NavigationController<VerifierProcess>,
    args: CheckArgs,
) -> Result<ExitCode> {
    let doc = session::load_document(&args.file)?;
    let outcome = match args.line {
        Some(line) => controller.run_to_line(&doc, line.checked_sub(1)),
        None => controller.run_to_end(&doc),
    }
    .with_context(|| format!("verify {}", args.file.display()))?;

    let id = doc.id().clone();
    let report = Report::new(id.clone(), controller.checkpoint(&id), Some(outcome));
    let format = OutputFormat::from_json_flag(args.json);
    write_report(&mut io::stdout().lock(), format, &report)?;
    if report.is_rejected() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_session(
    controller: NavigationController<VerifierProcess>,
    args: SessionArgs,
) -> Result<ExitCode> {
    let format = OutputFormat::from_json_flag(args.json);
    let mut session = Session::new(controller, format);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(file) = args.file {
        let report = session.execute(SessionCommand::Open(file))?;
        write_report(&mut out, format, &report)?;
    }
    session.run(io::stdin().lock(), &mut out)?;
    Ok(ExitCode::SUCCESS)
}
