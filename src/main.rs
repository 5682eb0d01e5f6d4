//! cbot — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse the command line
//!   3. Load config, init logger at the configured level
//!   4. Open the store (fatal on failure) and build the model dispatcher
//!   5. Run exactly one mode, then close the store

mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};

use cbot::actions::{self, Execution};
use cbot::error::AppError;
use cbot::llm::providers;
use cbot::session::{self, Session};
use cbot::store::Store;
use cbot::{config, logger};

use cli::{Cli, Mode};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode, AppError> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = config::load()?;
    logger::init(&config.log_level)?;

    let store = Store::open_default()?;
    info!(path = %store.path().display(), "store ready");

    let dispatcher = providers::build(&config.llm)?;
    let mut session = Session::new(store, dispatcher, &config);
    if let Some(model) = cli.model() {
        session = session.with_model(model);
    }
    info!(model = %session.model(), "session ready");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let code = match cli.mode() {
        Mode::Agent => {
            session.run_agent(io::stdin().lock(), &mut out)?;
            ExitCode::SUCCESS
        }
        Mode::Shortcut { question, answer } => {
            writeln!(out, "Saving Shortcut")?;
            session.define_shortcut(&question, &answer)?;
            ExitCode::SUCCESS
        }
        Mode::History => {
            writeln!(out, "CHAT HISTORY (last {} messages):", session.history_limit())?;
            session::render_history(&mut out, &session.history()?)?;
            ExitCode::SUCCESS
        }
        Mode::Ask(question) => ask(&mut session, &cli, &question, &mut out)?,
        Mode::Idle => {
            writeln!(out, "No question given. Run `cbot --help` for usage.")?;
            ExitCode::SUCCESS
        }
    };

    if let Err(e) = session.into_store().close() {
        warn!(error = %e, "store did not close cleanly");
    }
    Ok(code)
}

/// Direct-question mode: cache first, model on a miss, then the optional
/// clipboard/execute actions.
fn ask(
    session: &mut Session,
    cli: &Cli,
    question: &str,
    out: &mut impl Write,
) -> Result<ExitCode, AppError> {
    let answer = match session.lookup(question) {
        Some(answer) => {
            writeln!(out, "💾 Cache Hit")?;
            answer
        }
        None => {
            writeln!(out, "-> Cache Miss")?;
            out.flush()?;
            match session.fetch(question, cli.question_mode()) {
                Ok(answer) => answer,
                Err(e) => {
                    writeln!(out, "Failed to get answer from API: {e}")?;
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    };
    writeln!(out, "{answer}")?;

    if cli.clip {
        if let Err(e) = actions::copy_to_clipboard(&answer) {
            warn!(error = %e, "clipboard copy failed");
            writeln!(out, "Could not copy to clipboard: {e}")?;
        }
    }
    if cli.execute {
        if let Execution::Ran { status, .. } = actions::execute(&answer, out)? {
            if !status.success() {
                writeln!(out, "command exited with {status}")?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
