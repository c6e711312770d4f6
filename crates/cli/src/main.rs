//! `repcrec`: drive a RepCRec command script and print the resulting output stream.
//!
//! Reads commands one line at a time from a file (or stdin, given `-`), dispatches each
//! to a [`Coordinator`], and prints the formatted result. The logical clock advances by
//! exactly one after every non-blank, non-comment line, regardless of whether that line
//! succeeded — see `spec.md` section 5.

mod error;
mod format;
mod parse;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use repcrec_concurrency::{Coordinator, Event, ValidatorMode};
use repcrec_core::CoordinatorError;

use crate::error::CliError;
use crate::parse::Command;

/// Which SSI acceptance criterion to enforce at commit time.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ValidatorArg {
    /// Reject on any cycle in the multiversion serialization graph.
    Cycle,
    /// Reject only on Cahill's "dangerous structure" (two consecutive rw edges).
    DangerousStructure,
}

impl From<ValidatorArg> for ValidatorMode {
    fn from(arg: ValidatorArg) -> Self {
        match arg {
            ValidatorArg::Cycle => ValidatorMode::Cycle,
            ValidatorArg::DangerousStructure => ValidatorMode::DangerousStructure,
        }
    }
}

/// Run a RepCRec command script.
#[derive(Debug, Parser)]
#[command(name = "repcrec", version, about)]
struct Args {
    /// Path to the command script, or `-` to read from stdin.
    input: PathBuf,

    /// Which SSI acceptance criterion the coordinator applies at commit time.
    #[arg(long, value_enum, default_value = "cycle")]
    validator: ValidatorArg,

    /// Increase log verbosity (stackable: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging (takes priority over -v).
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);
    tracing::info!(validator = ?args.validator, "starting repcrec");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if quiet {
        "off"
    } else {
        match verbose {
            0 => "repcrec=info",
            1 => "repcrec=debug",
            _ => "repcrec=trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn run(args: &Args) -> Result<(), CliError> {
    let reader: Box<dyn BufRead> = if args.input == PathBuf::from("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };

    let mut coordinator = Coordinator::new(args.validator.into());

    for line in reader.lines() {
        let line = line?;
        match parse::parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => {
                dispatch(&mut coordinator, command);
                coordinator.advance();
            }
            Err(err) if err.is_input() => return Err(CliError::Coordinator(err)),
            Err(err) => {
                // Semantic error from parsing (out-of-range variable/site): log and
                // move on, same as a semantic error from executing a command.
                report_semantic_error(&err);
                coordinator.advance();
            }
        }
    }

    Ok(())
}

fn dispatch(coordinator: &mut Coordinator, command: Command) {
    let result = match command {
        Command::Begin { txn } => coordinator.begin(&txn),
        Command::Read { txn, var } => coordinator.read(&txn, var),
        Command::Write { txn, var, value } => coordinator.write(&txn, var, value),
        Command::End { txn } => coordinator.end(&txn),
        Command::Fail { site } => Ok(coordinator.fail(site)),
        Command::Recover { site } => Ok(coordinator.recover(site)),
        Command::Dump => Ok(coordinator.dump()),
    };

    match result {
        Ok(event) => print_event(&event),
        Err(err) => report_semantic_error(&err),
    }
}

fn print_event(event: &Event) {
    for line in format::format_event(event) {
        println!("{line}");
    }
}

fn report_semantic_error(err: &CoordinatorError) {
    tracing::warn!(%err, "semantic error");
    eprintln!("{err}");
}
