//! Command line interface for termrec.

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use termrec::{PlaybackConfig, RecordConfig, Recorder};

/// Record terminal sessions and play them back at the recorded pace.
#[derive(Debug, Parser)]
#[command(name = "termrec", version, about)]
struct Cli {
    /// Log filter, e.g. `debug` or `termrec=trace`.
    #[arg(
        long,
        global = true,
        env = "TERMREC_LOG",
        default_value = termrec::telemetry::DEFAULT_LEVEL
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record a shell session into a file.
    Record {
        /// Where to write the recording.
        path: Option<PathBuf>,
    },
    /// Play a recording from a file or an http(s) URL.
    Play {
        /// Path or URL of the recording.
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    termrec::telemetry::init(&cli.log_level);

    match run(cli.command).await {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", cause_chain(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> termrec::Result<String> {
    match command {
        Command::Record { path } => {
            let path = path.unwrap_or_default();
            let summary = Recorder::new(RecordConfig::from_env()).record(&path).await?;
            Ok(format!("recording saved to {}", summary.path.display()))
        }
        Command::Play { source } => {
            let source = source.unwrap_or_default();
            termrec::play(&source, PlaybackConfig::from_env()).await?;
            Ok("playback complete".to_string())
        }
    }
}

/// Render an error with its sources, skipping causes already quoted by
/// their parent's message.
fn cause_chain(error: &termrec::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
