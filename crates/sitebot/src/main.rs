//! Replays recorded conversations against a website checkout, and shows
//! what was said in them.

#[macro_use]
extern crate tracing;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use sitebot::core::partner::TRACE_URL_KEY;
use sitebot::core::{DEFAULT_MAX_ITERATIONS, StopReason};
use sitebot::transcript::{self, DEFAULT_WIDTH};
use sitebot::{ConfigBuilder, DEFAULT_LOG_DIR, SessionBuilder};

const BAR_CHAR: &str = "▎";

/// A website maintenance agent answering with recorded conversations.
#[derive(Debug, Parser)]
#[command(name = "sitebot", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Work on an instruction for the website, answering with a recorded
    /// conversation.
    Run(RunArgs),
    /// Print a recorded conversation as speech bubbles.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// The instruction to work on.
    instruction: String,

    /// Recorded conversation file to replay.
    #[arg(long, env = "SITEBOT_CONVERSATION")]
    conversation: PathBuf,

    /// Website checkout the tools work in.
    #[arg(long, env = "SITEBOT_WEBSITE_DIR", default_value = ".")]
    website_dir: PathBuf,

    /// Directory conversations are logged into.
    #[arg(long, env = "SITEBOT_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Don't log the conversation to disk.
    #[arg(long, env = "SITEBOT_NO_LOG")]
    no_log: bool,

    /// Maximum number of partner calls.
    #[arg(
        long,
        env = "SITEBOT_MAX_ITERATIONS",
        default_value_t = DEFAULT_MAX_ITERATIONS
    )]
    max_iterations: usize,

    /// Fail on the first prompt that differs from the recording.
    #[arg(long, env = "SITEBOT_STRICT_REPLAY")]
    strict_replay: bool,

    /// Template of trace links, with `{trace_id}`, `{start_ts}` and
    /// `{end_ts}` placeholders.
    #[arg(long, env = "SITEBOT_TRACE_URL_TEMPLATE")]
    trace_url_template: Option<String>,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Conversation file to show, as logged or recorded.
    file: PathBuf,

    /// Width of the terminal to lay the bubbles out for.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Run(args) => run(args).await,
        Command::Show(args) => show(args),
    }
}

async fn run(args: RunArgs) -> ExitCode {
    let mut config = ConfigBuilder::new()
        .with_website_dir(args.website_dir)
        .with_log_dir(args.log_dir)
        .with_max_iterations(args.max_iterations)
        .with_strict_replay(args.strict_replay);
    if args.no_log {
        config = config.without_log();
    }
    if let Some(template) = args.trace_url_template {
        config = config.with_trace_url_template(template);
    }

    let builder = SessionBuilder::with_recorded_conversation(
        &args.conversation,
        config.build(),
    );
    let session = match builder {
        Ok(builder) => builder.build(),
        Err(err) => return fail(&err),
    };

    let report = session.run_instruction(&args.instruction).await;

    let bar = if report.stop_reason == StopReason::Final {
        BAR_CHAR.bright_cyan().to_string()
    } else {
        BAR_CHAR.bright_yellow().to_string()
    };
    println!("{bar}🤖 {}", report.text.bright_white());
    if let Some(url) = report.metadata.get(TRACE_URL_KEY).and_then(|url| url.as_str()) {
        println!("{bar}🔎 {}", url.underline());
    }

    if report.stop_reason == StopReason::Final {
        ExitCode::SUCCESS
    } else {
        eprintln!(
            "{} stopped after {} iterations ({})",
            "warning:".bright_yellow().bold(),
            report.iterations,
            report.stop_reason
        );
        ExitCode::FAILURE
    }
}

fn show(args: ShowArgs) -> ExitCode {
    match transcript::render_file(&args.file, args.width) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => fail(&err),
    }
}

fn fail(err: &dyn std::error::Error) -> ExitCode {
    error!("{err}");
    eprintln!("{} {err}", "error:".bright_red().bold());
    ExitCode::FAILURE
}
