use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fluxpipe_contracts::chat::FLAG_PREFIX;
use fluxpipe_contracts::events::EventWriter;
use fluxpipe_contracts::params::{parse_line, FLAG_SPECS};
use fluxpipe_contracts::results::is_error_output;
use fluxpipe_engine::{DispatcherConfig, Pipeline, DEFAULT_MODEL};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(
    name = "fluxpipe",
    version,
    about = "Turn a prompt line with --flags into a FLUX image generation request"
)]
struct Cli {
    #[command(flatten)]
    dispatch: DispatchArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a line, call the provider, print markdown or `Error: ...`.
    Run(LineArgs),
    /// Validate a line and print the provider payload without sending it.
    Parse(LineArgs),
    /// Read lines from stdin and run each one.
    Chat,
    /// List the recognized flags.
    Flags,
}

#[derive(Debug, Args)]
struct DispatchArgs {
    /// Overrides REPLICATE_API_TOKEN.
    #[arg(long, global = true)]
    api_token: Option<String>,
    /// Overrides REPLICATE_API_BASE.
    #[arg(long, global = true)]
    api_base: Option<String>,
    #[arg(long, global = true, default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, global = true, default_value_t = 90)]
    timeout_secs: u64,
    /// Append request events to this JSONL file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    /// Answer with a fake URL instead of calling the provider.
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct LineArgs {
    /// The request line, e.g. `a red fox --aspect_ratio 16:9`.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    line: Vec<String>,
}

const QUIT_COMMAND: &str = "/quit";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("fluxpipe error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => {
            let pipeline = build_pipeline(&cli.dispatch)?;
            let output = pipeline.run(&join_line(&args.line));
            println!("{output}");
            Ok(exit_code(&output))
        }
        Command::Parse(args) => run_parse(&join_line(&args.line)),
        Command::Chat => {
            run_chat(&build_pipeline(&cli.dispatch)?)?;
            Ok(0)
        }
        Command::Flags => {
            for spec in FLAG_SPECS {
                println!("--{:<20} {:?}", spec.name, spec.kind);
            }
            Ok(0)
        }
    }
}

fn build_pipeline(args: &DispatchArgs) -> Result<Pipeline> {
    let config = DispatcherConfig::from_env(args.api_token.clone(), args.api_base.clone())
        .with_model(args.model.as_str())
        .with_timeout(Duration::from_secs(args.timeout_secs.max(1)))
        .with_dry_run(args.dry_run);
    log::debug!("dispatcher config: {config:?}");
    let pipeline = Pipeline::from_config(&config)?;
    Ok(match &args.events {
        Some(path) => pipeline.with_events(EventWriter::new(path, "fluxpipe")),
        None => pipeline,
    })
}

fn run_parse(line: &str) -> Result<i32> {
    match parse_line(line) {
        Ok(built) => {
            let payload = json!({
                "input": built.request.input_payload(),
                "warnings": built.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(0)
        }
        Err(err) => {
            println!("Error: {err}");
            Ok(1)
        }
    }
}

fn run_chat(pipeline: &Pipeline) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    eprintln!("{} ready. Type {QUIT_COMMAND} to exit.", pipeline.name());
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == QUIT_COMMAND {
            break;
        }
        writeln!(stdout, "{}", pipeline.run(trimmed))?;
        stdout.flush()?;
    }
    Ok(())
}

/// Rebuilds one request line from shell arguments. A single argument is
/// taken verbatim; otherwise arguments that contain whitespace are
/// re-quoted so `--prompt "a red fox"` survives the shell.
/// Rebuilds one request line from shell arguments. Prompt words pass
/// through untouched; in the flag section every non-flag argument is
/// shell-quoted so it reads back as a single value.
fn join_line(parts: &[String]) -> String {
    if let [single] = parts {
        return single.clone();
    }
    let flags_at = parts
        .iter()
        .position(|part| part.starts_with(FLAG_PREFIX))
        .unwrap_or(parts.len());
    let (prompt, flags) = parts.split_at(flags_at);
    prompt
        .iter()
        .cloned()
        .chain(flags.iter().map(|part| {
            if part.starts_with(FLAG_PREFIX) {
                part.clone()
            } else {
                shell_words::quote(part).into_owned()
            }
        }))
        .collect::<Vec<String>>()
        .join(" ")
}

fn exit_code(output: &str) -> i32 {
    if is_error_output(output) {
        1
    } else {
        0
    }
}
