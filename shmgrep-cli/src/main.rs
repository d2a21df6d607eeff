use clap::{Parser, Subcommand};
use colored::Colorize;
use shmgrep::{
    config::{EncodingMode, RunConfig},
    input::read_lines,
    orchestrator::{self, ChannelNames, SourceSession},
    GrepError,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, GrepError>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct RunArgs {
    /// File whose lines are streamed to the worker
    file: PathBuf,

    /// Word to match (whole-word, case-insensitive)
    word: String,

    /// Number of matcher shards in the worker
    #[arg(short = 'j', long)]
    shards: Option<NonZeroUsize>,

    /// Show only statistics, not matching lines
    #[arg(short, long)]
    stats: bool,

    /// How to handle invalid UTF-8 in the input (failfast|lossy)
    #[arg(long, default_value = "failfast")]
    encoding: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a file for a word using a shared-memory worker process
    Run(Box<RunArgs>),

    /// Worker role driven by `run`; not intended for direct use
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        session: String,

        #[arg(long)]
        word: String,

        #[arg(long, default_value = "4")]
        shards: NonZeroUsize,
    },
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_source(*args),
        Commands::Worker {
            session,
            word,
            shards,
        } => {
            init_logging("warn");
            let names = ChannelNames::for_session(&session);
            orchestrator::run_worker(&names, &word, shards)
        }
    }
}

fn run_source(args: RunArgs) -> Result<()> {
    let file_config = RunConfig::load_from(args.config.as_deref())
        .map_err(|e| GrepError::config_error(e.to_string()))?;

    let encoding_mode = match args.encoding.to_lowercase().as_str() {
        "lossy" => EncodingMode::Lossy,
        _ => EncodingMode::FailFast,
    };

    let mut cli_config = RunConfig {
        word: args.word,
        file_path: args.file,
        stats_only: args.stats,
        encoding: encoding_mode,
        ..RunConfig::default()
    };
    if let Some(shards) = args.shards {
        cli_config.shard_count = shards;
    }
    if let Some(level) = args.log_level {
        cli_config.log_level = level;
    }

    let config = file_config.merge_with_cli(cli_config);
    init_logging(&config.log_level);

    let lines = read_lines(&config.file_path, config.encoding)?;

    let session = orchestrator::new_session_id();
    let names = ChannelNames::for_session(&session);
    // Resources must exist before the worker starts, so attach never races
    let source = SourceSession::create(&names)?;

    let exe = std::env::current_exe()?;
    let mut child = Command::new(exe)
        .arg("worker")
        .arg("--session")
        .arg(&session)
        .arg("--word")
        .arg(&config.word)
        .arg("--shards")
        .arg(config.shard_count.to_string())
        .spawn()?;
    debug!("spawned worker process {}", child.id());

    let sent = source.send_lines(&lines)?;
    let matches = source.collect_matches(|line| {
        if !config.stats_only {
            println!("{}", line);
        }
    })?;

    let status = child.wait()?;
    if !status.success() {
        return Err(GrepError::Worker(status.code().unwrap_or(-1)));
    }

    source.metrics().log_stats();
    print_summary(lines.len(), sent, matches.len());

    // The session drops here, after the worker has been waited on, which
    // unlinks the mailbox and all four semaphores exactly once.
    drop(source);
    Ok(())
}

fn print_summary(total_lines: usize, sent: usize, matches: usize) {
    if sent < total_lines {
        println!(
            "\nFound {} matching lines out of {} ({} skipped as oversized)",
            matches.to_string().green(),
            total_lines,
            (total_lines - sent).to_string().yellow()
        );
    } else {
        println!(
            "\nFound {} matching lines out of {}",
            matches.to_string().green(),
            total_lines
        );
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
