use std::fmt;
use std::sync::Arc;

use quest_core::model::SubRoundRef;
use services::{AppServices, Clock, Selection};
use tracing_subscriber::EnvFilter;

mod play;
mod render;

const DEFAULT_DB_URL: &str = "sqlite://quest.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSeed { raw: String },
    InvalidDbUrl { raw: String },
    InvalidSubRound { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSubRound { raw } => {
                write!(f, "invalid --at value: {raw} (expected e.g. L1-R2-S3)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- status   [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- play     [--db <sqlite_url>] [--seed <u64>] [--at L1-R1-S1]");
    eprintln!("  cargo run -p app -- attempts [--db <sqlite_url>] [--at L1-R1-S1]");
    eprintln!("  cargo run -p app -- reset    [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --at the current frontier");
    eprintln!("  --seed drawn from the clock (only used when a new quest is created)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUEST_DB_URL, QUEST_SEED, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Play,
    Attempts,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "play" => Some(Self::Play),
            "attempts" => Some(Self::Attempts),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    seed: Option<u64>,
    at: Option<SubRoundRef>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUEST_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut seed = std::env::var("QUEST_SEED")
            .ok()
            .and_then(|value| value.parse::<u64>().ok());
        let mut at = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--seed" => {
                    let value = require_value(args, "--seed")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                    seed = Some(parsed);
                }
                "--at" => {
                    let value = require_value(args, "--at")?;
                    let parsed: SubRoundRef = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSubRound { raw: value.clone() })?;
                    at = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, seed, at })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Without a subcommand, show where the player stands.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Status,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Status,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let clock = Clock::default();
    let selection = parsed
        .seed
        .map_or_else(|| Selection::from_clock(clock), |seed| Selection::Shuffled { seed });
    let mut services = AppServices::new_sqlite(&parsed.db_url, clock, selection)
        .await?
        .with_reward_sink(Arc::new(render::TerminalRewards));

    match cmd {
        Command::Status => render::print_status(services.store().progress()),
        Command::Play => play::run(&mut services, parsed.at).await?,
        Command::Attempts => {
            let store = services.store();
            match parsed.at.or_else(|| store.current_frontier()) {
                Some(at) => render::print_attempts(at, &store.list_attempts(at).await?),
                None => println!("Quest complete. Pass --at to pick a sub-round."),
            }
        }
        Command::Reset => {
            services.store_mut().reset()?;
            println!("Progress reset. Your question set is unchanged.");
        }
    }

    services.store().flush().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
