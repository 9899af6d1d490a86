use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use period_engine::{
    invert, parse, parse_date, DateFormatter, FieldNames, LocaleRegistry, RangeState, StateBlob,
    StateCodec,
};
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "period",
    version,
    about = "Align, shift, format and merge calendar-rule date ranges"
)]
struct Cli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the range a rule selects around a date (default: today)
    Align {
        #[arg(long, allow_hyphen_values = true)]
        rule: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Move a range starting at DATE one period forward, or back with --back
    Shift {
        #[arg(long, allow_hyphen_values = true)]
        rule: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        back: bool,
    },
    /// Flip the sign of a rule token
    Invert {
        #[arg(allow_hyphen_values = true)]
        token: String,
    },
    /// Render a date with a locale's format spec
    Format {
        #[arg(long)]
        date: String,
        #[arg(long)]
        locale: String,
        /// JSON file of locale id → table
        #[arg(long)]
        locales: PathBuf,
    },
    /// Merge a state blob into a range state
    Merge {
        /// Current state as JSON: {"rule": "+1m", "from": "...", "to": "..."}
        #[arg(long)]
        state: String,
        /// Shared blob as a JSON object
        #[arg(long)]
        blob: String,
        /// Blob key names as JSON: {"rule": "...", "from": "...", "to": "..."}
        #[arg(long)]
        fields: Option<String>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let output = match cli.command {
        Command::Align { rule, date } => {
            info!("command align");
            let rule = parse(&rule).context("reading --rule")?;
            let reference = match date {
                Some(date) => parse_date(&date).context("reading --date")?,
                None => today(),
            };
            serde_json::to_value(RangeState::aligned(reference, rule)?)?
        }
        Command::Shift { rule, date, back } => {
            info!("command shift");
            let rule = parse(&rule).context("reading --rule")?;
            let start = parse_date(&date).context("reading --date")?;
            let current = RangeState::new(rule, Some(start), None)?.with_from(start)?;
            let shifted = if back {
                current.previous()?
            } else {
                current.next()?
            };
            serde_json::to_value(shifted)?
        }
        Command::Invert { token } => {
            info!("command invert");
            Value::String(invert(&token)?)
        }
        Command::Format {
            date,
            locale,
            locales,
        } => {
            info!("command format");
            let date = parse_date(&date).context("reading --date")?;
            let text = fs::read_to_string(&locales)
                .with_context(|| format!("reading {}", locales.display()))?;
            let formatter = DateFormatter::new(LocaleRegistry::from_json(&text)?);
            Value::String(formatter.render(&locale, date)?)
        }
        Command::Merge {
            state,
            blob,
            fields,
        } => {
            info!("command merge");
            let current: RangeState =
                serde_json::from_str(&state).context("reading --state")?;
            let mut blob: StateBlob = serde_json::from_str(&blob).context("reading --blob")?;
            let fields = match fields {
                Some(json) => FieldNames::from_json(&json)?,
                None => FieldNames::default(),
            };
            let merged = StateCodec::new(fields)?.merge(&mut blob, &current)?;
            json!({
                "state": merged.state,
                "changed": merged.changed,
                "blob": blob,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// The only place the clock is read; every engine call takes the date
/// explicitly.
fn today() -> NaiveDate {
    let today = chrono::Local::now().date_naive();
    debug!(%today, "no --date given, using local date");
    today
}

fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let level = match (quiet, verbose) {
        (q, _) if q > 1 => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        _ => "trace",
    };
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("period_engine={level},period={level}"))
            .map_err(|e| anyhow!("bad log filter: {e}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time()
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}
