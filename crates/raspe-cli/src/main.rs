//! `raspe` - harvest paginated search portals into a table.

mod args;
mod output;

use anyhow::{bail, Context, Result};
use args::{parse_args, Command, ConfigAction, HarvestArgs};
use raspe_core::AppConfig;
use raspe_harvest::{
    content_column, FanOutRunner, LinkContentFetcher, ResultAggregator, TermCounter,
    PROVENANCE_COLUMN,
};
use raspe_sources::{SourceOptions, SourceRegistry};
use std::fs::File;
use std::io::{self, BufWriter};

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,raspe=debug"));

    // logs go to stderr so stdout stays clean for the table
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match parse_args(std::env::args().skip(1))? {
        Command::Help => eprintln!("{}", include_str!("help.txt")),
        Command::Sources => list_sources(),
        Command::Expand(expression) => {
            for term in raspe_query::expand(&expression)? {
                println!("{term}");
            }
        }
        Command::Harvest(args) => harvest(args).await?,
        Command::Config(action) => config(&action)?,
    }
    Ok(())
}

fn config(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AppConfig::load_with_env().context("loading configuration")?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => println!("{}", AppConfig::config_path()?.display()),
        ConfigAction::Init { force } => {
            let path = AppConfig::config_path()?;
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let path = AppConfig::default().save()?;
            tracing::info!(path = %path.display(), "Configuration written");
        }
    }
    Ok(())
}

fn list_sources() {
    for entry in SourceRegistry::new().entries() {
        let mut notes = Vec::new();
        if entry.needs_api_key {
            notes.push("api key");
        }
        if entry.browser {
            notes.push("browser");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", notes.join(", "))
        };
        println!("{:<12} {}{notes}", entry.id, entry.description);
    }
}

async fn harvest(args: HarvestArgs) -> Result<()> {
    let mut config = AppConfig::load_with_env().context("loading configuration")?;
    if args.keep {
        config.harvest.retain_artifacts = true;
    }

    let request = args.request()?;
    let mut options = SourceOptions::new(config.clone());
    options.api_key = args.api_key.clone();

    let source = SourceRegistry::new().build(&args.source, &options)?;
    let runner = FanOutRunner::from_config(config.harvest.clone());
    let mut table = runner.harvest(&source, &request).await?;

    if let Some(key) = &args.dedup_key {
        let before = table.len();
        table = ResultAggregator::new(key.clone(), PROVENANCE_COLUMN).aggregate(table);
        tracing::info!(key = %key, before, after = table.len(), "Merged duplicate rows");
    }

    if let Some(column) = &args.extract {
        let fetcher = LinkContentFetcher::new(&config.http, config.harvest.pacing())?;
        table = fetcher.fetch_column(table, column).await;
    }
    if args.count_terms {
        let content = content_column(args.extract.as_deref().unwrap_or("link"));
        table = TermCounter::new(PROVENANCE_COLUMN, content).count(table);
    }

    match &args.out {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            output::write_table(&table, args.format, BufWriter::new(file))?;
            tracing::info!(rows = table.len(), path = %path.display(), "Table written");
        }
        None => output::write_table(&table, args.format, io::stdout().lock())?,
    }
    Ok(())
}
