use crate::output::OutputFormat;
use anyhow::{anyhow, bail, Context, Result};
use raspe_core::{PageRange, ParamValue, SearchRequest};
use std::path::PathBuf;

/// Parameter name that carries a credential instead of a search value.
pub const API_KEY_PARAM: &str = "api_key";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Sources,
    Expand(String),
    Harvest(HarvestArgs),
    Config(ConfigAction),
    Help,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write the defaults to the configuration file
    Init { force: bool },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct HarvestArgs {
    pub source: String,
    pub params: Vec<(String, String)>,
    pub pages: Option<PageRange>,
    pub expand: Option<String>,
    pub dedup_key: Option<String>,
    pub extract: Option<String>,
    pub count_terms: bool,
    pub api_key: Option<String>,
    pub keep: bool,
    pub format: OutputFormat,
    pub out: Option<PathBuf>,
}

pub fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "sources" => Ok(Command::Sources),
        "expand" => {
            let expression = args.next().ok_or_else(|| anyhow!("Missing expression"))?;
            Ok(Command::Expand(expression))
        }
        "harvest" => parse_harvest(args).map(Command::Harvest),
        "config" => parse_config(args).map(Command::Config),
        "-h" | "--help" | "help" => Ok(Command::Help),
        other => bail!("Unknown command: {other}"),
    }
}

fn parse_harvest(mut args: impl Iterator<Item = String>) -> Result<HarvestArgs> {
    let mut parsed = HarvestArgs::default();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().ok_or_else(|| anyhow!("Missing value for {flag}"));
        match arg.as_str() {
            "-p" | "--param" => {
                let pair = value(&arg)?;
                let (key, val) = pair
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Expected key=value, got '{pair}'"))?;
                let key = key.trim();
                if key.is_empty() {
                    bail!("Empty parameter name in '{pair}'");
                }
                if key == API_KEY_PARAM {
                    parsed.api_key = Some(val.to_string());
                } else {
                    parsed.params.push((key.to_string(), val.to_string()));
                }
            }
            "--pages" => {
                let range = value(&arg)?;
                parsed.pages = Some(range.parse().with_context(|| format!("--pages {range}"))?);
            }
            "--expand" => parsed.expand = Some(value(&arg)?),
            "--dedup-key" => parsed.dedup_key = Some(value(&arg)?),
            "--extract" => parsed.extract = Some(value(&arg)?),
            "--count-terms" => parsed.count_terms = true,
            "--api-key" => parsed.api_key = Some(value(&arg)?),
            "--format" => parsed.format = value(&arg)?.parse()?,
            "-o" | "--out" => parsed.out = Some(PathBuf::from(value(&arg)?)),
            "--keep" => parsed.keep = true,
            flag if flag.starts_with('-') => bail!("Unknown option: {flag}"),
            source if parsed.source.is_empty() => parsed.source = source.to_string(),
            extra => bail!("Unexpected argument: {extra}"),
        }
    }

    if parsed.source.is_empty() {
        bail!("Missing source name (see `raspe sources`)");
    }
    Ok(parsed)
}

fn parse_config(args: impl Iterator<Item = String>) -> Result<ConfigAction> {
    let args: Vec<String> = args.collect();
    let force = args.iter().any(|a| a == "--force");
    match args.iter().find(|a| !a.starts_with('-')).map(String::as_str) {
        None | Some("show") => Ok(ConfigAction::Show),
        Some("path") => Ok(ConfigAction::Path),
        Some("init") => Ok(ConfigAction::Init { force }),
        Some(other) => bail!("Unknown config action: {other}"),
    }
}

impl HarvestArgs {
    /// Build the search request. A key given more than once becomes the
    /// list-valued parameter; `--expand` turns one key's expression into one.
    pub fn request(&self) -> Result<SearchRequest> {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in &self.params {
            match grouped.iter_mut().find(|(k, _)| k == key) {
                Some((_, values)) => values.push(value.clone()),
                None => grouped.push((key.clone(), vec![value.clone()])),
            }
        }

        let mut request = SearchRequest::new();
        for (key, mut values) in grouped {
            let value = if self.expand.as_deref() == Some(key.as_str()) {
                if values.len() != 1 {
                    bail!("--expand {key} needs exactly one expression");
                }
                let expression = values.remove(0);
                let terms = raspe_query::expand(&expression)
                    .with_context(|| format!("expanding '{expression}'"))?;
                tracing::info!(param = %key, count = terms.len(), "Expanded expression");
                ParamValue::List(terms)
            } else if values.len() == 1 {
                ParamValue::Scalar(values.remove(0))
            } else {
                ParamValue::List(values)
            };
            request.set(key, value);
        }

        if let Some(key) = &self.expand {
            if request.get(key).is_none() {
                bail!("--expand {key}: no parameter named {key}");
            }
        }
        if let Some(pages) = self.pages {
            request = request.with_pages(pages);
        }
        Ok(request)
    }
}
