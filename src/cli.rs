use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::PathBuf;

use mrsi::logger::LogLevel;
use mrsi::{IntRule, Method, RunConfig, StringRule};

/// mrsi: fire templated HTTP requests from a pool of workers
///
/// Example:
///   mrsi -s 348547 -n 8 -r 100000 --int '{{i1}}:0:1000' \
///        --choice '{{s1}}:items,users' 'http://localhost:8080/{{s1}}/{{i1}}/'
#[derive(Debug, Parser)]
#[command(name = "mrsi", version)]
pub struct Cli {
    /// Random seed
    #[arg(short, long)]
    pub seed: Option<i64>,

    /// Number of concurrent workers [default: 4]
    #[arg(short = 'n', long)]
    pub workers: Option<usize>,

    /// Total number of requests [default: 1024]
    #[arg(short, long)]
    pub requests: Option<u64>,

    /// GET, PUT, POST, PATCH, DELETE or HEAD [default: GET]
    #[arg(short = 'X', long)]
    pub method: Option<Method>,

    /// Request header, "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read the request body from a file
    #[arg(long, value_name = "FILE")]
    pub data_file: Option<PathBuf>,

    /// Integer substitution, KEY:MIN:MAX inclusive (repeatable)
    #[arg(long = "int", value_name = "KEY:MIN:MAX", allow_hyphen_values = true)]
    pub int_rules: Vec<String>,

    /// String substitution, KEY:A,B,C (repeatable)
    #[arg(long = "choice", value_name = "KEY:A,B,...")]
    pub string_rules: Vec<String>,

    /// Load settings from a JSON profile; flags override it
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    /// Write the effective settings to a JSON profile before running
    #[arg(long, value_name = "FILE")]
    pub save_profile: Option<PathBuf>,

    /// Per-request timeout in seconds [default: 30]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,

    /// URL templates, used in turn
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,
}

impl Cli {
    /// Merge the profile (if any) with the flags. The result still has to
    /// be validated.
    pub fn to_config(&self) -> Result<RunConfig> {
        let mut config = match &self.profile {
            Some(path) => RunConfig::load_profile(path)
                .with_context(|| format!("loading profile {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.randomizer.seed = seed;
        }
        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if let Some(requests) = self.requests {
            config.request_count = requests;
        }
        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(data) = &self.data {
            config.body = Some(data.clone().into_bytes());
            config.body_file = None;
        }
        if let Some(path) = &self.data_file {
            config.body_file = Some(path.clone());
            config.body = None;
        }

        for header in &self.headers {
            let (name, value) = parse_header(header)?;
            config.headers.insert(name, value);
        }
        for rule in &self.int_rules {
            config.randomizer.int_rules.push(parse_int_rule(rule)?);
        }
        for rule in &self.string_rules {
            config.randomizer.string_rules.push(parse_string_rule(rule)?);
        }
        if !self.urls.is_empty() {
            config.randomizer.url_templates = self.urls.clone();
        }

        Ok(config)
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header must look like \"Name: value\": {raw:?}"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

/// `KEY:MIN:MAX`; the key itself may contain colons.
fn parse_int_rule(raw: &str) -> Result<IntRule> {
    let mut parts = raw.rsplitn(3, ':');
    let (Some(max), Some(min), Some(key)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(anyhow!("int rule must look like KEY:MIN:MAX: {raw:?}"));
    };
    let min = min
        .parse::<i64>()
        .with_context(|| format!("bad min in int rule {raw:?}"))?;
    let max = max
        .parse::<i64>()
        .with_context(|| format!("bad max in int rule {raw:?}"))?;
    Ok(IntRule::new(key, min, max)?)
}

fn parse_string_rule(raw: &str) -> Result<StringRule> {
    let (key, choices) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("string rule must look like KEY:A,B,C: {raw:?}"))?;
    Ok(StringRule::from_csv(key, choices)?)
}
