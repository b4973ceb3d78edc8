use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::error::ConfigError;

pub mod env {
    pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
    pub const GH_TOKEN: &str = "GH_TOKEN";
    pub const GITHUB_OWNER: &str = "GITHUB_OWNER";
    pub const GITHUB_API_URL: &str = "GITHUB_API_URL";
    pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
    pub const DATA_DIR: &str = "DATA_DIR";
    pub const OUTPUT_DIR: &str = "OUTPUT_DIR";
    pub const RANK_BY: &str = "RANK_BY";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nBuild Date: ",
    env!("BUILD_DATE"),
    "\nGit Commit: ",
    env!("GIT_COMMIT"),
    "\nRust Version: ",
    env!("RUSTC_VERSION"),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable single-line output
    Pretty,
    /// Structured JSON, one object per line
    Json,
}

/// Metric the dashboard ranks repositories by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RankBy {
    /// Unique visitors, less skewed by crawlers scanning public repositories
    #[default]
    Uniques,
    /// Raw view count
    Views,
}

impl std::fmt::Display for RankBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankBy::Uniques => write!(f, "unique visitors"),
            RankBy::Views => write!(f, "total views"),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "traffic-keeper",
    version,
    long_version = LONG_VERSION,
    about = "Keeps GitHub traffic history beyond the 14-day window",
    long_about = "Collects views, clones, referrers and popular paths for every public repository \
                  of an account, merges them into per-repository JSON records, and renders a \
                  static HTML dashboard from the accumulated history."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding per-repository records and the run summary
    #[arg(long, global = true, env = env::DATA_DIR, default_value = "data")]
    pub data_dir: PathBuf,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, env = env::LOG_LEVEL, default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, global = true, env = env::LOG_FORMAT, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch traffic for every public repository and merge it into the records
    Collect(CollectArgs),
    /// Render the static HTML dashboard from the stored records
    Build(BuildArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct CollectArgs {
    /// Account whose public repositories are collected
    #[arg(long, env = env::GITHUB_OWNER)]
    pub owner: Option<String>,

    /// Preview without writing files
    #[arg(long)]
    pub dry_run: bool,

    /// GitHub API base URL
    #[arg(long, env = env::GITHUB_API_URL, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = env::REQUEST_TIMEOUT, default_value_t = 30)]
    pub request_timeout: u64,

    #[arg(long, env = env::GITHUB_TOKEN, hide = true, hide_env_values = true)]
    pub github_token: Option<String>,

    #[arg(long, env = env::GH_TOKEN, hide = true, hide_env_values = true)]
    pub gh_token: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Ranking policy for the repository table and chart
    #[arg(long, env = env::RANK_BY, value_enum, default_value = "uniques")]
    pub rank_by: RankBy,

    /// Directory the dashboard is written to
    #[arg(long, env = env::OUTPUT_DIR, default_value = "docs")]
    pub output_dir: PathBuf,
}

/// Validated settings for a collection run.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub github_token: String,
    pub owner: String,
    pub api_url: String,
    pub request_timeout: u64,
    pub data_dir: PathBuf,
    pub dry_run: bool,
}

impl CollectConfig {
    pub fn from_args(args: CollectArgs, data_dir: PathBuf) -> Result<Self, ConfigError> {
        let github_token = non_empty(args.github_token)
            .or_else(|| non_empty(args.gh_token))
            .ok_or(ConfigError::MissingToken)?;
        let owner = non_empty(args.owner).ok_or(ConfigError::MissingOwner)?;

        Ok(Self {
            github_token,
            owner,
            api_url: args.api_url,
            request_timeout: args.request_timeout,
            data_dir,
            dry_run: args.dry_run,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub rank_by: RankBy,
}

impl BuildConfig {
    pub fn from_args(args: BuildArgs, data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            output_dir: args.output_dir,
            rank_by: args.rank_by,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
impl CollectConfig {
    pub fn new_for_test(api_url: String, data_dir: PathBuf) -> Self {
        Self {
            github_token: "test-token".to_string(),
            owner: "octo".to_string(),
            api_url,
            request_timeout: 5,
            data_dir,
            dry_run: false,
        }
    }
}
