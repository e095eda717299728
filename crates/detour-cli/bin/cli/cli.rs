use clap::{Args, Parser, Subcommand, ValueEnum};
use detour_core::RuleDraft;
use detour_telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const MYSQL_DSN_ENV: &str = "DETOUR_MYSQL_DSN";
pub const STATUSES_FILE_ENV: &str = "DETOUR_STATUSES_FILE";
pub const LOG_FORMAT_ENV: &str = "DETOUR_LOG_FORMAT";

pub const DEFAULT_STATUS: u16 = 301;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "pretty")]
    Pretty,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormatArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormatArg::Pretty => write!(f, "pretty"),
            LogFormatArg::Json => write!(f, "json"),
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "detour", about = "Manage and resolve redirect rules")]
pub struct CLI {
    #[arg(long, env = MYSQL_DSN_ENV, global = true)]
    pub mysql_dsn: Option<String>,

    /// JSON object mapping allowed status codes to labels.
    #[arg(long, env = STATUSES_FILE_ENV, global = true)]
    pub statuses: Option<PathBuf>,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        value_enum,
        global = true,
        default_value_t = LogFormatArg::Pretty
    )]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply the database schema.
    Migrate,
    /// Create a rule, or update one with `--id`.
    Save(SaveArgs),
    /// Print a rule.
    Get { id: u64 },
    /// Delete a rule.
    Delete { id: u64 },
    /// Print the rule serving a request path.
    Resolve { path: String },
}

#[derive(Debug, Args)]
pub struct SaveArgs {
    #[arg(long)]
    pub source: String,

    #[arg(long)]
    pub destination: String,

    /// Treat the destination as an opaque external URL.
    #[arg(long)]
    pub external: bool,

    #[arg(long, default_value_t = DEFAULT_STATUS)]
    pub status: u16,

    /// Update this rule instead of creating a new one.
    #[arg(long)]
    pub id: Option<u64>,
}

impl SaveArgs {
    pub fn draft(&self) -> RuleDraft {
        RuleDraft::builder()
            .source(self.source.as_str())
            .destination(self.destination.as_str())
            .external(self.external)
            .status(self.status)
            .build()
    }
}
