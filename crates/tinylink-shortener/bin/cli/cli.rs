use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const BASE_URL_ENV: &str = "TINYLINK_BASE_URL";
pub const CODE_LENGTH_ENV: &str = "TINYLINK_CODE_LENGTH";
pub const STORAGE_BACKEND_ENV: &str = "TINYLINK_STORAGE_BACKEND";
pub const DATA_FILE_ENV: &str = "TINYLINK_DATA_FILE";
pub const MYSQL_DSN_ENV: &str = "TINYLINK_MYSQL_DSN";
pub const TIMEOUT_MS_ENV: &str = "TINYLINK_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "TINYLINK_LOG_FORMAT";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_CODE_LENGTH: &str = "7";
pub const DEFAULT_DATA_FILE: &str = "data/links.json";
pub const DEFAULT_TIMEOUT_MS: &str = "3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "file")]
    File,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "tinylink", about = "Create and resolve short links")]
pub struct CLI {
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = CODE_LENGTH_ENV,
        default_value = DEFAULT_CODE_LENGTH,
        value_parser = clap::value_parser!(u8).range(3..=32),
    )]
    pub code_length: u8,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::File
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = DATA_FILE_ENV, default_value = DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Upper bound for each storage call, in milliseconds.
    #[arg(long, env = TIMEOUT_MS_ENV, default_value = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a short link.
    Shorten {
        url: String,
        /// Use this code instead of a random one.
        #[arg(long)]
        code: Option<String>,
    },
    /// Show a link without counting a hit.
    Resolve { code: String },
    /// Count a hit and show the updated link.
    Hit { code: String },
    /// Permanently remove a link.
    Delete { code: String },
    /// Show every link.
    List,
}
