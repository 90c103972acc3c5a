use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};

pub const STORAGE_BACKEND_ENV: &str = "LOOK_LATER_STORAGE_BACKEND";
pub const REDIS_URL_ENV: &str = "LOOK_LATER_REDIS_URL";
pub const STORE_TIMEOUT_ENV: &str = "LOOK_LATER_STORE_TIMEOUT_MS";
pub const REQUEST_TIMEOUT_ENV: &str = "LOOK_LATER_REQUEST_TIMEOUT_MS";
pub const QUOTA_BYTES_ENV: &str = "LOOK_LATER_QUOTA_BYTES";
pub const LOG_FORMAT_ENV: &str = "LOOK_LATER_LOG_FORMAT";

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 12_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "look-later-host")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("storage", "redis"))]
    pub redis_url: Option<String>,

    /// Deadline for each Link Store call, in milliseconds.
    #[arg(long, env = STORE_TIMEOUT_ENV, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub store_timeout_ms: u64,

    /// Deadline for a popup's remove round-trip, in milliseconds. Raised to
    /// twice the store deadline plus a second when set lower.
    #[arg(long, env = REQUEST_TIMEOUT_ENV, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    #[arg(long, env = QUOTA_BYTES_ENV, default_value_t = look_later_storage::DEFAULT_QUOTA_BYTES)]
    pub quota_bytes: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}
