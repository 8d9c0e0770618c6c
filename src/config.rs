//! Process configuration, read once from the environment.
//!
//! | Variable | Required | Default |
//! |---|---|---|
//! | `CANDIDATES_TABLE_NAME` | yes | |
//! | `CANDIDATES_STORAGE` | no | `dynamodb` |
//! | `LISTEN_ADDR` | no | `0.0.0.0:3000` |
//! | `TIME_ZONE` | no | `America/Lima` |
//! | `REQUEST_TIMEOUT_SECS` | no | `30` |
//!
//! `TIME_ZONE` is an IANA zone name. `REQUEST_TIMEOUT_SECS` must lie in
//! `1..=900`.

use std::fmt;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::time::Duration;

use chrono_tz::Tz;
use figment::Figment;
use figment::providers::Env;
use serde::Deserialize;

const KEYS: [&str; 5] = [
    "CANDIDATES_TABLE_NAME",
    "CANDIDATES_STORAGE",
    "LISTEN_ADDR",
    "TIME_ZONE",
    "REQUEST_TIMEOUT_SECS",
];

const REQUEST_TIMEOUT_SECS: RangeInclusive<u64> = 1..=900;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Extract(#[from] Box<figment::Error>),

    #[error("CANDIDATES_TABLE_NAME must not be blank")]
    BlankTableName,

    #[error("TIME_ZONE `{0}` is not an IANA zone name like America/Lima")]
    TimeZone(String),

    #[error("REQUEST_TIMEOUT_SECS {0} is outside 1..=900")]
    RequestTimeout(u64),
}

/// Where candidates are kept.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    /// The DynamoDB table named by `CANDIDATES_TABLE_NAME`.
    #[default]
    DynamoDb,
    /// A table that lives and dies with the process.
    Memory,
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DynamoDb => "dynamodb",
            Self::Memory => "memory",
        })
    }
}

#[derive(Deserialize)]
struct RawConfig {
    candidates_table_name: String,
    #[serde(default)]
    candidates_storage: Storage,
    #[serde(default = "default_listen_addr")]
    listen_addr: SocketAddr,
    #[serde(default = "default_time_zone")]
    time_zone: String,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_time_zone() -> String {
    "America/Lima".to_owned()
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Debug)]
pub struct Config {
    pub candidates_table_name: String,
    pub storage: Storage,
    pub listen_addr: SocketAddr,
    pub time_zone: Tz,
    pub request_timeout: Duration,
}

impl Config {
    /// Reads and validates the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let raw: RawConfig = Figment::new()
            .merge(Env::raw().only(&KEYS))
            .extract()
            .map_err(Box::new)?;

        let candidates_table_name = raw.candidates_table_name.trim().to_owned();
        if candidates_table_name.is_empty() {
            return Err(ConfigError::BlankTableName);
        }

        let time_zone = raw
            .time_zone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::TimeZone(raw.time_zone.clone()))?;

        if !REQUEST_TIMEOUT_SECS.contains(&raw.request_timeout_secs) {
            return Err(ConfigError::RequestTimeout(raw.request_timeout_secs));
        }

        Ok(Self {
            candidates_table_name,
            storage: raw.candidates_storage,
            listen_addr: raw.listen_addr,
            time_zone,
            request_timeout: Duration::from_secs(raw.request_timeout_secs),
        })
    }
}
