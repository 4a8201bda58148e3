use std::env;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_ACTOR_ID: &str = "UZBnerCFBo5FgGouO";
pub const DEFAULT_APIFY_BASE_URL: &str = "https://api.apify.com";
pub const DEFAULT_START_URL: &str = "https://www.facebook.com/events/search?q=brampton&filters=eyJycF9ldmVudHNfbG9jYXRpb246MCI6IntcIm5hbWVcIjpcImZpbHRlcl9ldmVudHNfbG9jYXRpb25cIixcImFyZ3NcIjpcIjExMDE4NTA4NTY2ODcwMlwifSIsImZpbHRlcl9ldmVudHNfZGF0ZV9yYW5nZTowIjoie1wibmFtZVwiOlwiZmlsdGVyX2V2ZW50c19kYXRlXCIsXCJhcmdzXCI6XCIyMDI0LTExLTA0fjIwMjQtMTEtMTBcIn0ifQ%3D%3D";
pub const DEFAULT_MAX_EVENTS: RangeInclusive<u32> = 3..=9;

#[derive(Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub apify_token: String,
    pub apify_base_url: String,
    pub actor_id: String,
    /// Upper bound on waiting for a submitted run to finish.
    pub job_timeout: Duration,
    /// Upper bound on draining the run's dataset.
    pub dataset_timeout: Duration,
    pub default_start_url: String,
    pub default_max_events: RangeInclusive<u32>,
}

impl Config {
    /// Config with every optional setting at its default.
    pub fn new(apify_token: impl Into<String>) -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            apify_token: apify_token.into(),
            apify_base_url: DEFAULT_APIFY_BASE_URL.to_string(),
            actor_id: DEFAULT_ACTOR_ID.to_string(),
            job_timeout: Duration::from_secs(300),
            dataset_timeout: Duration::from_secs(120),
            default_start_url: DEFAULT_START_URL.to_string(),
            default_max_events: DEFAULT_MAX_EVENTS,
        }
    }

    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let apify_token = lookup("APIFY_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| AppError::ConfigError("APIFY_TOKEN must be set".to_string()))?;
        let mut config = Config::new(apify_token);

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "5000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
        config.server_addr = SocketAddr::new(ip, port);

        if let Some(base_url) = lookup("APIFY_BASE_URL") {
            config.apify_base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(actor_id) = lookup("APIFY_ACTOR_ID") {
            config.actor_id = actor_id;
        }
        if let Some(url) = lookup("DEFAULT_START_URL") {
            config.default_start_url = url;
        }

        if let Some(secs) = lookup("JOB_TIMEOUT_SECS") {
            config.job_timeout = parse_secs("JOB_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("DATASET_TIMEOUT_SECS") {
            config.dataset_timeout = parse_secs("DATASET_TIMEOUT_SECS", &secs)?;
        }

        let min = match lookup("DEFAULT_MAX_EVENTS_MIN") {
            Some(v) => parse_u32("DEFAULT_MAX_EVENTS_MIN", &v)?,
            None => *DEFAULT_MAX_EVENTS.start(),
        };
        let max = match lookup("DEFAULT_MAX_EVENTS_MAX") {
            Some(v) => parse_u32("DEFAULT_MAX_EVENTS_MAX", &v)?,
            None => *DEFAULT_MAX_EVENTS.end(),
        };
        if min > max {
            return Err(AppError::ConfigError(format!(
                "DEFAULT_MAX_EVENTS_MIN ({}) exceeds DEFAULT_MAX_EVENTS_MAX ({})",
                min, max
            )));
        }
        config.default_max_events = min..=max;

        Ok(config)
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e)))
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    match parse_u32(key, value)? {
        0 => Err(AppError::ConfigError(format!("{} must be greater than zero", key))),
        secs => Ok(Duration::from_secs(u64::from(secs))),
    }
}
