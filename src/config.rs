use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "https://api.foursquare.com/v3";
pub const DEFAULT_MODEL_ID: &str = "nlptown/bert-base-multilingual-uncased-sentiment";

#[derive(Debug, Clone)]
pub struct Config {
    pub foursquare_api_key: String,
    pub foursquare_api_url: String,
    pub bind_addr: String,
    pub search_radius_m: u32,
    pub search_limit: u32,
    pub tips_limit: u32,
    pub http_timeout: Duration,
    pub model: ModelSource,
    pub log_level: LevelFilter,
}

/// Where the sentiment model weights come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Hub { model_id: String, revision: String },
    Local(PathBuf),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let foursquare_api_key =
            get("FOURSQUARE_API_KEY").ok_or(ConfigError::Missing("FOURSQUARE_API_KEY"))?;

        let foursquare_api_url = get("FOURSQUARE_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&foursquare_api_url).map_err(|e| ConfigError::Invalid {
            key: "FOURSQUARE_API_URL",
            message: e.to_string(),
        })?;

        let model = match get("SENTIMENT_MODEL_DIR") {
            Some(dir) => ModelSource::Local(PathBuf::from(dir)),
            None => ModelSource::Hub {
                model_id: get("SENTIMENT_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
                revision: get("SENTIMENT_MODEL_REVISION").unwrap_or_else(|| "main".to_string()),
            },
        };

        let log_level = match get("LOG_LEVEL") {
            Some(level) => LevelFilter::from_str(&level).map_err(|_| ConfigError::Invalid {
                key: "LOG_LEVEL",
                message: format!("unknown level '{}'", level),
            })?,
            None => LevelFilter::Info,
        };

        Ok(Self {
            foursquare_api_key,
            foursquare_api_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:9999".to_string()),
            search_radius_m: parse_in_range(get("SEARCH_RADIUS_M"), "SEARCH_RADIUS_M", 5000, 1, 100_000)?,
            search_limit: parse_in_range(get("SEARCH_LIMIT"), "SEARCH_LIMIT", 10, 1, 50)?,
            tips_limit: parse_in_range(get("TIPS_LIMIT"), "TIPS_LIMIT", 10, 1, 50)?,
            http_timeout: Duration::from_secs(
                parse_in_range(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", 10, 1, 120)?.into(),
            ),
            model,
            log_level,
        })
    }
}

fn parse_in_range(
    value: Option<String>,
    key: &'static str,
    default: u32,
    min: u32,
    max: u32,
) -> Result<u32, ConfigError> {
    let Some(raw) = value else {
        return Ok(default);
    };
    let parsed = raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
        key,
        message: format!("'{}': {}", raw, e),
    })?;
    if parsed < min || parsed > max {
        return Err(ConfigError::Invalid {
            key,
            message: format!("{} is outside {}..={}", parsed, min, max),
        });
    }
    Ok(parsed)
}
