//! Error types for each stage of a search.
//!
//! - `NetworkError`: Foursquare search or tips call failed
//! - `ModelError`: sentiment model could not be loaded or run
//! - `SearchError`: what a handler sees for a whole search
//! - `ConfigError`: startup configuration problems

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to load model: {0}")]
    Load(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] candle_core::Error),

    #[error("Unexpected model output: {0}")]
    Label(String),

    #[error("Scoring task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid search: {0}")]
    InvalidInput(String),

    #[error("No restaurants found")]
    EmptyResult,

    #[error("Places search failed: {0}")]
    Network(#[from] NetworkError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
