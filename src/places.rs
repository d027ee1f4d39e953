//! Places lookup seam.
//!
//! `SearchQuery` is built from the two form inputs; `PlacesSource` is what the
//! search pipeline calls to find venues and their reviews.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{NetworkError, SearchError};
use crate::models::{Review, Venue};

const MAX_INPUT_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub cuisine: String,
    pub location: String,
    pub radius_m: u32,
    pub limit: u32,
}

impl SearchQuery {
    pub fn new(cuisine: &str, location: &str, radius_m: u32, limit: u32) -> Result<Self, SearchError> {
        Ok(Self {
            cuisine: clean_input("cuisine", cuisine)?,
            location: clean_input("location", location)?,
            radius_m,
            limit,
        })
    }
}

fn clean_input(field: &str, value: &str) -> Result<String, SearchError> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(SearchError::InvalidInput(format!("{} must not be empty", field)));
    }
    if collapsed.chars().count() > MAX_INPUT_LEN {
        return Err(SearchError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, MAX_INPUT_LEN
        )));
    }
    if collapsed.chars().any(char::is_control) {
        return Err(SearchError::InvalidInput(format!("{} contains control characters", field)));
    }
    Ok(collapsed)
}

#[async_trait]
pub trait PlacesSource: Send + Sync {
    /// Venues matching the query, in the order the provider ranks them.
    async fn search_venues(&self, query: &SearchQuery) -> Result<Vec<Venue>, NetworkError>;

    async fn fetch_reviews(&self, venue_id: &str) -> Result<Vec<Review>, NetworkError>;
}
