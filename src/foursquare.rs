use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::error::NetworkError;
use crate::models::{Coordinates, Review, Venue};
use crate::places::{PlacesSource, SearchQuery};

/// Foursquare's root "Dining and Drinking > Restaurant" category.
const RESTAURANT_CATEGORY: &str = "13065";
const SEARCH_FIELDS: &str = "fsq_id,name,categories,geocodes,location,price";

pub struct FoursquareClient {
    client: Client,
    base_url: String,
    api_key: String,
    tips_limit: u32,
}

impl FoursquareClient {
    pub fn new(client: Client, base_url: &str, api_key: &str, tips_limit: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            tips_limit,
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(
            client,
            &config.foursquare_api_url,
            &config.foursquare_api_key,
            config.tips_limit,
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, NetworkError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| NetworkError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url, params: &[(&str, String)]) -> Result<Value, NetworkError> {
        debug!("Requesting {} with params: {:?}", url, params);

        let response = self
            .client
            .get(url.clone())
            .query(params)
            .header("Authorization", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = api_error_message(&body);
            error!("Foursquare API error for {}. Status: {}, message: {}", url, status, message);
            return Err(NetworkError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl PlacesSource for FoursquareClient {
    async fn search_venues(&self, query: &SearchQuery) -> Result<Vec<Venue>, NetworkError> {
        info!("Searching Foursquare for '{}' near '{}'", query.cuisine, query.location);
        let url = self.endpoint(&["places", "search"])?;
        let params = [
            ("query", query.cuisine.clone()),
            ("near", query.location.clone()),
            ("radius", query.radius_m.to_string()),
            ("limit", query.limit.to_string()),
            ("categories", RESTAURANT_CATEGORY.to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
        ];

        let response = self.get_json(url, &params).await?;
        let venues = parse_venues(&response);
        info!("Found {} venues", venues.len());
        Ok(venues)
    }

    async fn fetch_reviews(&self, venue_id: &str) -> Result<Vec<Review>, NetworkError> {
        debug!("Fetching tips for venue {}", venue_id);
        let url = self.endpoint(&["places", venue_id, "tips"])?;
        let params = [
            ("limit", self.tips_limit.to_string()),
            ("sort", "POPULAR".to_string()),
        ];

        let response = self.get_json(url, &params).await?;
        let reviews = parse_tips(venue_id, &response);
        debug!("Venue {} has {} tips", venue_id, reviews.len());
        Ok(reviews)
    }
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(String::from))
        .unwrap_or_else(|| {
            if body.is_empty() {
                "No error body".to_string()
            } else {
                body.chars().take(200).collect()
            }
        })
}

fn parse_venues(response: &Value) -> Vec<Venue> {
    let Some(results) = response["results"].as_array() else {
        warn!("Search response has no results array: {:?}", response);
        return Vec::new();
    };

    results.iter().filter_map(parse_venue).collect()
}

fn parse_venue(place: &Value) -> Option<Venue> {
    let Some(id) = place["fsq_id"].as_str() else {
        warn!("Skipping place without fsq_id: {:?}", place["name"]);
        return None;
    };
    let name = place["name"].as_str().unwrap_or("Unknown").to_string();

    let main = &place["geocodes"]["main"];
    let coordinates = match (main["latitude"].as_f64(), main["longitude"].as_f64()) {
        (Some(latitude), Some(longitude)) => Coordinates { latitude, longitude },
        _ => {
            warn!("Skipping {} ({}): no coordinates", name, id);
            return None;
        }
    };

    let category = place["categories"][0]["name"].as_str().unwrap_or("").to_string();

    let location = &place["location"];
    let address = location["formatted_address"]
        .as_str()
        .or_else(|| location["address"].as_str())
        .unwrap_or("No address available")
        .to_string();

    let price = place["price"]
        .as_u64()
        .filter(|p| (1..=4).contains(p))
        .map(|p| p as u8);

    Some(Venue {
        id: id.to_string(),
        name,
        category,
        coordinates,
        address,
        price,
    })
}

fn parse_tips(venue_id: &str, response: &Value) -> Vec<Review> {
    // The tips endpoint returns a bare array.
    let Some(tips) = response.as_array() else {
        warn!("Tips response for {} is not an array", venue_id);
        return Vec::new();
    };

    tips.iter()
        .filter_map(|tip| tip["text"].as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| Review {
            venue_id: venue_id.to_string(),
            text: text.to_string(),
        })
        .collect()
}
