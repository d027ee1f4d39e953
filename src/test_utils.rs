//! In-memory fakes and fixtures for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ModelError, NetworkError};
use crate::models::{
    Coordinates, Rating, RatingResult, Review, ScoredReview, SentimentScore, Venue,
};
use crate::places::{PlacesSource, SearchQuery};
use crate::rating::round_to_half;
use crate::sentiment::SentimentModel;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn score(label: u8) -> SentimentScore {
    SentimentScore {
        label,
        confidence: 0.9,
    }
}

pub fn test_venue(id: &str, name: &str) -> Venue {
    Venue {
        id: id.to_string(),
        name: name.to_string(),
        category: "Sushi Restaurant".to_string(),
        coordinates: Coordinates {
            latitude: 42.35,
            longitude: -71.06,
        },
        address: "1 Test St, Boston".to_string(),
        price: None,
    }
}

pub fn rated_result(id: &str, stars: f64, review_count: usize) -> RatingResult {
    RatingResult {
        venue: test_venue(id, id),
        rating: Rating::Rated {
            mean: stars,
            stars: round_to_half(stars),
        },
        review_count,
        reviews: Vec::new(),
    }
}

pub fn unrated_result(id: &str) -> RatingResult {
    RatingResult {
        venue: test_venue(id, id),
        rating: Rating::Unrated,
        review_count: 0,
        reviews: Vec::new(),
    }
}

pub fn with_reviews(mut result: RatingResult, texts: &[&str], label: u8) -> RatingResult {
    result.reviews = texts
        .iter()
        .map(|t| ScoredReview {
            text: t.to_string(),
            score: score(label),
        })
        .collect();
    result
}

/// Places provider backed by fixed venues and tips.
#[derive(Default)]
pub struct FakePlaces {
    venues: Vec<Venue>,
    tips: HashMap<String, Vec<String>>,
    failing_tips: HashSet<String>,
    search_fails: bool,
    queries: Mutex<Vec<SearchQuery>>,
}

impl FakePlaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_venue(mut self, venue: Venue, tips: &[&str]) -> Self {
        self.tips
            .insert(venue.id.clone(), tips.iter().map(|t| t.to_string()).collect());
        self.venues.push(venue);
        self
    }

    pub fn with_failing_tips(mut self, venue: Venue) -> Self {
        self.failing_tips.insert(venue.id.clone());
        self.venues.push(venue);
        self
    }

    pub fn failing_search() -> Self {
        Self {
            search_fails: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlacesSource for FakePlaces {
    async fn search_venues(&self, query: &SearchQuery) -> Result<Vec<Venue>, NetworkError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.search_fails {
            return Err(NetworkError::Status {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(self.venues.clone())
    }

    async fn fetch_reviews(&self, venue_id: &str) -> Result<Vec<Review>, NetworkError> {
        if self.failing_tips.contains(venue_id) {
            return Err(NetworkError::Status {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(self
            .tips
            .get(venue_id)
            .map(|texts| {
                texts
                    .iter()
                    .map(|text| Review {
                        venue_id: venue_id.to_string(),
                        text: text.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Classifier that reads the label from a leading digit in the text,
/// e.g. `"5 amazing fish"` scores 5. Texts containing `"FAIL"` error out.
pub struct DigitModel;

impl SentimentModel for DigitModel {
    fn classify(&self, text: &str) -> Result<SentimentScore, ModelError> {
        if text.contains("FAIL") {
            return Err(ModelError::Label("forced failure".to_string()));
        }
        let label = text
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .map(|d| d as u8)
            .unwrap_or(3);
        Ok(score(label))
    }
}
