use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub category: String,
    pub coordinates: Coordinates,
    pub address: String,
    /// Foursquare price tier, 1 (cheap) to 4 (very expensive).
    pub price: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub venue_id: String,
    pub text: String,
}

/// Ordinal sentiment of one review, 1 (very negative) to 5 (very positive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: u8,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredReview {
    pub text: String,
    pub score: SentimentScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Rating {
    Unrated,
    Rated {
        /// Mean of the review labels, clipped to 1..=5.
        mean: f64,
        /// `mean` rounded to the nearest half star.
        stars: f64,
    },
}

impl Rating {
    pub fn stars(&self) -> Option<f64> {
        match self {
            Rating::Unrated => None,
            Rating::Rated { stars, .. } => Some(*stars),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingResult {
    pub venue: Venue,
    pub rating: Rating,
    pub review_count: usize,
    pub reviews: Vec<ScoredReview>,
}

/// A venue that was found but left out of the results.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedVenue {
    pub venue_id: String,
    pub name: String,
    pub reason: String,
}
