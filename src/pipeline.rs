use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::error::{ModelError, SearchError};
use crate::models::{RatingResult, Review, ScoredReview, SkippedVenue};
use crate::places::{PlacesSource, SearchQuery};
use crate::rating::{aggregate, rank};
use crate::sentiment::SentimentModel;

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<RatingResult>,
    pub skipped: Vec<SkippedVenue>,
}

/// Search, fetch reviews, score and rank. A venue whose reviews cannot be
/// fetched or scored is skipped; only the search call itself can fail the run.
pub async fn run_search(
    request_id: &str,
    places: &dyn PlacesSource,
    model: Arc<dyn SentimentModel>,
    query: &SearchQuery,
) -> Result<SearchOutcome, SearchError> {
    let venues = places.search_venues(query).await?;
    if venues.is_empty() {
        info!("Request {}: No venues for '{}' near '{}'", request_id, query.cuisine, query.location);
        return Err(SearchError::EmptyResult);
    }
    info!("Request {}: Rating {} venues", request_id, venues.len());

    let mut results = Vec::with_capacity(venues.len());
    let mut skipped = Vec::new();

    for venue in venues {
        let reviews = match places.fetch_reviews(&venue.id).await {
            Ok(reviews) => reviews,
            Err(e) => {
                warn!("Request {}: Skipping {} ({}): {}", request_id, venue.name, venue.id, e);
                skipped.push(SkippedVenue {
                    venue_id: venue.id.clone(),
                    name: venue.name.clone(),
                    reason: format!("Could not fetch reviews: {}", e),
                });
                continue;
            }
        };

        let scored = match score_reviews(model.clone(), reviews).await {
            Ok(scored) => scored,
            Err(e) => {
                warn!("Request {}: Skipping {} ({}): {}", request_id, venue.name, venue.id, e);
                skipped.push(SkippedVenue {
                    venue_id: venue.id.clone(),
                    name: venue.name.clone(),
                    reason: format!("Could not score reviews: {}", e),
                });
                continue;
            }
        };

        let scores: Vec<_> = scored.iter().map(|r| r.score).collect();
        let rating = aggregate(&scores);
        debug!("Request {}: {} -> {:?} from {} reviews", request_id, venue.name, rating, scores.len());

        results.push(RatingResult {
            venue,
            rating,
            review_count: scores.len(),
            reviews: scored,
        });
    }

    rank(&mut results);
    info!(
        "Request {}: {} venues rated, {} skipped",
        request_id,
        results.len(),
        skipped.len()
    );
    Ok(SearchOutcome { results, skipped })
}

/// Inference is CPU-bound, so it runs on the blocking pool.
async fn score_reviews(
    model: Arc<dyn SentimentModel>,
    reviews: Vec<Review>,
) -> Result<Vec<ScoredReview>, ModelError> {
    if reviews.is_empty() {
        return Ok(Vec::new());
    }

    tokio::task::spawn_blocking(move || {
        reviews
            .into_iter()
            .map(|review| {
                let score = model.classify(&review.text).map_err(|e| {
                    debug!("Review for venue {} could not be scored: {}", review.venue_id, e);
                    e
                })?;
                Ok(ScoredReview {
                    text: review.text,
                    score,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()
    })
    .await
    .map_err(|e| ModelError::Task(e.to_string()))?
}
