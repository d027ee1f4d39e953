use std::cmp::Ordering;

use crate::models::{Rating, RatingResult, SentimentScore};

const MIN_STARS: f64 = 1.0;
const MAX_STARS: f64 = 5.0;

/// Average the review labels of one venue. No scores means unrated, not zero.
pub fn aggregate(scores: &[SentimentScore]) -> Rating {
    if scores.is_empty() {
        return Rating::Unrated;
    }

    let total: f64 = scores.iter().map(|s| f64::from(s.label)).sum();
    let mean = (total / scores.len() as f64).clamp(MIN_STARS, MAX_STARS);
    Rating::Rated {
        mean,
        stars: round_to_half(mean),
    }
}

pub fn round_to_half(value: f64) -> f64 {
    ((value * 2.0).round() / 2.0).clamp(MIN_STARS, MAX_STARS)
}

/// Highest stars first, then most reviewed; unrated venues go last.
/// Stable, so equal entries keep their search order.
pub fn rank(results: &mut [RatingResult]) {
    results.sort_by(compare);
}

fn compare(a: &RatingResult, b: &RatingResult) -> Ordering {
    match (a.rating.stars(), b.rating.stars()) {
        (Some(x), Some(y)) => y
            .partial_cmp(&x)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.review_count.cmp(&a.review_count)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.review_count.cmp(&a.review_count),
    }
}
