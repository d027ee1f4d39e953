//! Review sentiment scoring.
//!
//! The scorer is a trait so the search pipeline does not care which classifier
//! runs behind it; the production one is the BERT model in [`crate::bert`].

use crate::error::ModelError;
use crate::models::SentimentScore;

pub const MIN_LABEL: u8 = 1;
pub const MAX_LABEL: u8 = 5;

pub trait SentimentModel: Send + Sync {
    fn classify(&self, text: &str) -> Result<SentimentScore, ModelError>;
}

/// Read the star count out of a class label such as `"4 stars"` or `"1 star"`.
pub fn parse_star_label(label: &str) -> Option<u8> {
    let digits: String = label
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse::<u8>()
        .ok()
        .filter(|n| (MIN_LABEL..=MAX_LABEL).contains(n))
}

/// Pick the most likely class and turn it into a score.
///
/// `labels[i]` is the star label of class `i`.
pub fn score_from_probabilities(probs: &[f32], labels: &[u8]) -> Result<SentimentScore, ModelError> {
    if probs.is_empty() || probs.len() != labels.len() {
        return Err(ModelError::Label(format!(
            "got {} probabilities for {} labels",
            probs.len(),
            labels.len()
        )));
    }

    let (best, confidence) = probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |acc, (i, p)| if p > acc.1 { (i, p) } else { acc });

    if !confidence.is_finite() {
        return Err(ModelError::Label("model produced non-finite probabilities".to_string()));
    }

    Ok(SentimentScore {
        label: labels[best],
        confidence: confidence.clamp(0.0, 1.0),
    })
}
