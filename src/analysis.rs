//! Recommendation analysis over one set of search results: which cuisines show
//! up most, how price tier relates to rating, and what reviewers talk about.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::models::RatingResult;

const TOP_CUISINES: usize = 10;
const TOP_TERMS: usize = 15;
const MIN_TERM_LEN: usize = 3;
const LENGTH_BUCKET: usize = 100;
/// Reviews this long or longer share one open-ended bucket.
const LENGTH_CAP: usize = 1000;

lazy_static::lazy_static! {
    static ref STOPWORDS: HashSet<&'static str> = [
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her",
        "was", "one", "our", "out", "has", "have", "his", "how", "its", "may", "new", "now",
        "old", "see", "two", "way", "who", "did", "get", "got", "let", "too", "use", "very",
        "this", "that", "with", "they", "them", "then", "than", "there", "their", "what",
        "when", "where", "which", "will", "would", "could", "should", "from", "were", "been",
        "just", "also", "here", "some", "such", "only", "into", "more", "most", "much",
        "your", "about", "really", "because", "place", "restaurant",
        "los", "las", "una", "por", "con", "que", "del", "muy", "les", "des", "est", "pas",
        "der", "die", "und", "das", "ist", "sehr",
    ]
    .into_iter()
    .collect();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuisineCount {
    pub cuisine: String,
    pub count: usize,
}

/// Box-plot summary of star ratings within one price tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBand {
    pub price: u8,
    pub count: usize,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthBucket {
    pub from: usize,
    /// Inclusive upper bound; `None` for the last, open-ended bucket.
    pub to: Option<usize>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub cuisines: Vec<CuisineCount>,
    pub price_vs_rating: Vec<PriceBand>,
    pub top_terms: Vec<TermCount>,
    pub review_lengths: Vec<LengthBucket>,
}

pub fn analyze(results: &[RatingResult]) -> Analysis {
    Analysis {
        cuisines: cuisine_popularity(results),
        price_vs_rating: price_vs_rating(results),
        top_terms: top_terms(results),
        review_lengths: review_lengths(results),
    }
}

pub fn cuisine_popularity(results: &[RatingResult]) -> Vec<CuisineCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for result in results {
        if let Some(cuisine) = cuisine_of(result) {
            *counts.entry(cuisine).or_default() += 1;
        }
    }

    let mut cuisines: Vec<CuisineCount> = counts
        .into_iter()
        .map(|(cuisine, count)| CuisineCount { cuisine, count })
        .collect();
    cuisines.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.cuisine.cmp(&b.cuisine)));
    cuisines.truncate(TOP_CUISINES);
    cuisines
}

/// Category when Foursquare gives one, else the first capitalised word of the name.
fn cuisine_of(result: &RatingResult) -> Option<String> {
    let category = result.venue.category.trim();
    if !category.is_empty() {
        return Some(category.to_string());
    }

    result
        .venue
        .name
        .split_whitespace()
        .find(|word| is_title_or_upper(word))
        .map(String::from)
}

fn is_title_or_upper(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    let Some(first) = letters.first() else {
        return false;
    };
    let all_upper = letters.iter().all(|c| c.is_uppercase());
    let title = first.is_uppercase() && letters[1..].iter().all(|c| c.is_lowercase());
    all_upper || title
}

pub fn price_vs_rating(results: &[RatingResult]) -> Vec<PriceBand> {
    let mut by_price: BTreeMap<u8, Vec<f64>> = BTreeMap::new();
    for result in results {
        if let (Some(price), Some(stars)) = (result.venue.price, result.rating.stars()) {
            by_price.entry(price).or_default().push(stars);
        }
    }

    by_price
        .into_iter()
        .map(|(price, mut stars)| {
            stars.sort_by(|a, b| a.total_cmp(b));
            PriceBand {
                price,
                count: stars.len(),
                min: stars[0],
                median: median(&stars),
                max: stars[stars.len() - 1],
            }
        })
        .collect()
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn top_terms(results: &[RatingResult]) -> Vec<TermCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for review in results.iter().flat_map(|r| &r.reviews) {
        for word in review.text.split(|c: char| !c.is_alphabetic()) {
            let word = word.to_lowercase();
            if word.chars().count() >= MIN_TERM_LEN && !STOPWORDS.contains(word.as_str()) {
                *counts.entry(word).or_default() += 1;
            }
        }
    }

    let mut terms: Vec<TermCount> = counts
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();
    terms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    terms.truncate(TOP_TERMS);
    terms
}

pub fn review_lengths(results: &[RatingResult]) -> Vec<LengthBucket> {
    let mut buckets: BTreeMap<usize, usize> = BTreeMap::new();
    for review in results.iter().flat_map(|r| &r.reviews) {
        let bucket = review.text.chars().count().min(LENGTH_CAP) / LENGTH_BUCKET;
        *buckets.entry(bucket).or_default() += 1;
    }

    let Some(&last) = buckets.keys().next_back() else {
        return Vec::new();
    };
    let open_ended = LENGTH_CAP / LENGTH_BUCKET;
    // Empty buckets in between are kept so the histogram has no gaps.
    (0..=last)
        .map(|bucket| LengthBucket {
            from: bucket * LENGTH_BUCKET,
            to: (bucket < open_ended).then(|| (bucket + 1) * LENGTH_BUCKET - 1),
            count: buckets.get(&bucket).copied().unwrap_or(0),
        })
        .collect()
}
