//! `fact_comic_performance` derivation
//!
//! Views and reviews are simulated; cost follows from the title.

use rand::Rng;
use serde::Serialize;

use super::DimensionRow;

/// Views are drawn from `[0, VIEWS_CEILING)`
pub const VIEWS_CEILING: f64 = 10_000.0;

/// Cost charged per character of the title
pub const COST_PER_CHAR: i64 = 5;

pub const MIN_REVIEW: f64 = 1.0;
pub const MAX_REVIEW: f64 = 10.0;

/// Performance measures of one comic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRow {
    pub comic_id: i64,
    pub views: i64,
    pub cost: i64,
    pub customer_reviews: f64,
}

/// Simulated view count, uniform in `[0, 10000)` then truncated
pub fn views<R: Rng>(rng: &mut R) -> i64 {
    (rng.random::<f64>() * VIEWS_CEILING) as i64
}

/// Five per character of the title, counted in characters not bytes
pub fn cost(title: &str) -> i64 {
    COST_PER_CHAR * title.chars().count() as i64
}

/// Simulated review score in `[1.0, 10.0]`, one decimal place
pub fn customer_reviews<R: Rng>(rng: &mut R) -> f64 {
    let score: f64 = rng.random_range(MIN_REVIEW..=MAX_REVIEW);
    (score * 10.0).round() / 10.0
}

/// One fact row per dimension row, in the same order
pub fn derive_fact<R: Rng>(dimension: &[DimensionRow], rng: &mut R) -> Vec<FactRow> {
    dimension
        .iter()
        .map(|comic| FactRow {
            comic_id: comic.comic_id,
            views: views(rng),
            cost: cost(&comic.title),
            customer_reviews: customer_reviews(rng),
        })
        .collect()
}
