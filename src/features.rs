use itertools::{Itertools, MinMaxResult};
use tracing::info;

use crate::error::PipelineError;
use crate::schema::{
    validate_featured, CleanedBookRecord, FeaturedBookRecord, PriceRange, RatingCategory,
    StockLevel,
};

/// Price bucket breakpoints. Empirically chosen for the source catalog;
/// tune them here, not in the row logic.
const PRICE_LOW_MAX: f64 = 20.0;
const PRICE_MEDIUM_MAX: f64 = 40.0;
const PRICE_HIGH_MAX: f64 = 50.0;

const STOCK_LOW_MAX: u32 = 5;
const STOCK_MEDIUM_MAX: u32 = 15;

/// Popularity blend weights: rating dominates, stock breaks ties.
const RATING_WEIGHT: f64 = 0.7;
const STOCK_WEIGHT: f64 = 0.3;

/// Derived column names in output order, ahead of the one-hot columns.
pub const DERIVED_COLUMNS: [&str; 10] = [
    "price_range",
    "has_subtitle",
    "has_series",
    "starts_with_the",
    "title_length",
    "title_word_count",
    "has_numbers",
    "rating_category",
    "stock_level",
    "popularity_score",
];

/// The feature stage's output: derived rows plus the sorted distinct
/// category set that fixes the one-hot column layout. Sorting makes the
/// output schema deterministic regardless of row order.
pub struct FeatureTable {
    pub categories: Vec<String>,
    pub rows: Vec<FeaturedBookRecord>,
}

impl FeatureTable {
    /// One-hot flags for `row`, aligned with `categories`.
    pub fn one_hot(&self, row: &FeaturedBookRecord) -> Vec<bool> {
        self.categories
            .iter()
            .map(|c| *c == row.base.category)
            .collect()
    }
}

pub fn engineer_features(cleaned: &[CleanedBookRecord]) -> Result<FeatureTable, PipelineError> {
    // First pass: fix the one-hot column set and the stock range before
    // any per-row work.
    let categories: Vec<String> = cleaned
        .iter()
        .map(|r| r.category.clone())
        .sorted()
        .dedup()
        .collect();
    let stock_range = match cleaned.iter().map(|r| r.stock).minmax() {
        MinMaxResult::NoElements => (0, 0),
        MinMaxResult::OneElement(s) => (s, s),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };

    // Second pass: per-row derivation, all pure functions of the row and
    // the two whole-table statistics above.
    let mut rows = Vec::with_capacity(cleaned.len());
    for (idx, record) in cleaned.iter().enumerate() {
        rows.push(derive_row(record, idx, stock_range)?);
    }
    for (idx, row) in rows.iter().enumerate() {
        validate_featured(row, idx, &categories)?;
    }

    info!(
        rows = rows.len(),
        derived = DERIVED_COLUMNS.len(),
        one_hot = categories.len(),
        "feature stage complete"
    );
    Ok(FeatureTable { categories, rows })
}

fn derive_row(
    record: &CleanedBookRecord,
    idx: usize,
    (stock_min, stock_max): (u32, u32),
) -> Result<FeaturedBookRecord, PipelineError> {
    Ok(FeaturedBookRecord {
        price_range: price_range(record.price, idx)?,
        has_subtitle: record.title.contains(':'),
        has_series: record.title.contains('('),
        starts_with_the: record.title.starts_with("The "),
        title_length: record.title.chars().count(),
        title_word_count: record.title.split_whitespace().count(),
        has_numbers: record.title.chars().any(|c| c.is_ascii_digit()),
        rating_category: rating_category(record.rating, idx)?,
        stock_level: stock_level(record.stock),
        popularity_score: popularity_score(record.rating, record.stock, stock_min, stock_max),
        base: record.clone(),
    })
}

/// Bucket a price at the 20 / 40 / 50 breakpoints. Out-of-domain input
/// is an error, never clamped.
pub fn price_range(price: f64, row: usize) -> Result<PriceRange, PipelineError> {
    if !price.is_finite() || price < 0.0 {
        return Err(PipelineError::Domain {
            row,
            column: "price",
            value: price.to_string(),
            expected: "a finite non-negative amount",
        });
    }
    Ok(if price <= PRICE_LOW_MAX {
        PriceRange::Low
    } else if price <= PRICE_MEDIUM_MAX {
        PriceRange::Medium
    } else if price <= PRICE_HIGH_MAX {
        PriceRange::High
    } else {
        PriceRange::Premium
    })
}

pub fn rating_category(rating: u8, row: usize) -> Result<RatingCategory, PipelineError> {
    match rating {
        0 | 1 => Ok(RatingCategory::VeryLow),
        2 => Ok(RatingCategory::Low),
        3 => Ok(RatingCategory::Medium),
        4 => Ok(RatingCategory::High),
        5 => Ok(RatingCategory::VeryHigh),
        other => Err(PipelineError::Domain {
            row,
            column: "rating",
            value: other.to_string(),
            expected: "0..=5",
        }),
    }
}

pub fn stock_level(stock: u32) -> StockLevel {
    if stock <= STOCK_LOW_MAX {
        StockLevel::Low
    } else if stock <= STOCK_MEDIUM_MAX {
        StockLevel::Medium
    } else {
        StockLevel::High
    }
}

/// `(rating/5)*0.7 + normalized_stock*0.3`. Stock is min-max scaled over
/// the table's observed range; a degenerate range contributes 0 instead
/// of dividing by zero.
pub fn popularity_score(rating: u8, stock: u32, stock_min: u32, stock_max: u32) -> f64 {
    let rating_part = f64::from(rating) / 5.0;
    let stock_part = if stock_max == stock_min {
        0.0
    } else {
        f64::from(stock - stock_min) / f64::from(stock_max - stock_min)
    };
    rating_part * RATING_WEIGHT + stock_part * STOCK_WEIGHT
}

/// Deterministic one-hot column name for a category label: lowercase,
/// '&' spelled out, non-alphanumeric runs collapsed to '_'.
pub fn category_column_name(category: &str) -> String {
    let mut name = String::from("category_");
    for ch in category.to_lowercase().replace('&', "and").chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch);
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }
    name.trim_end_matches('_').to_string()
}

// ── Tests ──
