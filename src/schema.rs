use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One scraped book row exactly as it appears in the raw table. Every
/// field is optional so the cleaning stage can observe missing cells
/// instead of failing at parse time; an empty cell deserializes to None.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBookRecord {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub availability: Option<String>,
    pub rating: Option<u8>,
    pub stock: Option<u32>,
    pub category: Option<String>,
    /// The scraper does not always find a cover image.
    #[serde(default)]
    pub image: Option<String>,
}

/// A raw row after integrity repair and normalization. Fields are
/// concrete: the cleaning gate guarantees none are missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedBookRecord {
    pub id: String,
    pub title: String,
    pub price: f64,
    /// 1 = available, 0 = not.
    pub availability: u8,
    pub rating: u8,
    pub stock: u32,
    pub category: String,
    #[serde(default)]
    pub image: String,
}

/// A cleaned row plus the derived columns. Owns a copy of its base row;
/// the cleaned table is never mutated in place.
#[derive(Debug, Clone)]
pub struct FeaturedBookRecord {
    pub base: CleanedBookRecord,
    pub price_range: PriceRange,
    pub has_subtitle: bool,
    pub has_series: bool,
    pub starts_with_the: bool,
    pub title_length: usize,
    pub title_word_count: usize,
    pub has_numbers: bool,
    pub rating_category: RatingCategory,
    pub stock_level: StockLevel,
    pub popularity_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceRange {
    Low,
    Medium,
    High,
    Premium,
}

impl PriceRange {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceRange::Low => "Low",
            PriceRange::Medium => "Medium",
            PriceRange::High => "High",
            PriceRange::Premium => "Premium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingCategory {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RatingCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RatingCategory::VeryLow => "Very Low",
            RatingCategory::Low => "Low",
            RatingCategory::Medium => "Medium",
            RatingCategory::High => "High",
            RatingCategory::VeryHigh => "Very High",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    Low,
    Medium,
    High,
}

impl StockLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            StockLevel::Low => "Low",
            StockLevel::Medium => "Medium",
            StockLevel::High => "High",
        }
    }
}

/// Gate run over the whole cleaned table before it is written. A single
/// bad row aborts the stage; no partial table is ever emitted.
pub fn validate_cleaned(row: &CleanedBookRecord, idx: usize) -> Result<(), PipelineError> {
    if row.id.is_empty() {
        return Err(violation(idx, "id is empty"));
    }
    if row.title.is_empty() {
        return Err(violation(idx, "title is empty"));
    }
    if row.category.is_empty() {
        return Err(violation(idx, "category is empty"));
    }
    if !row.price.is_finite() || row.price < 0.0 {
        return Err(violation(idx, &format!("price {} is not a valid amount", row.price)));
    }
    if row.availability > 1 {
        return Err(violation(
            idx,
            &format!("availability {} is not a 0/1 indicator", row.availability),
        ));
    }
    if row.rating > 5 {
        return Err(violation(idx, &format!("rating {} exceeds 5", row.rating)));
    }
    Ok(())
}

/// Gate for featured rows: the base constraints still hold, the score is
/// a proper fraction, and the row's category has a one-hot column.
pub fn validate_featured(
    row: &FeaturedBookRecord,
    idx: usize,
    categories: &[String],
) -> Result<(), PipelineError> {
    validate_cleaned(&row.base, idx)?;
    if !(0.0..=1.0).contains(&row.popularity_score) {
        return Err(violation(
            idx,
            &format!("popularity_score {} is outside [0, 1]", row.popularity_score),
        ));
    }
    if !categories.iter().any(|c| c == &row.base.category) {
        return Err(violation(
            idx,
            &format!("category {:?} has no one-hot column", row.base.category),
        ));
    }
    Ok(())
}

fn violation(row: usize, reason: &str) -> PipelineError {
    PipelineError::SchemaViolation {
        row,
        reason: reason.to_string(),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned() -> CleanedBookRecord {
        CleanedBookRecord {
            id: "b-1".to_string(),
            title: "Plain Book".to_string(),
            price: 25.0,
            availability: 1,
            rating: 4,
            stock: 10,
            category: "Fiction".to_string(),
            image: String::new(),
        }
    }

    #[test]
    fn valid_row_passes() {
        assert!(validate_cleaned(&cleaned(), 0).is_ok());
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut row = cleaned();
        row.title.clear();
        let err = validate_cleaned(&row, 3).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaViolation { row: 3, .. }));
    }

    #[test]
    fn availability_must_be_binary() {
        let mut row = cleaned();
        row.availability = 2;
        assert!(validate_cleaned(&row, 0).is_err());
    }

    #[test]
    fn rating_above_five_is_rejected() {
        let mut row = cleaned();
        row.rating = 6;
        assert!(validate_cleaned(&row, 0).is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut row = cleaned();
        row.price = -1.0;
        assert!(validate_cleaned(&row, 0).is_err());
    }

    #[test]
    fn featured_row_needs_a_one_hot_column() {
        let row = FeaturedBookRecord {
            base: cleaned(),
            price_range: PriceRange::Medium,
            has_subtitle: false,
            has_series: false,
            starts_with_the: false,
            title_length: 10,
            title_word_count: 2,
            has_numbers: false,
            rating_category: RatingCategory::High,
            stock_level: StockLevel::Medium,
            popularity_score: 0.56,
        };
        let known = vec!["Fiction".to_string()];
        assert!(validate_featured(&row, 0, &known).is_ok());
        assert!(validate_featured(&row, 0, &[]).is_err());

        let mut bad = row.clone();
        bad.popularity_score = 1.2;
        assert!(validate_featured(&bad, 0, &known).is_err());
    }
}
