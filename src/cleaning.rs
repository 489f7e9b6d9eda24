use std::collections::HashSet;

use tracing::info;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::schema::{validate_cleaned, CleanedBookRecord, RawBookRecord};

const AVAILABLE: &str = "yes";
const UNAVAILABLE: &str = "no";

#[derive(Debug)]
pub struct CleaningOutcome {
    pub rows: Vec<CleanedBookRecord>,
    /// How many category cells were sentinel values and got replaced.
    pub categories_normalized: usize,
}

/// Repair and normalize the raw table: null scan, id assignment,
/// category normalization, availability mapping, then the schema gate.
/// Any defect aborts the whole stage; nothing is imputed or skipped.
pub fn clean(
    raw: &[RawBookRecord],
    config: &PipelineConfig,
) -> Result<CleaningOutcome, PipelineError> {
    check_nulls(raw)?;
    let ids = assign_ids(raw.len())?;

    let mut categories_normalized = 0;
    let mut rows = Vec::with_capacity(raw.len());
    for ((idx, record), id) in raw.iter().enumerate().zip(ids) {
        let row = build_row(record, id, idx, config, &mut categories_normalized)?;
        rows.push(row);
    }

    for (idx, row) in rows.iter().enumerate() {
        validate_cleaned(row, idx)?;
    }

    info!(
        rows = rows.len(),
        categories_normalized, "cleaning stage complete"
    );
    Ok(CleaningOutcome {
        rows,
        categories_normalized,
    })
}

/// Scan every column for missing cells. Null raw data is an upstream
/// defect, so the scan names the column and the affected row count
/// instead of guessing at replacements. The image column is exempt:
/// the scraper legitimately finds no cover for some books.
fn check_nulls(raw: &[RawBookRecord]) -> Result<(), PipelineError> {
    let columns: [(&str, fn(&RawBookRecord) -> bool); 6] = [
        ("title", |r| r.title.is_none()),
        ("price", |r| r.price.is_none()),
        ("availability", |r| r.availability.is_none()),
        ("rating", |r| r.rating.is_none()),
        ("stock", |r| r.stock.is_none()),
        ("category", |r| r.category.is_none()),
    ];
    for (name, is_null) in columns {
        let nulls = raw.iter().filter(|r| is_null(r)).count();
        if nulls > 0 {
            return Err(PipelineError::Integrity(format!(
                "column {name:?} has {nulls} null value(s); fix the raw extract upstream"
            )));
        }
    }
    Ok(())
}

/// One id per row, in row order, re-checked for uniqueness afterwards.
fn assign_ids(count: usize) -> Result<Vec<String>, PipelineError> {
    let ids: Vec<String> = (0..count).map(|_| Uuid::new_v4().to_string()).collect();
    let mut seen = HashSet::with_capacity(ids.len());
    for id in &ids {
        if !seen.insert(id.as_str()) {
            return Err(PipelineError::IdentityConflict { id: id.clone() });
        }
    }
    Ok(ids)
}

fn build_row(
    record: &RawBookRecord,
    id: String,
    idx: usize,
    config: &PipelineConfig,
    categories_normalized: &mut usize,
) -> Result<CleanedBookRecord, PipelineError> {
    let (Some(title), Some(price), Some(token), Some(rating), Some(stock), Some(category)) = (
        record.title.clone(),
        record.price,
        record.availability.as_deref(),
        record.rating,
        record.stock,
        record.category.clone(),
    ) else {
        return Err(PipelineError::Integrity(format!(
            "row {idx}: missing value survived the null scan"
        )));
    };

    let (category, normalized) = normalize_category(category, config);
    if normalized {
        *categories_normalized += 1;
    }

    Ok(CleanedBookRecord {
        id,
        title,
        price,
        availability: parse_availability(token, idx)?,
        rating,
        stock,
        category,
        image: record.image.clone().unwrap_or_default(),
    })
}

/// Exact-match replacement of sentinel categories. Case or whitespace
/// variants pass through untouched.
fn normalize_category(category: String, config: &PipelineConfig) -> (String, bool) {
    if config.problematic_categories.iter().any(|p| *p == category) {
        (config.default_category.clone(), true)
    } else {
        (category, false)
    }
}

fn parse_availability(token: &str, row: usize) -> Result<u8, PipelineError> {
    match token.trim() {
        AVAILABLE => Ok(1),
        UNAVAILABLE => Ok(0),
        _ => Err(PipelineError::UnrecognizedValue {
            row,
            token: token.to_string(),
        }),
    }
}

// ── Tests ──
