use std::fs;
use std::path::Path;

use crate::error::PipelineError;
use crate::features::{category_column_name, FeatureTable, DERIVED_COLUMNS};
use crate::schema::{CleanedBookRecord, RawBookRecord};

/// Cleaned columns repeated at the front of the features output.
const BASE_COLUMNS: [&str; 8] = [
    "id",
    "title",
    "price",
    "availability",
    "rating",
    "stock",
    "category",
    "image",
];

/// Read the raw scraped table. A malformed row (wrong field count,
/// unparseable number) is an input defect, not something to skip.
pub fn read_raw(path: &Path) -> Result<Vec<RawBookRecord>, PipelineError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let record: RawBookRecord = record.map_err(|e| csv_error(path, e))?;
        rows.push(record);
    }
    Ok(rows)
}

pub fn read_processed(path: &Path) -> Result<Vec<CleanedBookRecord>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let record: CleanedBookRecord = record.map_err(|e| csv_error(path, e))?;
        rows.push(record);
    }
    Ok(rows)
}

pub fn write_processed(path: &Path, rows: &[CleanedBookRecord]) -> Result<(), PipelineError> {
    write_atomic(path, |writer| {
        for row in rows {
            writer.serialize(row)?;
        }
        Ok(())
    })
}

/// Write the features table: cleaned columns, derived columns, then one
/// one-hot column per distinct category (1/0 cells).
pub fn write_features(path: &Path, table: &FeatureTable) -> Result<(), PipelineError> {
    write_atomic(path, |writer| {
        let mut header: Vec<String> = BASE_COLUMNS.iter().map(|c| (*c).to_string()).collect();
        header.extend(DERIVED_COLUMNS.iter().map(|c| (*c).to_string()));
        header.extend(table.categories.iter().map(|c| category_column_name(c)));
        writer.write_record(&header)?;

        for row in &table.rows {
            let mut record = vec![
                row.base.id.clone(),
                row.base.title.clone(),
                row.base.price.to_string(),
                row.base.availability.to_string(),
                row.base.rating.to_string(),
                row.base.stock.to_string(),
                row.base.category.clone(),
                row.base.image.clone(),
                row.price_range.as_str().to_string(),
                row.has_subtitle.to_string(),
                row.has_series.to_string(),
                row.starts_with_the.to_string(),
                row.title_length.to_string(),
                row.title_word_count.to_string(),
                row.has_numbers.to_string(),
                row.rating_category.as_str().to_string(),
                row.stock_level.as_str().to_string(),
                row.popularity_score.to_string(),
            ];
            for flag in table.one_hot(row) {
                record.push(if flag { "1" } else { "0" }.to_string());
            }
            writer.write_record(&record)?;
        }
        Ok(())
    })
}

/// Fill a sibling temp file, then rename it over the target, so an abort
/// mid-stage never leaves a partial table behind.
fn write_atomic<F>(path: &Path, fill: F) -> Result<(), PipelineError>
where
    F: FnOnce(&mut csv::Writer<fs::File>) -> csv::Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }
    let tmp = path.with_extension("csv.tmp");
    match fill_file(&tmp, fill) {
        Ok(()) => fs::rename(&tmp, path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            io_error(path, source)
        }),
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            Err(err)
        }
    }
}

fn fill_file<F>(tmp: &Path, fill: F) -> Result<(), PipelineError>
where
    F: FnOnce(&mut csv::Writer<fs::File>) -> csv::Result<()>,
{
    let mut writer = csv::Writer::from_path(tmp).map_err(|e| csv_error(tmp, e))?;
    fill(&mut writer).map_err(|e| csv_error(tmp, e))?;
    writer.flush().map_err(|source| io_error(tmp, source))?;
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_error(path: &Path, err: csv::Error) -> PipelineError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => io_error(path, source),
        _ => PipelineError::Integrity(format!("{}: {}", path.display(), message)),
    }
}

// ── Tests ──
