use std::time::{Duration, Instant};

use tracing::info;

use crate::cleaning;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::features::{self, DERIVED_COLUMNS};
use crate::schema::CleanedBookRecord;
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Full,
    CleaningOnly,
    FeaturesOnly,
}

#[derive(Debug)]
pub struct RunSummary {
    pub mode: RunMode,
    pub rows_processed: usize,
    /// Always 0 today: the gates are fail-fast. Kept for a future
    /// partial-acceptance mode.
    pub rows_rejected: usize,
    pub categories_normalized: usize,
    pub features_created: usize,
    pub elapsed: Duration,
}

/// Sequence the stages for the requested mode. The full run feeds the
/// in-memory cleaned table straight into the feature stage; the
/// processed file is still persisted as a side effect.
pub fn run(mode: RunMode, config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    let started = Instant::now();
    let mut summary = RunSummary {
        mode,
        rows_processed: 0,
        rows_rejected: 0,
        categories_normalized: 0,
        features_created: 0,
        elapsed: Duration::ZERO,
    };

    let cleaned: Vec<CleanedBookRecord> = match mode {
        RunMode::Full | RunMode::CleaningOnly => {
            let raw = store::read_raw(&config.input_file)?;
            info!(
                rows = raw.len(),
                input = %config.input_file.display(),
                "raw table loaded"
            );
            let outcome = cleaning::clean(&raw, config)?;
            store::write_processed(&config.processed_output, &outcome.rows)?;
            info!(output = %config.processed_output.display(), "processed table written");
            summary.rows_processed = outcome.rows.len();
            summary.categories_normalized = outcome.categories_normalized;
            outcome.rows
        }
        RunMode::FeaturesOnly => {
            let rows = store::read_processed(&config.processed_output)?;
            info!(
                rows = rows.len(),
                input = %config.processed_output.display(),
                "processed table loaded"
            );
            summary.rows_processed = rows.len();
            rows
        }
    };

    if mode != RunMode::CleaningOnly {
        let table = features::engineer_features(&cleaned)?;
        store::write_features(&config.features_output, &table)?;
        info!(output = %config.features_output.display(), "features table written");
        summary.features_created = DERIVED_COLUMNS.len() + table.categories.len();
    }

    summary.elapsed = started.elapsed();
    Ok(summary)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn test_config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            input_file: dir.join("raw.csv"),
            processed_output: dir.join("processed/books_processed.csv"),
            features_output: dir.join("features/books_features.csv"),
            ..PipelineConfig::default()
        }
    }

    fn write_raw(config: &PipelineConfig, body: &str) {
        let mut content =
            String::from("title,price,availability,rating,stock,category,image\n");
        content.push_str(body);
        fs::write(&config.input_file, content).unwrap();
    }

    #[test]
    fn full_run_produces_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_raw(
            &config,
            "Plain Book,25.0,yes,4,10,Add a comment,\n\
             The Long Way (Part 1),45.0,no,2,20,Travel,x.jpg\n",
        );

        let summary = run(RunMode::Full, &config).unwrap();
        assert_eq!(summary.rows_processed, 2);
        assert_eq!(summary.rows_rejected, 0);
        assert_eq!(summary.categories_normalized, 1);
        // 10 derived columns + one one-hot column per category.
        assert_eq!(summary.features_created, 12);
        assert!(config.processed_output.exists());
        assert!(config.features_output.exists());
    }

    #[test]
    fn cleaning_only_stops_before_features() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_raw(&config, "Plain Book,25.0,yes,4,10,Fiction,\n");

        let summary = run(RunMode::CleaningOnly, &config).unwrap();
        assert_eq!(summary.rows_processed, 1);
        assert_eq!(summary.features_created, 0);
        assert!(config.processed_output.exists());
        assert!(!config.features_output.exists());
    }

    #[test]
    fn features_only_reads_the_persisted_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_raw(&config, "Plain Book,25.0,yes,4,10,Fiction,\n");
        run(RunMode::CleaningOnly, &config).unwrap();

        let summary = run(RunMode::FeaturesOnly, &config).unwrap();
        assert_eq!(summary.rows_processed, 1);
        assert_eq!(summary.features_created, 11);
        assert!(config.features_output.exists());
    }

    #[test]
    fn features_only_without_processed_table_fails_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let err = run(RunMode::FeaturesOnly, &config).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
        assert!(!config.features_output.exists());
    }

    #[test]
    fn null_price_aborts_before_any_output_exists() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_raw(
            &config,
            "Plain Book,25.0,yes,4,10,Fiction,\n\
             Broken Book,,yes,4,10,Fiction,\n",
        );

        let err = run(RunMode::Full, &config).unwrap_err();
        assert!(matches!(err, PipelineError::Integrity(_)));
        assert!(!config.processed_output.exists());
        assert!(!config.features_output.exists());
    }

    #[test]
    fn bad_availability_token_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_raw(&config, "Plain Book,25.0,in stock,4,10,Fiction,\n");

        let err = run(RunMode::Full, &config).unwrap_err();
        assert!(matches!(err, PipelineError::UnrecognizedValue { .. }));
        assert!(!config.processed_output.exists());
    }
}
