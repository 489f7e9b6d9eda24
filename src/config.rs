use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Pipeline configuration. Threaded explicitly into every stage call;
/// there is no module-level state, so a run is a pure function of
/// (input table, configuration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_file: PathBuf,
    pub processed_output: PathBuf,
    pub features_output: PathBuf,
    /// Label that replaces a problematic category.
    pub default_category: String,
    /// Sentinel strings the scraper emits when no real category exists.
    /// Matched exactly, not fuzzily.
    pub problematic_categories: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input_file: PathBuf::from("data/raw/all_books_with_images.csv"),
            processed_output: PathBuf::from("data/processed/books_processed.csv"),
            features_output: PathBuf::from("data/features/books_features.csv"),
            default_category: "Other".to_string(),
            problematic_categories: vec!["Add a comment".to_string(), "Default".to_string()],
        }
    }
}

impl PipelineConfig {
    /// Layer a JSON config file (when given) under `BOOKS_*` environment
    /// overrides. Missing keys fall back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<PipelineConfig, PipelineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }
        let settings = builder
            .add_source(Environment::with_prefix("BOOKS"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// Write the default configuration as a JSON template the operator can
/// edit and pass back via `--config`.
pub fn write_template(path: &Path) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(&PipelineConfig::default())
        .context("could not render the default configuration")?;
    fs::write(path, rendered).with_context(|| format!("could not write {}", path.display()))?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shipped_paths() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_category, "Other");
        assert_eq!(config.problematic_categories.len(), 2);
        assert!(config.input_file.ends_with("all_books_with_images.csv"));
    }

    #[test]
    fn template_round_trips_through_the_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        write_template(&path).unwrap();

        let loaded = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded, PipelineConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, r#"{ "default_category": "Misc" }"#).unwrap();

        let loaded = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.default_category, "Misc");
        assert_eq!(loaded.input_file, PipelineConfig::default().input_file);
    }
}
