//! Run configuration (`reckon.toml`).

use chrono::NaiveDate;
use reckon_core::DateRange;
use reckon_reconcile::ReconcileSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Tracking window is inverted: {0}")]
    InvertedWindow(DateRange),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub window: WindowConfig,
    pub inputs: InputPaths,
    #[serde(default)]
    pub output: OutputPaths,
    #[serde(default)]
    pub reconcile: ReconcileSettings,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WindowConfig {
    pub tracking_start: NaiveDate,
    pub report_end: NaiveDate,
}

impl WindowConfig {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.tracking_start, self.report_end)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputPaths {
    /// One or more aggregator extracts, merged before reconciling.
    pub aggregator: Vec<PathBuf>,
    pub shared: PathBuf,
    pub rules: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputPaths {
    pub ledger: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let config: RunConfig = toml::from_str(content)?;
        let window = config.window.range();
        if window.is_inverted() {
            return Err(SettingsError::InvertedWindow(window));
        }
        Ok(config)
    }

    /// Reads `path` and resolves relative input and output paths against the
    /// directory that holds it.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_against(base);
        }
        Ok(config)
    }

    fn resolve_against(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.inputs.aggregator.iter_mut().for_each(resolve);
        resolve(&mut self.inputs.shared);
        resolve(&mut self.inputs.rules);
        if let Some(ledger) = self.output.ledger.as_mut() {
            resolve(ledger);
        }
    }
}
