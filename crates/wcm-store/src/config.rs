//! Store configuration, read from `wcm.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use wcm_core::error::{Result, WcmError};

/// File name looked up in the data directory.
pub const CONFIG_FILE: &str = "wcm.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one `<collection>.yaml` per collection.
    pub data_dir: PathBuf,
    /// Directory holding `<schema>.yaml` definitions. Defaults to
    /// `<data_dir>/schemas`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_dir: Option<PathBuf>,
    /// Litres assumed for a container without an explicit capacity.
    pub nominal_bin_capacity: f64,
    /// Fill level above which a point is moved to maintenance.
    pub maintenance_fill_threshold: f64,
    /// Fill level above which a point counts as critical in statistics.
    pub critical_fill_threshold: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            schema_dir: None,
            nominal_bin_capacity: wcm_core::scheduling::NOMINAL_BIN_CAPACITY,
            maintenance_fill_threshold: 90.0,
            critical_fill_threshold: 80.0,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn schema_dir(&self) -> PathBuf {
        self.schema_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("schemas"))
    }

    /// Parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Io`] if the file cannot be read and
    /// [`WcmError::Parse`] if it is not valid TOML for this structure.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&path.display().to_string(), &text)
    }

    /// Load `wcm.toml` from `data_dir` if present, otherwise use defaults.
    /// The result is always rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// Same as [`StoreConfig::load`].
    pub fn discover(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = if path.is_file() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    fn from_toml(document: &str, text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            let (line, column) = match e.span() {
                Some(span) => {
                    let (line, column) = line_column(text, span.start);
                    (Some(line), Some(column))
                }
                None => (None, None),
            };
            WcmError::Parse {
                document: document.to_string(),
                line,
                column,
                message: e.message().to_string(),
            }
        })
    }
}

/// 1-based line and column of a byte offset.
fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}
