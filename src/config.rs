//! Pipeline settings, loaded from the attributes of a single XML element:
//!
//! ```xml
//! <envelope default-height="10" utm-zone="31" output-prefix="malgrat"
//!           wfs-timeout-secs="30" overwrite="false"/>
//! ```
//!
//! Every attribute is optional. Command-line flags are applied on top.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::geom::ETRS89_UTM_31N;
use crate::source::CATASTRO_WFS_URL;
use crate::zoning::{DEFAULT_RULE_HEIGHT_M, DefaultPolicy};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config XML: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(rename = "@default-height")]
    pub default_height_m: f64,
    #[serde(rename = "@utm-zone")]
    pub utm_zone: u8,
    #[serde(rename = "@output-prefix")]
    pub output_prefix: String,
    #[serde(rename = "@project-name")]
    pub project_name: String,
    #[serde(rename = "@site-name")]
    pub site_name: String,
    #[serde(rename = "@wfs-url")]
    pub wfs_url: Option<String>,
    #[serde(rename = "@wfs-timeout-secs")]
    pub wfs_timeout_secs: u64,
    #[serde(rename = "@overwrite")]
    pub overwrite: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_height_m: DEFAULT_RULE_HEIGHT_M,
            utm_zone: ETRS89_UTM_31N,
            output_prefix: "malgrat".to_owned(),
            project_name: "Malgrat Envelope Project".to_owned(),
            site_name: "Malgrat de Mar".to_owned(),
            wfs_url: None,
            wfs_timeout_secs: 30,
            overwrite: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_xml_str(xml: &str) -> ConfigResult<Self> {
        let config: Self = quick_xml::de::from_str(xml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_xml_str(&xml)?;
        log::debug!("loaded pipeline config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.default_height_m.is_finite() || self.default_height_m < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "default-height must be a finite, non-negative number, got {}",
                self.default_height_m
            )));
        }
        if !(1..=60).contains(&self.utm_zone) {
            return Err(ConfigError::Invalid(format!(
                "utm-zone must be within 1..=60, got {}",
                self.utm_zone
            )));
        }
        if self.output_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("output-prefix must not be empty".to_owned()));
        }
        if self.output_prefix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "output-prefix must not contain path separators: {}",
                self.output_prefix
            )));
        }
        if self.wfs_timeout_secs == 0 {
            return Err(ConfigError::Invalid("wfs-timeout-secs must be positive".to_owned()));
        }
        Ok(())
    }

    #[must_use]
    pub fn default_policy(&self) -> DefaultPolicy {
        DefaultPolicy {
            height_m: self.default_height_m,
        }
    }

    #[must_use]
    pub fn wfs_url(&self) -> &str {
        self.wfs_url.as_deref().unwrap_or(CATASTRO_WFS_URL)
    }

    #[must_use]
    pub fn wfs_timeout(&self) -> Duration {
        Duration::from_secs(self.wfs_timeout_secs)
    }
}
