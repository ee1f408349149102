//! Envelope writers.

mod guid;
mod ifc;
mod obj;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::geom::{ExtrusionError, Point3};

pub use guid::{IFC_GUID_ALPHABET, compress_guid, new_ifc_guid};
pub use ifc::{IFC_SCHEMA, IfcWriter};
pub use obj::ObjWriter;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("refusing to overwrite existing file {} (use --overwrite)", .0.display())]
    Exists(PathBuf),
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("envelope is not writable: {0}")]
    InvalidEnvelope(String),
    #[error(transparent)]
    Extrusion(#[from] ExtrusionError),
    #[error("cannot format file timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Footprint plus height, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub refcat: String,
    pub zone_key: String,
    /// Projected footprint on `z = 0`, open or closed.
    pub footprint: Vec<Point3>,
    pub height_m: f64,
}

impl Envelope {
    pub(crate) fn check(&self) -> Result<(), ExportError> {
        if self.footprint.len() < 3 {
            return Err(ExportError::InvalidEnvelope(format!(
                "footprint has {} points",
                self.footprint.len()
            )));
        }
        if !self.height_m.is_finite() || self.height_m <= 0.0 {
            return Err(ExportError::InvalidEnvelope(format!(
                "height {} is not positive",
                self.height_m
            )));
        }
        if self.footprint.iter().any(|p| !p.is_finite()) {
            return Err(ExportError::InvalidEnvelope(
                "footprint has non-finite coordinates".to_owned(),
            ));
        }
        Ok(())
    }

    /// Footprint with the first point repeated at the end.
    pub(crate) fn closed_footprint(&self) -> Vec<Point3> {
        let mut ring = self.footprint.clone();
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
            if first != last {
                ring.push(first);
            }
        }
        ring
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Ifc,
    Obj,
}

impl OutputFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Ifc => "ifc",
            Self::Obj => "obj",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ifc" => Ok(Self::Ifc),
            "obj" => Ok(Self::Obj),
            other => Err(format!("unknown output format `{other}` (expected ifc or obj)")),
        }
    }
}

/// Emits an envelope to a file.
pub trait EnvelopeWriter: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn write(&self, envelope: &Envelope, path: &Path) -> Result<(), ExportError>;
}

impl<T: EnvelopeWriter + ?Sized> EnvelopeWriter for Box<T> {
    fn format(&self) -> OutputFormat {
        (**self).format()
    }

    fn write(&self, envelope: &Envelope, path: &Path) -> Result<(), ExportError> {
        (**self).write(envelope, path)
    }
}

/// `{prefix}_{refcat}_{zone}_envelope.{ext}`, with path separators in the zone replaced.
#[must_use]
pub fn output_file_name(prefix: &str, refcat: &str, zone_key: &str, format: OutputFormat) -> String {
    let zone = zone_key.replace(['/', '\\'], "-");
    format!("{prefix}_{refcat}_{zone}_envelope.{}", format.extension())
}

pub(crate) fn prepare_output(path: &Path, overwrite: bool) -> Result<(), ExportError> {
    if path.exists() && !overwrite {
        return Err(ExportError::Exists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
