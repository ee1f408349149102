//! Refcat in, envelope file out.
//!
//! For each parcel: fetch the outline, look up the POUM zone, resolve the
//! zone rule, measure the projected bounding box, decide buildability and,
//! when buildable, write the extruded envelope.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::export::{Envelope, EnvelopeWriter, ExportError, output_file_name};
use crate::geom::{GeometryError, ParcelExtent, UtmProjection};
use crate::parse::cadastre_wfs::CadastreError;
use crate::parse::poum_gml::ZoningIndex;
use crate::source::ParcelGeometrySource;
use crate::zoning::{Buildability, RuleSet, classify};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Raw zone code used when the index has no zone for a parcel.
pub const UNKNOWN_ZONE: &str = "UNKNOWN";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("parcel reference (refcat) must not be empty")]
    EmptyParcelId,
    #[error("cannot obtain parcel geometry: {0}")]
    Geometry(#[from] CadastreError),
    #[error("cannot measure parcel: {0}")]
    Projection(#[from] GeometryError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Emitted { path: PathBuf },
    NotBuildable,
}

/// Everything decided for one parcel.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelReport {
    pub refcat: String,
    /// Zone code as found in the index, or [`UNKNOWN_ZONE`].
    pub raw_zone: String,
    pub zone_key: String,
    pub matched: bool,
    pub vertex_count: usize,
    pub bbox_width_m: f64,
    pub bbox_depth_m: f64,
    pub buildability: Buildability,
    pub outcome: Outcome,
}

impl ParcelReport {
    #[must_use]
    pub fn emitted_path(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::Emitted { path } => Some(path),
            Outcome::NotBuildable => None,
        }
    }
}

pub struct EnvelopePipeline<G, W> {
    rules: Arc<RuleSet>,
    index: Arc<ZoningIndex>,
    source: G,
    writer: W,
    config: PipelineConfig,
    projection: UtmProjection,
    out_dir: PathBuf,
}

impl<G, W> EnvelopePipeline<G, W>
where
    G: ParcelGeometrySource,
    W: EnvelopeWriter,
{
    pub fn new(
        rules: Arc<RuleSet>,
        index: Arc<ZoningIndex>,
        source: G,
        writer: W,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let projection = UtmProjection::new(config.utm_zone)?;
        Ok(Self {
            rules,
            index,
            source,
            writer,
            config,
            projection,
            out_dir: PathBuf::from("."),
        })
    }

    #[must_use]
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn run(&self, refcat: &str) -> Result<ParcelReport, PipelineError> {
        let refcat = refcat.trim();
        if refcat.is_empty() {
            return Err(PipelineError::EmptyParcelId);
        }

        let polygon = self.source.fetch(refcat)?;
        log::info!("{refcat}: read {} parcel vertices", polygon.len());

        let raw_zone = self
            .index
            .zone_of(refcat)
            .filter(|zone| !zone.trim().is_empty())
            .unwrap_or(UNKNOWN_ZONE);
        let (zone_key, resolution) = self.rules.resolve_with_canonical(raw_zone);
        let (rule, matched) = resolution.into_parts();
        if matched {
            log::info!("{refcat}: zone {zone_key}");
        } else {
            let hint = self
                .rules
                .closest_known_zone(zone_key)
                .map(|z| format!(", closest known zone is {z}"))
                .unwrap_or_default();
            log::warn!(
                "{refcat}: zone `{raw_zone}` (canonical `{zone_key}`) has no rule, using default{hint}"
            );
        }

        let extent = ParcelExtent::from_lonlat(polygon.points(), &self.projection)?;
        let (width, depth) = (extent.width_m(), extent.depth_m());
        log::info!("{refcat}: bounding box {width:.2} m x {depth:.2} m");

        let buildability = classify(rule, depth);
        log::info!(
            "{refcat}: buildable depth {:.2} m, regulatory height {:.2} m",
            buildability.depth_m,
            buildability.height_m
        );

        let outcome = if buildability.buildable {
            let envelope = Envelope {
                refcat: refcat.to_owned(),
                zone_key: zone_key.to_owned(),
                footprint: extent.footprint().to_vec(),
                height_m: buildability.height_m,
            };
            let file_name = output_file_name(
                &self.config.output_prefix,
                refcat,
                zone_key,
                self.writer.format(),
            );
            let path = self.out_dir.join(file_name);
            self.writer.write(&envelope, &path)?;
            log::info!("{refcat}: wrote {}", path.display());
            Outcome::Emitted { path }
        } else {
            log::info!("{refcat}: parcel is not buildable, no envelope written");
            Outcome::NotBuildable
        };

        Ok(ParcelReport {
            refcat: refcat.to_owned(),
            raw_zone: raw_zone.to_owned(),
            zone_key: zone_key.to_owned(),
            matched,
            vertex_count: polygon.len(),
            bbox_width_m: width,
            bbox_depth_m: depth,
            buildability,
            outcome,
        })
    }

    /// Runs every refcat independently. Results are in input order.
    #[cfg(feature = "parallel")]
    pub fn run_batch<S>(&self, refcats: &[S]) -> Vec<Result<ParcelReport, PipelineError>>
    where
        S: AsRef<str> + Sync,
    {
        refcats.par_iter().map(|r| self.run(r.as_ref())).collect()
    }

    /// Runs every refcat independently. Results are in input order.
    #[cfg(not(feature = "parallel"))]
    pub fn run_batch<S>(&self, refcats: &[S]) -> Vec<Result<ParcelReport, PipelineError>>
    where
        S: AsRef<str> + Sync,
    {
        refcats.iter().map(|r| self.run(r.as_ref())).collect()
    }
}
