#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Zoning envelopes for cadastral parcels in Malgrat de Mar.
//!
//! A parcel reference (refcat) is turned into a buildable volume: the parcel
//! outline comes from the Catastro WFS (or a saved response), the zone code
//! from the municipal POUM GML, and the regulatory height and depth from the
//! compiled zone table in [`zoning`]. Buildable parcels are written out as an
//! IFC4X3 (or OBJ) extrusion of their projected bounding box.

pub mod config;
pub mod export;
pub mod geom;
pub mod parse;
pub mod pipeline;
pub mod source;
pub mod zoning;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{EnvelopePipeline, Outcome, ParcelReport, PipelineError};
pub use zoning::{DefaultPolicy, Resolution, RuleSet, ZoneRule};
