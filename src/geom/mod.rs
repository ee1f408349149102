mod core;
mod extrusion;
mod footprint;
mod mesh;
mod projection;

pub use self::core::{BBox, Point3, Tolerance, Vec3};
pub use extrusion::{ExtrusionError, extrude_footprint, extrude_footprint_with_tolerance};
pub use footprint::{ParcelExtent, bbox_footprint, bbox_size_m};
pub use mesh::GeomMesh;
pub use projection::{ETRS89_UTM_31N, LonLat, UtmProjection};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("UTM zone must be within 1..=60, got {0}")]
    InvalidUtmZone(u8),
    #[error("coordinate ({lon}, {lat}) cannot be projected")]
    InvalidCoordinate { lon: f64, lat: f64 },
    #[error("parcel ring has no points")]
    EmptyRing,
}
