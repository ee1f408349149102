//! Parcel bounding box in projected metres.

use super::core::{BBox, Point3};
use super::projection::{LonLat, UtmProjection};
use super::GeometryError;

/// Projected axis-aligned extent of a parcel ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParcelExtent {
    pub bbox: BBox,
}

impl ParcelExtent {
    pub fn from_lonlat(ring: &[LonLat], projection: &UtmProjection) -> Result<Self, GeometryError> {
        let projected = projection.project_all(ring)?;
        let bbox = BBox::from_points(&projected).ok_or(GeometryError::EmptyRing)?;
        log::debug!(
            "parcel extent in UTM {}: {:.2} m x {:.2} m",
            projection.zone(),
            bbox.size().x,
            bbox.size().y
        );
        Ok(Self { bbox })
    }

    /// East-west extent.
    #[must_use]
    pub fn width_m(&self) -> f64 {
        self.bbox.size().x
    }

    /// North-south extent, used as the parcel depth.
    #[must_use]
    pub fn depth_m(&self) -> f64 {
        self.bbox.size().y
    }

    /// Rectangular footprint, counter-clockwise from the south-west corner.
    #[must_use]
    pub fn footprint(&self) -> [Point3; 4] {
        self.bbox.base_corners()
    }
}

/// `(width, depth)` of the projected bounding box.
pub fn bbox_size_m(ring: &[LonLat], projection: &UtmProjection) -> Result<(f64, f64), GeometryError> {
    let extent = ParcelExtent::from_lonlat(ring, projection)?;
    Ok((extent.width_m(), extent.depth_m()))
}

pub fn bbox_footprint(ring: &[LonLat], projection: &UtmProjection) -> Result<[Point3; 4], GeometryError> {
    Ok(ParcelExtent::from_lonlat(ring, projection)?.footprint())
}
