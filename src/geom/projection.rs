//! Geographic to UTM projection.
//!
//! Transverse Mercator on the GRS80 ellipsoid using the Krüger n-series to
//! third order, which is sub-millimetre inside a UTM zone. ETRS89 / UTM 31N
//! (EPSG:25831) is the zone used for Catalan cadastral work.

use super::core::Point3;
use super::GeometryError;

const GRS80_A: f64 = 6_378_137.0;
const GRS80_F: f64 = 1.0 / 298.257_222_101;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// UTM zone of EPSG:25831.
pub const ETRS89_UTM_31N: u8 = 31;

/// Geographic coordinate in degrees (EPSG:4326 axis order lon, lat).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmProjection {
    zone: u8,
    lon0_rad: f64,
    scaled_radius: f64,
    alpha: [f64; 3],
    conformal_factor: f64,
}

impl UtmProjection {
    pub fn new(zone: u8) -> Result<Self, GeometryError> {
        if !(1..=60).contains(&zone) {
            return Err(GeometryError::InvalidUtmZone(zone));
        }

        let n = GRS80_F / (2.0 - GRS80_F);
        let n2 = n * n;
        let n3 = n2 * n;
        let rectifying_radius = GRS80_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);

        Ok(Self {
            zone,
            lon0_rad: (f64::from(zone) * 6.0 - 183.0).to_radians(),
            scaled_radius: UTM_K0 * rectifying_radius,
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            conformal_factor: 2.0 * n.sqrt() / (1.0 + n),
        })
    }

    #[must_use]
    pub fn zone(&self) -> u8 {
        self.zone
    }

    /// Projects to `(easting, northing, 0)` in metres.
    pub fn project(&self, p: LonLat) -> Result<Point3, GeometryError> {
        if !p.lon.is_finite() || !p.lat.is_finite() || p.lat.abs() >= 90.0 {
            return Err(GeometryError::InvalidCoordinate { lon: p.lon, lat: p.lat });
        }

        let phi = p.lat.to_radians();
        let dl = p.lon.to_radians() - self.lon0_rad;
        let c = self.conformal_factor;

        let t = (phi.sin().atanh() - c * (c * phi.sin()).atanh()).sinh();
        let xi = t.atan2(dl.cos());
        let eta = (dl.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut easting = eta;
        let mut northing = xi;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            easting += alpha * (k * xi).cos() * (k * eta).sinh();
            northing += alpha * (k * xi).sin() * (k * eta).cosh();
        }

        let false_northing = if p.lat < 0.0 { UTM_FALSE_NORTHING_SOUTH } else { 0.0 };
        let projected = Point3::new(
            UTM_FALSE_EASTING + self.scaled_radius * easting,
            false_northing + self.scaled_radius * northing,
            0.0,
        );
        if projected.is_finite() {
            Ok(projected)
        } else {
            Err(GeometryError::InvalidCoordinate { lon: p.lon, lat: p.lat })
        }
    }

    pub fn project_all(&self, points: &[LonLat]) -> Result<Vec<Point3>, GeometryError> {
        points.iter().map(|p| self.project(*p)).collect()
    }
}
