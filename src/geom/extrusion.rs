use super::core::{Point3, Tolerance, Vec3};
use super::mesh::GeomMesh;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtrusionError {
    #[error("extrusion height must be finite and positive, got {0}")]
    InvalidHeight(f64),
    #[error("profile points must be finite")]
    NonFinitePoint,
    #[error("profile requires at least {min} unique points")]
    NotEnoughPoints { min: usize },
    #[error("profile is degenerate (zero area)")]
    ProfileDegenerate,
    #[error("failed to triangulate cap: {0}")]
    CapTriangulation(String),
}

/// Extrudes a horizontal footprint straight up into a closed, capped prism.
///
/// The footprint may repeat its first point at the end. Vertices are shared
/// between side walls and caps, so a box comes out as 8 vertices and 12
/// triangles with outward-facing winding.
pub fn extrude_footprint(footprint: &[Point3], height: f64) -> Result<GeomMesh, ExtrusionError> {
    extrude_footprint_with_tolerance(footprint, height, Tolerance::default_geom())
}

pub fn extrude_footprint_with_tolerance(
    footprint: &[Point3],
    height: f64,
    tol: Tolerance,
) -> Result<GeomMesh, ExtrusionError> {
    if !height.is_finite() || height <= 0.0 {
        return Err(ExtrusionError::InvalidHeight(height));
    }

    let mut ring = clean_ring(footprint, tol)?;
    let area = polygon_area_xy(&ring);
    if !area.is_finite() || area.abs() <= tol.eps {
        return Err(ExtrusionError::ProfileDegenerate);
    }
    if area < 0.0 {
        ring.reverse();
    }

    let cap = triangulate_xy_loop(&ring, tol)?;

    let n = ring.len();
    let up = Vec3::Z.mul_scalar(height);
    let mut positions: Vec<[f64; 3]> = Vec::with_capacity(n * 2);
    positions.extend(ring.iter().map(|p| p.to_array()));
    positions.extend(ring.iter().map(|p| p.add_vec(up).to_array()));

    let mut indices: Vec<u32> = Vec::with_capacity(n * 6 + cap.len() * 6);
    for i in 0..n {
        let i0 = i as u32;
        let i1 = ((i + 1) % n) as u32;
        let j0 = (n + i) as u32;
        let j1 = (n + (i + 1) % n) as u32;

        indices.extend_from_slice(&[i0, i1, j1]);
        indices.extend_from_slice(&[i0, j1, j0]);
    }

    let top = n as u32;
    for [a, b, c] in cap.iter().copied() {
        indices.extend_from_slice(&[a, c, b]);
        indices.extend_from_slice(&[top + a, top + b, top + c]);
    }

    Ok(GeomMesh::new(positions, indices))
}

fn clean_ring(points: &[Point3], tol: Tolerance) -> Result<Vec<Point3>, ExtrusionError> {
    if points.iter().any(|p| !p.is_finite()) {
        return Err(ExtrusionError::NonFinitePoint);
    }

    let mut cleaned: Vec<Point3> = Vec::with_capacity(points.len());
    for p in points.iter().copied() {
        if cleaned
            .last()
            .copied()
            .is_some_and(|prev| tol.approx_eq_point3(prev, p))
        {
            continue;
        }
        cleaned.push(p);
    }

    if cleaned.len() > 2 {
        if let (Some(first), Some(last)) = (cleaned.first().copied(), cleaned.last().copied()) {
            if tol.approx_eq_point3(first, last) {
                cleaned.pop();
            }
        }
    }

    if cleaned.len() < 3 {
        return Err(ExtrusionError::NotEnoughPoints { min: 3 });
    }
    Ok(cleaned)
}

fn polygon_area_xy(points: &[Point3]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        area += a.x * b.y - b.x * a.y;
    }
    0.5 * area
}

fn cross_xy(o: Point3, a: Point3, b: Point3) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn point_in_triangle_xy(p: Point3, a: Point3, b: Point3, c: Point3, eps: f64) -> bool {
    cross_xy(a, b, p) > eps && cross_xy(b, c, p) > eps && cross_xy(c, a, p) > eps
}

/// Ear clipping for a counter-clockwise simple polygon. Returns triangles as
/// indices into `ring`, all counter-clockwise.
fn triangulate_xy_loop(ring: &[Point3], tol: Tolerance) -> Result<Vec<[u32; 3]>, ExtrusionError> {
    let mut remaining: Vec<usize> = (0..ring.len()).collect();
    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let prev = ring[remaining[(i + m - 1) % m]];
            let cur = ring[remaining[i]];
            let next = ring[remaining[(i + 1) % m]];
            if cross_xy(prev, cur, next) <= tol.eps {
                return false;
            }
            !remaining.iter().enumerate().any(|(k, &idx)| {
                k != i
                    && k != (i + m - 1) % m
                    && k != (i + 1) % m
                    && point_in_triangle_xy(ring[idx], prev, cur, next, tol.eps)
            })
        });

        let Some(i) = ear else {
            return Err(ExtrusionError::CapTriangulation(format!(
                "no ear found with {m} vertices left"
            )));
        };

        triangles.push([
            remaining[(i + m - 1) % m] as u32,
            remaining[i] as u32,
            remaining[(i + 1) % m] as u32,
        ]);
        remaining.remove(i);
    }

    triangles.push([remaining[0] as u32, remaining[1] as u32, remaining[2] as u32]);
    Ok(triangles)
}
