//! Unit-sphere centroid of every field.
//!
//! The icosahedron is embedded with the poles on the y-axis: five upper
//! vertices at latitude `atan(1/2)` (longitudes `72deg * s`) and five
//! lower vertices mirrored below (longitudes offset by 36 degrees).
//! Section `s` tiles the two rhombi between its own spine
//! (north pole -> upper vertex s -> lower vertex s) and the spine of
//! section `s-1`; a field centroid interpolates its rhombus linearly in
//! lattice coordinates and is then normalised onto the sphere. Geometry
//! is computed in f64 throughout.

use geof_geo::Vec3;

use crate::field::{field_count, Divisions, FieldIndex};

/// Icosahedron vertex frame used by all sections.
struct IcosaFrame {
    north: Vec3,
    south: Vec3,
    upper: [Vec3; 5],
    lower: [Vec3; 5],
}

impl IcosaFrame {
    fn new() -> Self {
        // Vertex latitude of an icosahedron with poles on the y-axis.
        let lat = 0.5_f64.atan();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let lon_step = 2.0 * std::f64::consts::PI / 5.0;
        let mut upper = [Vec3::ZERO; 5];
        let mut lower = [Vec3::ZERO; 5];
        for k in 0..5 {
            let lon_u = lon_step * k as f64;
            let lon_l = lon_u + lon_step / 2.0;
            upper[k] = Vec3::new(lon_u.cos() * cos_lat, sin_lat, lon_u.sin() * cos_lat);
            lower[k] = Vec3::new(lon_l.cos() * cos_lat, -sin_lat, lon_l.sin() * cos_lat);
        }
        Self {
            north: Vec3::new(0.0, 1.0, 0.0),
            south: Vec3::new(0.0, -1.0, 0.0),
            upper,
            lower,
        }
    }
}

/// Interpolate a non-planar quad `q00 -> q10` (spine axis, parameter `a`)
/// by `q00 -> q01` (westward axis, parameter `b`), split along the
/// `a + b == 1` diagonal into the quad's two icosahedral faces.
fn quad_point(a: f64, b: f64, q00: Vec3, q10: Vec3, q01: Vec3, q11: Vec3) -> Vec3 {
    if a + b <= 1.0 {
        q00.add(q10.sub(q00).mul(a)).add(q01.sub(q00).mul(b))
    } else {
        q11.add(q01.sub(q11).mul(1.0 - a)).add(q10.sub(q11).mul(1.0 - b))
    }
}

fn section_point(frame: &IcosaFrame, s: u8, x: u32, y: u32, d: Divisions) -> Vec3 {
    let s = usize::from(s);
    let prev = (s + 4) % 5;
    let df = f64::from(d);
    let b = f64::from(y) / df;
    if x < d {
        // Northern rhombus: north pole, upper_s, upper_prev, lower_prev.
        let a = f64::from(x + 1) / df;
        quad_point(a, b, frame.north, frame.upper[s], frame.upper[prev], frame.lower[prev])
    } else {
        // Southern rhombus: upper_s, lower_s, lower_prev, south pole.
        let a = f64::from(x + 1 - d) / df;
        quad_point(a, b, frame.upper[s], frame.lower[s], frame.lower[prev], frame.south)
    }
}

/// Unit-sphere centroid of a single field.
#[must_use]
pub fn centroid_of(idx: FieldIndex, d: Divisions) -> Vec3 {
    let frame = IcosaFrame::new();
    centroid_in_frame(&frame, idx, d)
}

fn centroid_in_frame(frame: &IcosaFrame, idx: FieldIndex, d: Divisions) -> Vec3 {
    match idx {
        FieldIndex::North => frame.north,
        FieldIndex::South => frame.south,
        FieldIndex::Sxy(s, x, y) => section_point(frame, s, x, y, d).normalized(),
    }
}

/// Centroids of every field, indexed by flattened index.
///
/// # Panics
/// Panics if `d == 0`.
#[must_use]
pub fn centroids(d: Divisions) -> Vec<Vec3> {
    assert!(d >= 1, "divisions must be at least 1");
    let frame = IcosaFrame::new();
    let mut out = Vec::with_capacity(field_count(d) as usize);
    for idx in FieldIndex::iter(d) {
        out.push(centroid_in_frame(&frame, idx, d));
    }
    out
}
