//! Built-in colour patterns.
//!
//! Each maps a division count to a flattened-index -> colour table.
//! They double as visualiser demos and as frame-function fixtures, so
//! [`register_builtins`] also exposes them as named per-field functions.

use std::collections::HashMap;

use geof_geo::{octahedron, tetrahedron, Solid};

use crate::centroid::{centroid_of, centroids};
use crate::field::{Divisions, FieldIndex};
use crate::functions::FunctionTable;

/// A colour as an RGB triple.
pub type Rgb = [u8; 3];

/// Four face colours plus the unclassified fallback.
pub const TETRAHEDRON_PALETTE: [Rgb; 5] = [
    [217, 82, 60],
    [86, 165, 78],
    [68, 118, 201],
    [229, 197, 70],
    [128, 128, 128],
];

/// Eight face colours plus the unclassified fallback.
pub const OCTAHEDRON_PALETTE: [Rgb; 9] = [
    [217, 82, 60],
    [86, 165, 78],
    [68, 118, 201],
    [229, 197, 70],
    [160, 90, 190],
    [70, 190, 190],
    [230, 140, 60],
    [150, 110, 80],
    [128, 128, 128],
];

/// Vertex, edge, and face colours for the icosahedron highlight.
pub const ICOSAHEDRON_PALETTE: [Rgb; 3] = [[255, 221, 0], [0, 168, 168], [40, 56, 76]];

fn face_color(solid: &Solid, palette: &[Rgb], idx: FieldIndex, d: Divisions) -> Rgb {
    let c = centroid_of(idx, d);
    match solid.face_of(c) {
        Some(f) => palette[usize::from(f)],
        None => palette[palette.len() - 1],
    }
}

fn solid_pattern(d: Divisions, solid: &Solid, palette: &[Rgb]) -> HashMap<u32, Rgb> {
    let cents = centroids(d);
    let mut out = HashMap::with_capacity(cents.len());
    for (flat, &c) in cents.iter().enumerate() {
        let color = match solid.face_of(c) {
            Some(f) => palette[usize::from(f)],
            None => palette[palette.len() - 1],
        };
        out.insert(flat as u32, color);
    }
    out
}

/// Colour every field by its tetrahedron face.
#[must_use]
pub fn tetrahedron_pattern(d: Divisions) -> HashMap<u32, Rgb> {
    solid_pattern(d, &tetrahedron(), &TETRAHEDRON_PALETTE)
}

/// Colour every field by its octahedron face.
#[must_use]
pub fn octahedron_pattern(d: Divisions) -> HashMap<u32, Rgb> {
    solid_pattern(d, &octahedron(), &OCTAHEDRON_PALETTE)
}

/// True when the field's lattice position lies on an icosahedron edge:
/// the section spine (`y == 0`) or one of the two rhombus diagonals.
fn on_icosa_edge(idx: FieldIndex, d: Divisions) -> bool {
    match idx {
        FieldIndex::North | FieldIndex::South => false,
        FieldIndex::Sxy(_, x, y) => y == 0 || x + y + 1 == d || x + y + 1 == 2 * d,
    }
}

/// Trace the icosahedron over the tiling: pentagon fields take the
/// vertex colour, fields on icosahedral edges the edge colour, the rest
/// the face colour.
#[must_use]
pub fn highlight_icosahedron(d: Divisions) -> HashMap<u32, Rgb> {
    let [vertex, edge, face] = ICOSAHEDRON_PALETTE;
    let mut out = HashMap::new();
    for idx in FieldIndex::iter(d) {
        let color = if idx.is_pentagonal(d) {
            vertex
        } else if on_icosa_edge(idx, d) {
            edge
        } else {
            face
        };
        out.insert(idx.to_flat(d), color);
    }
    out
}

/// Register the built-in patterns as named per-field functions under the
/// `geof.pattern` module. The frame's sphere data carries the division
/// count.
pub fn register_builtins(table: &mut FunctionTable<Rgb, Divisions>) {
    table.register_per_field("geof.pattern", "tetrahedron", |idx, _cur, _nbh, &d| {
        Ok(face_color(&tetrahedron(), &TETRAHEDRON_PALETTE, idx, d))
    });
    table.register_per_field("geof.pattern", "octahedron", |idx, _cur, _nbh, &d| {
        Ok(face_color(&octahedron(), &OCTAHEDRON_PALETTE, idx, d))
    });
    table.register_per_field("geof.pattern", "highlight_icosahedron", |idx, _cur, _nbh, &d| {
        let [vertex, edge, face] = ICOSAHEDRON_PALETTE;
        let color = if idx.is_pentagonal(d) {
            vertex
        } else if on_icosa_edge(idx, d) {
            edge
        } else {
            face
        };
        Ok(color)
    });
}
