//! Field identity, the flattened index, and whole-sphere iteration.
//!
//! A sphere with `d` edge subdivisions has `10*d^2 + 2` fields: the two
//! poles plus five sections of `2d * d` fields each. Twelve fields sit on
//! icosahedron vertices and are pentagonal; the rest are hexagonal.

/// Number of edge subdivisions of each icosahedral edge. Immutable per
/// sphere; must be at least 1.
pub type Divisions = u32;

/// Address of one field of the geodesic tiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldIndex {
    /// The north pole (unique).
    North,
    /// The south pole (unique).
    South,
    /// A section field: `(section 0..=4, x 0..2d, y 0..d)`.
    Sxy(u8, u32, u32),
}

/// Total field count for `d` divisions: `10*d^2 + 2`.
#[must_use]
pub fn field_count(d: Divisions) -> u32 {
    10 * d * d + 2
}

impl FieldIndex {
    /// True for the twelve fields on icosahedron vertices (five
    /// neighbours instead of six).
    #[must_use]
    pub fn is_pentagonal(self, d: Divisions) -> bool {
        match self {
            FieldIndex::North | FieldIndex::South => true,
            FieldIndex::Sxy(_, x, y) => y == 0 && (x + 1) % d == 0,
        }
    }

    /// Dense index in `[0, 10*d^2 + 2)`: `North -> 0`, `South -> 1`,
    /// `Sxy(s,x,y) -> s*2*d^2 + x*d + y + 2`.
    #[must_use]
    pub fn to_flat(self, d: Divisions) -> u32 {
        match self {
            FieldIndex::North => 0,
            FieldIndex::South => 1,
            FieldIndex::Sxy(s, x, y) => u32::from(s) * 2 * d * d + x * d + y + 2,
        }
    }

    /// Inverse of [`FieldIndex::to_flat`].
    ///
    /// # Panics
    /// Panics if `flat` is outside `[0, 10*d^2 + 2)`.
    #[must_use]
    pub fn from_flat(flat: u32, d: Divisions) -> FieldIndex {
        assert!(flat < field_count(d), "flat index {flat} out of range for d={d}");
        match flat {
            0 => FieldIndex::North,
            1 => FieldIndex::South,
            _ => {
                let i = flat - 2;
                let section_len = 2 * d * d;
                let s = (i / section_len) as u8;
                let rem = i % section_len;
                FieldIndex::Sxy(s, rem / d, rem % d)
            }
        }
    }

    /// Visit every field exactly once: `North`, `South`, then sections in
    /// lexicographic `(s, x, y)` order. The order matches ascending
    /// flattened index and is deterministic, which partitioning relies on.
    pub fn iter(d: Divisions) -> impl Iterator<Item = FieldIndex> {
        (0..field_count(d)).map(move |flat| FieldIndex::from_flat(flat, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_round_trip_small() {
        for d in 1..=4 {
            for flat in 0..field_count(d) {
                let idx = FieldIndex::from_flat(flat, d);
                assert_eq!(idx.to_flat(d), flat, "round trip failed at {flat} d={d}");
            }
        }
    }

    #[test]
    fn iteration_starts_at_poles() {
        let mut it = FieldIndex::iter(2);
        assert_eq!(it.next(), Some(FieldIndex::North));
        assert_eq!(it.next(), Some(FieldIndex::South));
        assert_eq!(it.next(), Some(FieldIndex::Sxy(0, 0, 0)));
    }
}
