//! Six-slot field adjacency with icosahedral seam handling.
//!
//! Slots are named after compass directions on the unrolled section net.
//! Slot naming is not symmetric (A's `e` may be B's `w`) but the relation
//! is: every neighbour names the field back through some slot.

use smallvec::SmallVec;

use crate::field::{Divisions, FieldIndex};

/// Directional slot of an adjacency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// North-west.
    Nw,
    /// West.
    W,
    /// South-west.
    Sw,
    /// South-east.
    Se,
    /// East.
    E,
    /// North-east; absent for pentagonal fields.
    Ne,
}

/// All slots in fixed order.
pub const DIRECTIONS: [Direction; 6] =
    [Direction::Nw, Direction::W, Direction::Sw, Direction::Se, Direction::E, Direction::Ne];

/// The neighbours of one field. `ne` is `None` exactly for the twelve
/// pentagonal fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjacency {
    /// North-west neighbour.
    pub nw: FieldIndex,
    /// West neighbour.
    pub w: FieldIndex,
    /// South-west neighbour.
    pub sw: FieldIndex,
    /// South-east neighbour.
    pub se: FieldIndex,
    /// East neighbour.
    pub e: FieldIndex,
    /// North-east neighbour, absent for pentagons.
    pub ne: Option<FieldIndex>,
}

impl Adjacency {
    /// Neighbour in `dir`, if present.
    #[must_use]
    pub fn get(&self, dir: Direction) -> Option<FieldIndex> {
        match dir {
            Direction::Nw => Some(self.nw),
            Direction::W => Some(self.w),
            Direction::Sw => Some(self.sw),
            Direction::Se => Some(self.se),
            Direction::E => Some(self.e),
            Direction::Ne => self.ne,
        }
    }

    /// Present slots in fixed direction order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, FieldIndex)> + '_ {
        DIRECTIONS.iter().filter_map(move |&dir| self.get(dir).map(|f| (dir, f)))
    }

    /// Number of present neighbours (5 for pentagons, 6 otherwise).
    #[must_use]
    pub fn count(&self) -> usize {
        if self.ne.is_some() {
            6
        } else {
            5
        }
    }
}

/// Adjacency record of `idx` on a sphere with `d` divisions.
///
/// # Panics
/// Panics if `d == 0` or `idx` is out of range for `d`.
#[must_use]
pub fn adjacent(idx: FieldIndex, d: Divisions) -> Adjacency {
    assert!(d >= 1, "divisions must be at least 1");
    let max_x = 2 * d - 1;
    let max_y = d - 1;
    let sxy = |s: u8, x: u32, y: u32| {
        debug_assert!(x <= max_x && y <= max_y);
        FieldIndex::Sxy(s, x, y)
    };
    match idx {
        FieldIndex::North => Adjacency {
            nw: sxy(0, 0, 0),
            w: sxy(1, 0, 0),
            sw: sxy(2, 0, 0),
            se: sxy(3, 0, 0),
            e: sxy(4, 0, 0),
            ne: None,
        },
        FieldIndex::South => Adjacency {
            nw: sxy(0, max_x, max_y),
            w: sxy(1, max_x, max_y),
            sw: sxy(2, max_x, max_y),
            se: sxy(3, max_x, max_y),
            e: sxy(4, max_x, max_y),
            ne: None,
        },
        FieldIndex::Sxy(s, x, y) => {
            assert!(u32::from(s) < 5 && x <= max_x && y <= max_y, "field out of range");
            let next_s = (s + 1) % 5;
            let prev_s = (s + 4) % 5;
            let pent = y == 0 && (x + 1) % d == 0;

            let nw = if x > 0 {
                sxy(s, x - 1, y)
            } else if y == 0 {
                FieldIndex::North
            } else {
                sxy(prev_s, y - 1, 0)
            };

            let w = if x == 0 {
                sxy(prev_s, y, 0)
            } else if y == max_y && x > d {
                sxy(prev_s, max_x, x - d)
            } else if y == max_y {
                sxy(prev_s, x + d - 1, 0)
            } else {
                sxy(s, x - 1, y + 1)
            };

            let sw = if y < max_y {
                sxy(s, x, y + 1)
            } else if x == max_x {
                FieldIndex::South
            } else if x >= d {
                sxy(prev_s, max_x, x - d + 1)
            } else {
                sxy(prev_s, x + d, 0)
            };

            let se = if pent && x == d - 1 {
                sxy(s, x + 1, 0)
            } else if pent {
                sxy(next_s, d, max_y)
            } else if x == max_x {
                sxy(next_s, y + d, max_y)
            } else {
                sxy(s, x + 1, y)
            };

            let e = if pent && x == d - 1 {
                sxy(next_s, 0, max_y)
            } else if pent {
                sxy(next_s, d - 1, max_y)
            } else if x == max_x {
                sxy(next_s, y + d - 1, max_y)
            } else if y == 0 && x < d {
                sxy(next_s, 0, x + 1)
            } else if y == 0 {
                sxy(next_s, x - d + 1, max_y)
            } else {
                sxy(s, x + 1, y - 1)
            };

            let ne = if pent {
                None
            } else if y > 0 {
                Some(sxy(s, x, y - 1))
            } else if x < d {
                Some(sxy(next_s, 0, x))
            } else {
                Some(sxy(next_s, x - d, max_y))
            };

            Adjacency { nw, w, sw, se, e, ne }
        }
    }
}

/// Flattened indices of the neighbours of `idx`, in slot order.
#[must_use]
pub fn neighbor_flats(idx: FieldIndex, d: Divisions) -> SmallVec<[u32; 6]> {
    adjacent(idx, d).iter().map(|(_, f)| f.to_flat(d)).collect()
}
