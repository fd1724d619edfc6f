//! Deterministic assignment of every field to a panel.
//!
//! Panels are the unit of concurrency: each is owned by one worker. A
//! field's panel is the face of a tetrahedron (4 panels) or octahedron
//! (8 panels) containing its centroid direction, so panels come out as
//! contiguous caps of the sphere.

use geof_geo::{octahedron, tetrahedron, Solid, Vec3};

use crate::field::{field_count, Divisions};

/// The fields owned by one panel, as sorted flattened indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSet {
    /// Panel index.
    pub panel: u8,
    /// Owned fields (ascending flattened index).
    pub fields: Vec<u32>,
}

/// Complete panel assignment for one sphere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Number of panels (4 or 8).
    pub panel_count: u8,
    /// Per-panel field sets, disjoint and covering all fields.
    pub panels: Vec<PanelSet>,
    /// For each flattened index, the owning panel.
    pub owner: Vec<u8>,
    /// For each flattened index, its position within the owning panel.
    pub local_index: Vec<u32>,
}

/// Errors from building or validating a partition.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PartitionError {
    /// Panel count must be 4 (tetrahedron) or 8 (octahedron).
    #[error("unsupported panel count {0} (expected 4 or 8)")]
    BadPanelCount(u8),
    /// A panel ended up without any fields.
    #[error("panel {0} owns no fields")]
    EmptyPanel(u8),
    /// owner/local_index tables disagree with the panel sets.
    #[error("field {0} not covered by its panel set")]
    Uncovered(u32),
}

/// Panel count for the available hardware parallelism: 8 when at least
/// eight workers fit, else 4.
#[must_use]
pub fn auto_panel_count() -> u8 {
    let threads = std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(1);
    if threads >= 8 {
        8
    } else {
        4
    }
}

/// Assign every field of a `d`-division sphere to a panel by classifying
/// its centroid. A classifier miss (possible only through numerical
/// drift) falls back to the nearest face centre, so every field is
/// assigned.
///
/// # Errors
/// `BadPanelCount` for counts other than 4 or 8; `EmptyPanel` if any
/// panel receives no fields (cannot happen for `d >= 1` with the
/// canonical solids).
pub fn build_partition(
    d: Divisions,
    centroids: &[Vec3],
    panel_count: u8,
) -> Result<Partition, PartitionError> {
    let solid: Solid = match panel_count {
        4 => tetrahedron(),
        8 => octahedron(),
        n => return Err(PartitionError::BadPanelCount(n)),
    };
    let n = field_count(d) as usize;
    debug_assert_eq!(centroids.len(), n);

    let mut panels: Vec<PanelSet> =
        (0..panel_count).map(|p| PanelSet { panel: p, fields: Vec::new() }).collect();
    let mut owner = vec![0u8; n];
    let mut local_index = vec![0u32; n];

    for (flat, &c) in centroids.iter().enumerate() {
        let face = solid.classify(c);
        let set = &mut panels[usize::from(face)];
        owner[flat] = face;
        local_index[flat] = u32::try_from(set.fields.len()).unwrap_or(u32::MAX);
        set.fields.push(u32::try_from(flat).unwrap_or(u32::MAX));
    }

    for set in &panels {
        if set.fields.is_empty() {
            return Err(PartitionError::EmptyPanel(set.panel));
        }
    }

    Ok(Partition { panel_count, panels, owner, local_index })
}

/// Check that the panel sets, `owner`, and `local_index` agree and
/// partition the full field range.
///
/// # Errors
/// `Uncovered` on any disagreement; `EmptyPanel` for an empty panel.
pub fn validate_partition(d: Divisions, part: &Partition) -> Result<(), PartitionError> {
    let n = field_count(d);
    let mut seen = vec![false; n as usize];
    for set in &part.panels {
        if set.fields.is_empty() {
            return Err(PartitionError::EmptyPanel(set.panel));
        }
        for (li, &flat) in set.fields.iter().enumerate() {
            let covered = flat < n
                && !seen[flat as usize]
                && part.owner[flat as usize] == set.panel
                && part.local_index[flat as usize] as usize == li;
            if !covered {
                return Err(PartitionError::Uncovered(flat));
            }
            seen[flat as usize] = true;
        }
    }
    match seen.iter().position(|&s| !s) {
        Some(flat) => Err(PartitionError::Uncovered(flat as u32)),
        None => Ok(()),
    }
}
