//! GEOF engine: a planet modelled as a geodesic sphere.
//!
//! The sphere is an icosahedron subdivided `d` times per edge, addressed
//! through [`field::FieldIndex`]. Fields are partitioned into panels,
//! each owned by a worker thread; a frame applies a per-field function
//! to every field against a consistent pre-frame snapshot and commits
//! the result atomically per panel.
#![deny(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::dbg_macro, clippy::large_enum_variant)]

/// Six-slot adjacency with icosahedral seam handling.
pub mod adjacency;
/// Field centroids on the unit sphere.
pub mod centroid;
/// Sphere runtime configuration.
pub mod config;
/// Field identity, flattened index, and iteration.
pub mod field;
/// Named frame-function table.
pub mod functions;
/// Panel worker and the field-data double buffer.
pub mod panel;
/// Field-to-panel assignment.
pub mod partition;
/// Built-in colour patterns.
pub mod pattern;
/// Sphere and panel handle directory.
pub mod registry;
/// Sphere coordinator and frame protocol.
pub mod sphere;

pub use config::SphereConfig;
pub use field::{field_count, Divisions, FieldIndex};
pub use registry::Registry;
pub use sphere::{spawn_sphere, FrameData, FrameEvent, SphereError, SphereEvent, SphereHandle, SphereId};

/// Returns the engine version string from Cargo metadata.
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn version_is_semver_like() {
        assert!(version().split('.').count() >= 3);
    }
}
