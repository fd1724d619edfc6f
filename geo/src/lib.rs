#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]

pub mod solids;
mod math;

pub use math::{line_intersects_triangle, Triangle, Vec3};
pub use solids::{octahedron, tetrahedron, Face, FaceId, Solid};
