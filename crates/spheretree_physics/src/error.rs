//! Physics error types
//!
//! Only construction and configuration can fail. Conditions that arise during a
//! tick (coincident centres, spheres outside the tree, empty leaves) are handled
//! in place and never surface as errors.

use std::fmt;

/// Error type for invalid physics objects or tree configuration
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// Sphere radius must be finite and strictly positive
    InvalidRadius(f32),
    /// Octree half-width must be finite and strictly positive
    InvalidHalfWidth(f32),
    /// Octree depth exceeds [`MAX_OCTREE_DEPTH`](crate::octree::MAX_OCTREE_DEPTH)
    DepthTooLarge(u32),
    /// Plane normal has zero length or non-finite components
    DegenerateNormal,
    /// Random spawn extent or speed must be finite and non-negative
    InvalidSpawnRange(f32),
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicsError::InvalidRadius(r) => {
                write!(f, "Invalid sphere radius: {} (must be finite and > 0)", r)
            }
            PhysicsError::InvalidHalfWidth(w) => {
                write!(f, "Invalid octree half-width: {} (must be finite and > 0)", w)
            }
            PhysicsError::DepthTooLarge(d) => write!(
                f,
                "Octree depth {} exceeds the maximum of {}",
                d,
                crate::octree::MAX_OCTREE_DEPTH
            ),
            PhysicsError::DegenerateNormal => write!(f, "Plane normal has no direction"),
            PhysicsError::InvalidSpawnRange(r) => {
                write!(f, "Invalid spawn range: {} (must be finite and >= 0)", r)
            }
        }
    }
}

impl std::error::Error for PhysicsError {}
