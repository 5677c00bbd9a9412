//! Sphere collision engine for spheretree
//!
//! This crate provides collision handling for moving spheres bounded by static
//! planes, including:
//! - Sphere and plane entities
//! - Sphere-sphere and sphere-plane detection and resolution
//! - A fixed-depth octree broad phase
//! - A collision world that runs one tick in brute-force or tree-accelerated mode

pub mod collision;
pub mod error;
pub mod octree;
pub mod shapes;
pub mod world;

// Re-export commonly used types
pub use collision::{
    resolve_sphere_pair, resolve_sphere_plane, sphere_vs_plane, sphere_vs_sphere, CollisionStats,
    Contact,
};
pub use error::PhysicsError;
pub use octree::{Octree, OctreeConfig, OctreeNode, MAX_OCTREE_DEPTH};
pub use shapes::{Plane, Sphere, SphereKey};
pub use world::{CollisionWorld, ResolutionMode, SimulationConfig};
