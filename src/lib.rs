//! spheretree - octree-accelerated sphere collision simulation
//!
//! The collision engine itself lives in `spheretree_physics`; this crate adds
//! the application layer: layered configuration, scene population and the
//! fixed-step run loop.

pub mod config;
pub mod scene;
pub mod systems;
