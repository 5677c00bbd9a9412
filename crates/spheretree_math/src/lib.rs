//! 3D Mathematics Library
//!
//! This crate provides the vector type shared by the spheretree collision engine.
//!
//! ## Core Types
//!
//! - [`Vec3`] - 3D vector with x, y, z components

mod vec3;

pub use vec3::Vec3;
