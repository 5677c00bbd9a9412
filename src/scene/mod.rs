//! Scene construction utilities
//!
//! This module provides a declarative API for populating a collision world.

mod scene_builder;

pub use scene_builder::SceneBuilder;
