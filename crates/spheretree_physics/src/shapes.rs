//! Collision entities: moving spheres and static planes

use crate::error::PhysicsError;
use slotmap::new_key_type;
use spheretree_math::Vec3;

new_key_type! {
    /// Key to a sphere in the collision world
    ///
    /// Spheres are compared by key, never by value: two spheres with identical
    /// state are still distinct bodies. Keys are generational, so a key to a
    /// removed sphere never aliases a sphere added later into the same slot.
    pub struct SphereKey;
}

/// A moving sphere with position, velocity and a fixed radius
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    /// Centre in world coordinates
    pub position: Vec3,
    /// Velocity in units per second
    pub velocity: Vec3,
    radius: f32,
}

impl Sphere {
    /// Create a resting sphere at `position`
    ///
    /// Fails if the radius is not finite and strictly positive.
    pub fn new(position: Vec3, radius: f32) -> Result<Self, PhysicsError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PhysicsError::InvalidRadius(radius));
        }
        Ok(Self {
            position,
            velocity: Vec3::ZERO,
            radius,
        })
    }

    /// Set the velocity of this sphere
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Advance the position by `velocity * dt`
    pub fn integrate(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    /// Check if a point is inside or on the sphere
    pub fn contains(&self, point: Vec3) -> bool {
        (point - self.position).length_squared() <= self.radius * self.radius
    }
}

/// A static infinite plane defined by a point and a unit normal
///
/// The normal points to the "outside" half-space, where spheres are allowed to
/// move freely. Points with a positive signed distance are outside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    point: Vec3,
    normal: Vec3,
}

impl Plane {
    /// Create a plane from a point on it and a normal
    ///
    /// The normal is normalized automatically.
    pub fn new(point: Vec3, normal: Vec3) -> Result<Self, PhysicsError> {
        let normal = normal
            .try_normalized()
            .ok_or(PhysicsError::DegenerateNormal)?;
        Ok(Self { point, normal })
    }

    /// The six inward-facing walls of an axis-aligned cube
    pub fn bounding_box(center: Vec3, half_extent: f32) -> [Plane; 6] {
        let wall = |axis: Vec3| Plane {
            point: center - axis * half_extent,
            normal: axis,
        };
        [
            wall(Vec3::X),
            wall(-Vec3::X),
            wall(Vec3::Y),
            wall(-Vec3::Y),
            wall(Vec3::Z),
            wall(-Vec3::Z),
        ]
    }

    #[inline]
    pub fn point(&self) -> Vec3 {
        self.point
    }

    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Signed distance from a point to the plane
    ///
    /// Positive = outside (normal side), zero or negative = touching or inside.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        (point - self.point).dot(self.normal)
    }

    /// Project a point onto the plane
    pub fn project_point(&self, point: Vec3) -> Vec3 {
        point - self.normal * self.signed_distance(point)
    }

    /// Check if a point is strictly on the outside of the plane
    pub fn is_outside(&self, point: Vec3) -> bool {
        self.signed_distance(point) > 0.0
    }
}
