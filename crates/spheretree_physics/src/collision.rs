//! Collision detection and resolution for spheres and planes
//!
//! Detection reports a [`Contact`]; resolution pushes the bodies apart along the
//! contact normal and then exchanges (sphere-sphere) or reflects (sphere-plane)
//! the normal component of velocity. Mass is not modelled, so every sphere is
//! treated as having the same mass and planes as having infinite mass.
//!
//! Velocity response only fires while the bodies are approaching along the
//! normal. Together with the positional correction this makes resolution
//! idempotent: resolving a pair that has already been resolved is a no-op.

use crate::shapes::{Plane, Sphere};
use spheretree_math::Vec3;

/// Normal used when two sphere centres coincide and no direction is defined
pub const FALLBACK_NORMAL: Vec3 = Vec3::X;

/// Squared centre distance below which two spheres count as coincident
const COINCIDENT_DISTANCE_SQUARED: f32 = 1e-12;

/// Contact information from a collision
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Unit normal. For sphere pairs it points from the first sphere toward
    /// the second; for planes it is the plane normal.
    pub normal: Vec3,
    /// Overlap depth (zero means touching)
    pub penetration: f32,
}

impl Contact {
    /// Create a new contact
    pub fn new(normal: Vec3, penetration: f32) -> Self {
        Self {
            normal,
            penetration,
        }
    }

    /// Check if the bodies actually overlap rather than just touch
    pub fn is_penetrating(&self) -> bool {
        self.penetration > 0.0
    }
}

/// Test sphere vs sphere collision
///
/// Spheres collide when the distance between centres is at most the sum of
/// the radii. Compared squared, so no square root is taken for misses.
pub fn sphere_vs_sphere(a: &Sphere, b: &Sphere) -> Option<Contact> {
    let delta = b.position - a.position;
    let dist_sq = delta.length_squared();
    let min_dist = a.radius() + b.radius();

    // Negated so NaN positions count as a miss
    if !(dist_sq <= min_dist * min_dist) {
        return None;
    }

    if dist_sq > COINCIDENT_DISTANCE_SQUARED {
        let dist = dist_sq.sqrt();
        Some(Contact::new(delta / dist, min_dist - dist))
    } else {
        Some(Contact::new(FALLBACK_NORMAL, min_dist))
    }
}

/// Test sphere vs plane collision
///
/// Returns a contact if the sphere touches the plane or reaches past it.
/// The contact normal is the plane normal.
pub fn sphere_vs_plane(sphere: &Sphere, plane: &Plane) -> Option<Contact> {
    let signed_dist = plane.signed_distance(sphere.position);

    if signed_dist <= sphere.radius() {
        // penetration = radius - signed_dist holds on both sides of the plane
        Some(Contact::new(plane.normal(), sphere.radius() - signed_dist))
    } else {
        None
    }
}

/// Detect and resolve a collision between two spheres
///
/// Each sphere is moved half the penetration depth along the contact normal,
/// then the normal components of the velocities are swapped if the spheres
/// are approaching. Tangential velocity is untouched.
///
/// Returns true if the spheres were in contact.
pub fn resolve_sphere_pair(a: &mut Sphere, b: &mut Sphere) -> bool {
    let Some(contact) = sphere_vs_sphere(a, b) else {
        return false;
    };
    let normal = contact.normal;

    if contact.is_penetrating() {
        let half_correction = normal * (contact.penetration * 0.5);
        a.position -= half_correction;
        b.position += half_correction;
    }

    let va = a.velocity.dot(normal);
    let vb = b.velocity.dot(normal);
    if vb - va < 0.0 {
        a.velocity += normal * (vb - va);
        b.velocity += normal * (va - vb);
    }

    true
}

/// Detect and resolve a collision between a sphere and a static plane
///
/// The sphere is pushed out along the plane normal by the penetration depth and
/// the inward-pointing velocity component is reflected: `v' = v - 2(v·n)n`.
///
/// Returns true if the sphere was in contact with the plane.
pub fn resolve_sphere_plane(sphere: &mut Sphere, plane: &Plane) -> bool {
    let Some(contact) = sphere_vs_plane(sphere, plane) else {
        return false;
    };

    if contact.is_penetrating() {
        sphere.position += contact.normal * contact.penetration;
    }

    let velocity_along_normal = sphere.velocity.dot(contact.normal);
    if velocity_along_normal < 0.0 {
        sphere.velocity -= contact.normal * (2.0 * velocity_along_normal);
    }

    true
}

/// Per-tick collision counters
///
/// A check is one narrow-phase test; a contact is a check that found the
/// bodies touching or overlapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionStats {
    pub sphere_checks: u64,
    pub sphere_contacts: u64,
    pub plane_checks: u64,
    pub plane_contacts: u64,
}

impl CollisionStats {
    /// Zero all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record the outcome of one sphere-sphere check
    #[inline]
    pub fn record_sphere_check(&mut self, contact: bool) {
        self.sphere_checks += 1;
        self.sphere_contacts += contact as u64;
    }

    /// Record the outcome of one sphere-plane check
    #[inline]
    pub fn record_plane_check(&mut self, contact: bool) {
        self.plane_checks += 1;
        self.plane_contacts += contact as u64;
    }

    /// Sphere-sphere and sphere-plane checks combined
    pub fn total_checks(&self) -> u64 {
        self.sphere_checks + self.plane_checks
    }
}
