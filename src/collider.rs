//! Collision primitives and penetration tests.
//!
//! Bone tips are tested as spheres against three primitive kinds: spheres,
//! capsules (a segment along the collider's local Y axis), and panels
//! (a bounded quad in the collider's local XY plane). All tests are pure:
//! they take world-space poses and return an optional [`Penetration`]
//! without mutating anything.

use bevy::prelude::*;

/// A sphere collision primitive.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct SphereCollider {
    /// Sphere radius.
    pub radius: f32,
}

impl SphereCollider {
    /// Create a sphere collider.
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

/// A capsule collision primitive.
///
/// The capsule's segment runs along the entity's local Y axis from
/// `-half_length` to `+half_length`.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct CapsuleCollider {
    /// Radius around the segment.
    pub radius: f32,
    /// Half the segment length.
    pub half_length: f32,
}

impl CapsuleCollider {
    /// Create a capsule collider.
    pub fn new(radius: f32, half_length: f32) -> Self {
        Self {
            radius,
            half_length,
        }
    }
}

/// A panel (bounded quad) collision primitive.
///
/// The quad spans the entity's local XY plane over `±half_extents`. A tip
/// collides when its sphere touches the closest point on the quad patch.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct PanelCollider {
    /// Half extents of the quad in its local X and Y axes.
    pub half_extents: Vec2,
}

impl PanelCollider {
    /// Create a panel collider.
    pub fn new(half_extents: Vec2) -> Self {
        Self { half_extents }
    }
}

/// Result of a penetration test: the direction to push the tip out and how
/// far to push it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Separation direction (unit vector, pointing away from the collider).
    pub normal: Vec3,
    /// Penetration depth along `normal`.
    pub depth: f32,
}

impl Penetration {
    /// The correction to add to the tip position to separate it.
    pub fn correction(&self) -> Vec3 {
        self.normal * self.depth
    }
}

/// Test a tip sphere against a sphere collider.
///
/// Radius-inclusive: the tip penetrates when its center is closer to the
/// collider center than the sum of both radii. A degenerate collider
/// (non-positive combined radius) or a tip exactly at the center yields no
/// penetration, since no separation direction can be derived.
pub fn sphere_penetration(
    center: Vec3,
    radius: f32,
    tip: Vec3,
    tip_radius: f32,
) -> Option<Penetration> {
    let combined = radius + tip_radius;
    if !(combined > 0.0) {
        return None;
    }
    let offset = tip - center;
    let distance_sq = offset.length_squared();
    if distance_sq >= combined * combined || distance_sq <= f32::EPSILON {
        return None;
    }
    let distance = distance_sq.sqrt();
    Some(Penetration {
        normal: offset / distance,
        depth: combined - distance,
    })
}

/// Test a tip sphere against a capsule collider given its world segment.
pub fn capsule_penetration(
    segment_start: Vec3,
    segment_end: Vec3,
    radius: f32,
    tip: Vec3,
    tip_radius: f32,
) -> Option<Penetration> {
    let closest = closest_point_on_segment(segment_start, segment_end, tip);
    sphere_penetration(closest, radius, tip, tip_radius)
}

/// Test a tip sphere against a panel collider given its world pose.
pub fn panel_penetration(
    origin: Vec3,
    rotation: Quat,
    half_extents: Vec2,
    tip: Vec3,
    tip_radius: f32,
) -> Option<Penetration> {
    if !(tip_radius > 0.0) || !(half_extents.x > 0.0) || !(half_extents.y > 0.0) {
        return None;
    }
    let local = rotation.inverse() * (tip - origin);
    let clamped = Vec3::new(
        local.x.clamp(-half_extents.x, half_extents.x),
        local.y.clamp(-half_extents.y, half_extents.y),
        0.0,
    );
    let closest = origin + rotation * clamped;
    sphere_penetration(closest, 0.0, tip, tip_radius)
}

/// Closest point to `point` on the segment `[a, b]`.
///
/// A degenerate (zero-length) segment returns `a`.
pub fn closest_point_on_segment(a: Vec3, b: Vec3, point: Vec3) -> Vec3 {
    let ab = b - a;
    let length_sq = ab.length_squared();
    if length_sq <= f32::EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    a + ab * t
}
