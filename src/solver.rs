//! Pure per-bone solver math.
//!
//! Everything here operates on plain vectors and quaternions so it can be
//! tested without an ECS world. The systems in
//! [`systems`](crate::systems) resolve entity references to world-space
//! poses and feed them through these functions in the order: stiffness
//! blend, angle clamp, collision resolution, length-limit resolution.

use bevy::prelude::*;

use crate::collider::{self, Penetration};
use crate::config::AngleLimit;

/// Velocity decay rate applied per unit `drag_force`.
///
/// `drag_force = 1` removes all but `e^-1` of the tip velocity over one
/// second at this rate. Tunable, not a physical constant.
pub const DRAG_DECAY_RATE: f32 = 6.0;

/// World-space pose of one collision primitive, resolved once per tick and
/// shared read-only by every bone of a manager.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedCollider {
    /// Sphere at a world position.
    Sphere { center: Vec3, radius: f32 },
    /// Capsule as a world segment with radius.
    Capsule {
        start: Vec3,
        end: Vec3,
        radius: f32,
    },
    /// Bounded quad with a world pose.
    Panel {
        origin: Vec3,
        rotation: Quat,
        half_extents: Vec2,
    },
}

impl ResolvedCollider {
    /// Penetration of a tip sphere into this primitive, if any.
    pub fn penetration(&self, tip: Vec3, tip_radius: f32) -> Option<Penetration> {
        match *self {
            Self::Sphere { center, radius } => {
                collider::sphere_penetration(center, radius, tip, tip_radius)
            }
            Self::Capsule { start, end, radius } => {
                collider::capsule_penetration(start, end, radius, tip, tip_radius)
            }
            Self::Panel {
                origin,
                rotation,
                half_extents,
            } => collider::panel_penetration(origin, rotation, half_extents, tip, tip_radius),
        }
    }
}

/// Time-scaled exponential convergence factor in `[0, 1)`.
///
/// Applying the factor for `dt / 2` twice converges exactly as far as
/// applying it for `dt` once, which keeps the stiffness blend frame-rate
/// independent. Non-positive or non-finite inputs yield `0.0` (no motion).
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    if !(rate > 0.0) || !(dt > 0.0) || !rate.is_finite() || !dt.is_finite() {
        return 0.0;
    }
    1.0 - (-rate * dt).exp()
}

/// Rotate the unit direction `current` toward `target` by `factor` of the
/// arc between them.
///
/// Degenerate inputs (zero-length or non-finite vectors) return `current`
/// unchanged.
pub fn blend_direction(current: Vec3, target: Vec3, factor: f32) -> Vec3 {
    let current_n = current.normalize_or_zero();
    let target_n = target.normalize_or_zero();
    if current_n == Vec3::ZERO || target_n == Vec3::ZERO || !factor.is_finite() {
        return current;
    }
    let arc = Quat::from_rotation_arc(current_n, target_n);
    Quat::IDENTITY.slerp(arc, factor.clamp(0.0, 1.0)) * current_n
}

/// Decompose a unit direction in the bone's axis frame (rest direction
/// mapped to +X) into `(y_angle, z_angle)` in degrees.
///
/// The Y angle is the rotation about the frame's Y axis, `atan2(-z, x)` in
/// `[-180, 180]`; the Z angle the elevation toward +Y, `asin(y)` in
/// `[-90, 90]`. The pair recomposes exactly via [`compose_offset`].
pub fn decompose_offset(dir: Vec3) -> (f32, f32) {
    let y_angle = (-dir.z).atan2(dir.x).to_degrees();
    let z_angle = dir.y.clamp(-1.0, 1.0).asin().to_degrees();
    (y_angle, z_angle)
}

/// Rebuild a unit direction in the axis frame from Y/Z angles in degrees.
pub fn compose_offset(y_angle: f32, z_angle: f32) -> Vec3 {
    let (sin_y, cos_y) = y_angle.to_radians().sin_cos();
    let (sin_z, cos_z) = z_angle.to_radians().sin_cos();
    Vec3::new(cos_y * cos_z, sin_z, -sin_y * cos_z)
}

/// Clamp a frame-space direction by the per-axis limits.
///
/// Inactive limits leave the direction bit-identical; a non-finite
/// direction is returned unchanged (no correction applied).
pub fn clamp_direction(dir: Vec3, y_limits: &AngleLimit, z_limits: &AngleLimit) -> Vec3 {
    if !y_limits.active && !z_limits.active {
        return dir;
    }
    if !dir.is_finite() {
        return dir;
    }
    let (y_angle, z_angle) = decompose_offset(dir);
    compose_offset(y_limits.clamp(y_angle), z_limits.clamp(z_angle))
}

/// Push a tip out of every penetrated collider.
///
/// Colliders are applied in order, each against the already-corrected
/// position. Returns the corrected tip and whether any collider bound.
pub fn resolve_collisions(
    tip: Vec3,
    tip_radius: f32,
    colliders: &[ResolvedCollider],
) -> (Vec3, bool) {
    let mut corrected = tip;
    let mut any = false;
    for primitive in colliders {
        if let Some(hit) = primitive.penetration(corrected, tip_radius) {
            corrected += hit.correction();
            any = true;
        }
    }
    (corrected, any)
}

/// Pull a tip back within each length limit.
///
/// `limits` pairs a target's world position with the maximum allowed
/// tip-to-target distance. Exceeded limits move the tip onto the limit
/// sphere along the connecting line. Degenerate limits (non-positive
/// distance, tip coincident with the target) apply no correction.
pub fn apply_length_limits(tip: Vec3, limits: &[(Vec3, f32)]) -> (Vec3, bool) {
    let mut corrected = tip;
    let mut any = false;
    for &(target, max_distance) in limits {
        if !(max_distance > 0.0) {
            continue;
        }
        let offset = corrected - target;
        let distance = offset.length();
        if distance > max_distance && distance > f32::EPSILON {
            corrected = target + offset * (max_distance / distance);
            any = true;
        }
    }
    (corrected, any)
}

/// World rotation that carries the rest tip direction onto `final_dir`,
/// applied on top of the rest orientation.
///
/// Returns `None` when either direction is degenerate, in which case the
/// caller keeps the bone's current rotation.
pub fn rotation_toward(rest_rotation: Quat, rest_dir: Vec3, final_dir: Vec3) -> Option<Quat> {
    let rest_n = rest_dir.normalize_or_zero();
    let final_n = final_dir.normalize_or_zero();
    if rest_n == Vec3::ZERO || final_n == Vec3::ZERO {
        return None;
    }
    Some(Quat::from_rotation_arc(rest_n, final_n) * rest_rotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3, tolerance: f32) {
        assert!(
            (a - b).length() < tolerance,
            "expected {a:?} close to {b:?}"
        );
    }

    #[test]
    fn smoothing_factor_bounds() {
        assert_eq!(smoothing_factor(0.0, 0.016), 0.0);
        assert_eq!(smoothing_factor(10.0, 0.0), 0.0);
        assert_eq!(smoothing_factor(f32::NAN, 0.016), 0.0);
        let f = smoothing_factor(12.0, 1.0 / 60.0);
        assert!(f > 0.0 && f < 1.0);
    }

    #[test]
    fn smoothing_is_frame_rate_independent() {
        // Two half-steps land where one full step does.
        let current = Vec3::X;
        let target = Vec3::Y;
        let rate = 8.0;
        let dt = 1.0 / 30.0;

        let full = blend_direction(current, target, smoothing_factor(rate, dt));
        let half = smoothing_factor(rate, dt / 2.0);
        let stepped = blend_direction(blend_direction(current, target, half), target, half);

        assert_close(full, stepped, 1e-5);
    }

    #[test]
    fn blend_moves_strictly_toward_target() {
        let current = Vec3::X;
        let target = Vec3::new(0.0, 1.0, 0.0);
        let blended = blend_direction(current, target, 0.25);
        assert!(blended.angle_between(target) < current.angle_between(target));
        assert!((blended.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn blend_degenerate_returns_current() {
        assert_eq!(blend_direction(Vec3::X, Vec3::ZERO, 0.5), Vec3::X);
        assert_eq!(blend_direction(Vec3::ZERO, Vec3::Y, 0.5), Vec3::ZERO);
        assert_eq!(blend_direction(Vec3::X, Vec3::Y, f32::NAN), Vec3::X);
    }

    #[test]
    fn decompose_compose_roundtrip() {
        for (y, z) in [
            (0.0f32, 0.0f32),
            (45.0, 10.0),
            (-120.0, -45.0),
            (179.0, 89.0),
            (-179.0, -89.0),
        ] {
            let dir = compose_offset(y, z);
            let (y_out, z_out) = decompose_offset(dir);
            assert!((y - y_out).abs() < 1e-3, "y {y} -> {y_out}");
            assert!((z - z_out).abs() < 1e-3, "z {z} -> {z_out}");
        }
    }

    #[test]
    fn rest_direction_decomposes_to_zero() {
        let (y, z) = decompose_offset(Vec3::X);
        assert!(y.abs() < 1e-6);
        assert!(z.abs() < 1e-6);
    }

    #[test]
    fn clamp_direction_respects_bounds() {
        let y_limits = AngleLimit::new(-30.0, 30.0);
        let z_limits = AngleLimit::inactive();
        let dir = compose_offset(90.0, 0.0);
        let clamped = clamp_direction(dir, &y_limits, &z_limits);
        let (y, _) = decompose_offset(clamped);
        assert!((y - 30.0).abs() < 1e-3);
    }

    #[test]
    fn clamp_direction_inactive_is_identity() {
        let dir = compose_offset(150.0, -70.0);
        let clamped = clamp_direction(dir, &AngleLimit::inactive(), &AngleLimit::inactive());
        assert_eq!(clamped, dir);
    }

    #[test]
    fn clamp_direction_is_idempotent() {
        let y_limits = AngleLimit::new(-30.0, 30.0);
        let z_limits = AngleLimit::new(-15.0, 15.0);
        let dir = compose_offset(75.0, -40.0);
        let once = clamp_direction(dir, &y_limits, &z_limits);
        let twice = clamp_direction(once, &y_limits, &z_limits);
        assert_close(once, twice, 1e-5);
    }

    #[test]
    fn collision_resolution_separates_tip() {
        let colliders = [ResolvedCollider::Sphere {
            center: Vec3::ZERO,
            radius: 1.0,
        }];
        let (corrected, bound) = resolve_collisions(Vec3::new(0.5, 0.0, 0.0), 0.2, &colliders);
        assert!(bound);
        assert!(corrected.distance(Vec3::ZERO) >= 1.2 - 1e-5);

        let (untouched, bound) = resolve_collisions(Vec3::new(5.0, 0.0, 0.0), 0.2, &colliders);
        assert!(!bound);
        assert_eq!(untouched, Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn length_limit_pulls_tip_onto_sphere() {
        let limits = [(Vec3::ZERO, 2.0)];
        let (corrected, bound) = apply_length_limits(Vec3::new(4.0, 0.0, 0.0), &limits);
        assert!(bound);
        assert_close(corrected, Vec3::new(2.0, 0.0, 0.0), 1e-5);

        let (kept, bound) = apply_length_limits(Vec3::new(1.0, 0.0, 0.0), &limits);
        assert!(!bound);
        assert_eq!(kept, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn length_limit_degenerate_is_noop() {
        let (kept, bound) = apply_length_limits(Vec3::X, &[(Vec3::ZERO, 0.0)]);
        assert!(!bound);
        assert_eq!(kept, Vec3::X);

        // Tip coincident with the target: no direction to pull along.
        let (kept, bound) = apply_length_limits(Vec3::ZERO, &[(Vec3::ZERO, 1.0)]);
        assert!(!bound);
        assert_eq!(kept, Vec3::ZERO);
    }

    #[test]
    fn rotation_toward_points_axis_at_direction() {
        let rotation = rotation_toward(Quat::IDENTITY, Vec3::NEG_Y, Vec3::X)
            .expect("directions are well formed");
        assert_close(rotation * Vec3::NEG_Y, Vec3::X, 1e-5);
        assert!(rotation_toward(Quat::IDENTITY, Vec3::ZERO, Vec3::X).is_none());
    }
}
