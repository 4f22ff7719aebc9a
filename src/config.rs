//! Bone configuration components.
//!
//! This module defines the authored configuration for spring bones: per-axis
//! angle limits, force coefficients, the pivot reference, length-limit
//! targets, and the tip collision radius.

use bevy::prelude::*;

/// A single-axis clamped angular range.
///
/// Angles are in degrees. The recommended (but not enforced) invariant is
/// `-180 <= min <= 0 <= max <= 180`.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct AngleLimit {
    /// Whether the clamp is enforced.
    pub active: bool,
    /// Lower bound in degrees.
    pub min: f32,
    /// Upper bound in degrees.
    pub max: f32,
}

impl Default for AngleLimit {
    fn default() -> Self {
        Self {
            active: false,
            min: -60.0,
            max: 60.0,
        }
    }
}

impl AngleLimit {
    /// Create an active limit with the given bounds (degrees).
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            active: true,
            min,
            max,
        }
    }

    /// Create an inactive limit.
    pub fn inactive() -> Self {
        Self {
            active: false,
            ..default()
        }
    }

    /// Clamp an angle (degrees) to this limit.
    ///
    /// Returns the angle unchanged when the limit is inactive.
    pub fn clamp(&self, angle_degrees: f32) -> f32 {
        if !self.active {
            return angle_degrees;
        }
        angle_degrees.clamp(self.min, self.max)
    }

    /// Swap and negate both bounds: `(min, max) = (-max, -min)`.
    pub fn invert(&mut self) {
        let old_min = self.min;
        self.min = -self.max;
        self.max = -old_min;
    }

    /// Mirror the lower bound onto the upper: `max = -min`.
    pub fn uniform_lower(&mut self) {
        self.max = -self.min;
    }

    /// Mirror the upper bound onto the lower: `min = -max`.
    pub fn uniform_upper(&mut self) {
        self.min = -self.max;
    }
}

/// Per-bone spring configuration component.
///
/// Attach this to a transform node that should receive secondary motion.
/// The bone rotates around its hierarchy parent; its tip (toward the first
/// child, captured at initialization) is the point driven by spring, drag,
/// gravity, and wind, and the point tested against colliders and length
/// limits.
///
/// Force coefficients are expected to be `>= 0`; defaults are tuned for
/// hair-like motion at world scale (meters).
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct SpringBone {
    /// Whether this bone is simulated. A disabled bone keeps its place in
    /// the manager's order but is skipped by the tick.
    pub enabled: bool,

    // === Forces ===
    /// Strength of the pull back toward the rest pose.
    pub stiffness_force: f32,
    /// Air resistance in `[0, 1]`. Higher values bleed off tip velocity
    /// faster.
    pub drag_force: f32,
    /// Scale applied to the manager's gravity vector for this bone.
    pub spring_force: f32,
    /// Scale applied to the global wind vector for this bone.
    pub wind_influence: f32,

    // === Angle limits ===
    /// Convergence rate multiplier for the stiffness blend.
    pub angular_stiffness: f32,
    /// Clamp on the Y-axis angular offset from the rest pose.
    pub y_angle_limits: AngleLimit,
    /// Clamp on the Z-axis angular offset from the rest pose.
    pub z_angle_limits: AngleLimit,

    // === References ===
    /// The anchor the bone's angular offsets are measured against.
    /// `None` means the bone's hierarchy parent.
    pub pivot_node: Option<Entity>,
    /// Each target constrains the tip to stay within the tip-to-target
    /// distance captured at initialization.
    pub length_limit_targets: Vec<Entity>,

    // === Collision ===
    /// Collision radius of the bone tip.
    pub radius: f32,
}

impl Default for SpringBone {
    fn default() -> Self {
        Self {
            enabled: true,
            stiffness_force: 1.0,
            drag_force: 0.4,
            spring_force: 1.0,
            wind_influence: 1.0,
            angular_stiffness: 12.0,
            y_angle_limits: AngleLimit::inactive(),
            z_angle_limits: AngleLimit::inactive(),
            pivot_node: None,
            length_limit_targets: Vec::new(),
            radius: 0.05,
        }
    }
}

impl SpringBone {
    /// Create a bone with default tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config for soft, swingy motion (long hair, ribbons).
    pub fn soft() -> Self {
        Self {
            stiffness_force: 0.5,
            drag_force: 0.2,
            ..default()
        }
    }

    /// Create a config for stiff motion (short hair, antennae).
    pub fn stiff() -> Self {
        Self {
            stiffness_force: 2.0,
            drag_force: 0.6,
            ..default()
        }
    }

    /// Builder: set the stiffness force.
    pub fn with_stiffness(mut self, stiffness: f32) -> Self {
        self.stiffness_force = stiffness;
        self
    }

    /// Builder: set the drag force.
    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag_force = drag;
        self
    }

    /// Builder: set the gravity scale.
    pub fn with_spring_force(mut self, spring_force: f32) -> Self {
        self.spring_force = spring_force;
        self
    }

    /// Builder: set the wind influence.
    pub fn with_wind_influence(mut self, influence: f32) -> Self {
        self.wind_influence = influence;
        self
    }

    /// Builder: set the angular stiffness (convergence rate multiplier).
    pub fn with_angular_stiffness(mut self, angular_stiffness: f32) -> Self {
        self.angular_stiffness = angular_stiffness;
        self
    }

    /// Builder: set the Y-axis angle limits.
    pub fn with_y_limits(mut self, limits: AngleLimit) -> Self {
        self.y_angle_limits = limits;
        self
    }

    /// Builder: set the Z-axis angle limits.
    pub fn with_z_limits(mut self, limits: AngleLimit) -> Self {
        self.z_angle_limits = limits;
        self
    }

    /// Builder: set an explicit pivot node.
    pub fn with_pivot(mut self, pivot: Entity) -> Self {
        self.pivot_node = Some(pivot);
        self
    }

    /// Builder: set the length-limit targets.
    pub fn with_length_limit_targets(mut self, targets: Vec<Entity>) -> Self {
        self.length_limit_targets = targets;
        self
    }

    /// Builder: set the tip collision radius.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }
}
