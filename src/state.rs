//! Runtime simulation state.
//!
//! [`SpringBoneState`] is attached automatically next to every
//! [`SpringBone`](crate::config::SpringBone) by the initialization system.
//! It captures the rest pose of the bone and carries the simulated tip
//! between ticks. Authored configuration lives in
//! [`config`](crate::config); nothing in here is meant to be edited by
//! hand.

use bevy::prelude::*;

/// Per-bone runtime state, derived at initialization and advanced each tick.
#[derive(Component, Debug, Clone)]
pub struct SpringBoneState {
    /// Unit vector from the bone toward its tip, in the bone's local space.
    /// Captured from the first child's translation at initialization.
    pub bone_axis: Vec3,
    /// Distance from the bone to its tip.
    pub bone_length: f32,
    /// The bone's local rotation at initialization (the rest pose).
    pub initial_local_rotation: Quat,
    /// Rest tip direction expressed in pivot space at initialization.
    pub rest_dir_pivot: Vec3,
    /// Rotation mapping `rest_dir_pivot` onto +X, the frame in which Y/Z
    /// angular offsets are decomposed.
    pub axis_frame: Quat,

    /// Unconstrained simulated tip position (world space). Angle limits do
    /// not write back into this; collision and length corrections do.
    pub sim_tip: Vec3,
    /// Tip velocity (world units per second).
    pub tip_velocity: Vec3,
    /// Tip position after all constraints, republished every tick.
    pub current_tip_position: Vec3,

    /// Length-limit targets with the tip-to-target distance captured at
    /// initialization.
    pub length_limits: Vec<(Entity, f32)>,
}

impl SpringBoneState {
    /// Capture a rest pose.
    ///
    /// `rest_tip` is the tip's world position at capture time; `pivot_rot`
    /// the pivot node's world rotation; `head` the bone's world position.
    pub fn from_rest_pose(
        bone_axis: Vec3,
        bone_length: f32,
        initial_local_rotation: Quat,
        head: Vec3,
        rest_tip: Vec3,
        pivot_rot: Quat,
        length_limits: Vec<(Entity, f32)>,
    ) -> Self {
        let rest_dir_world = (rest_tip - head).normalize_or_zero();
        let rest_dir_pivot = pivot_rot.inverse() * rest_dir_world;
        Self {
            bone_axis,
            bone_length,
            initial_local_rotation,
            rest_dir_pivot,
            axis_frame: Quat::from_rotation_arc(rest_dir_pivot, Vec3::X),
            sim_tip: rest_tip,
            tip_velocity: Vec3::ZERO,
            current_tip_position: rest_tip,
            length_limits,
        }
    }

    /// Drop all accumulated motion and snap the simulated tip back to the
    /// given rest position. Used when a hierarchy is re-posed or teleported.
    pub fn reset(&mut self, rest_tip: Vec3) {
        self.sim_tip = rest_tip;
        self.tip_velocity = Vec3::ZERO;
        self.current_tip_position = rest_tip;
    }

    /// Whether the captured pose is usable for simulation.
    ///
    /// A zero-length bone or a degenerate rest direction cannot produce a
    /// rotation and is skipped by the solver.
    pub fn is_valid(&self) -> bool {
        self.bone_length > f32::EPSILON
            && self.rest_dir_pivot.length_squared() > f32::EPSILON
            && self.bone_axis.length_squared() > f32::EPSILON
    }
}
