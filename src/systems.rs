//! Core simulation systems.
//!
//! These exclusive systems implement the spring bone tick. They resolve
//! world-space poses by walking local `Transform`s up the `Parent` chain
//! rather than reading `GlobalTransform`: Bevy's own propagation runs after
//! the simulation schedule, and walking locals guarantees a child bone
//! reads its parent's already-updated rotation within the same tick.
//!
//! Transform scale is ignored throughout; bone hierarchies are expected to
//! be unscaled.

use bevy::log::warn_once;
use bevy::prelude::*;
use bevy::utils::HashMap;

use crate::collider::{CapsuleCollider, PanelCollider, SphereCollider};
use crate::config::SpringBone;
use crate::manager::{SpringBoneError, SpringManager};
use crate::solver::{self, ResolvedCollider};
use crate::state::SpringBoneState;
use crate::SpringBoneWind;

/// Tip offset assumed for a bone without children, in bone-local space.
const DEFAULT_TIP_OFFSET: Vec3 = Vec3::new(0.0, -0.1, 0.0);

/// World position and rotation of an entity, composed from local
/// `Transform`s up the `Parent` chain.
///
/// Returns `None` when the entity has no `Transform`. Ancestors without a
/// `Transform` terminate the walk, treating the last reachable node as the
/// root.
pub fn world_transform(world: &World, entity: Entity) -> Option<(Vec3, Quat)> {
    let transform = world.get::<Transform>(entity)?;
    let mut translation = transform.translation;
    let mut rotation = transform.rotation;

    let mut current = entity;
    while let Some(parent) = world.get::<Parent>(current) {
        let parent_entity = parent.get();
        let Some(parent_transform) = world.get::<Transform>(parent_entity) else {
            break;
        };
        translation = parent_transform.translation + parent_transform.rotation * translation;
        rotation = parent_transform.rotation * rotation;
        current = parent_entity;
    }
    Some((translation, rotation))
}

/// Capture rest-pose state for every spring bone that does not have one yet.
///
/// The tip is taken from the first child's local translation; a childless
/// bone falls back to a short downward offset. Length-limit distances are
/// captured as the tip-to-target distance in the rest pose.
pub fn initialize_spring_bones(world: &mut World) {
    let pending: Vec<Entity> = world
        .query_filtered::<Entity, (With<SpringBone>, Without<SpringBoneState>)>()
        .iter(world)
        .collect();

    for bone in pending {
        let Some(config) = world.get::<SpringBone>(bone).cloned() else {
            continue;
        };
        let Some((head, bone_rotation)) = world_transform(world, bone) else {
            warn_once!("spring bone {bone:?} has no Transform and cannot be initialized");
            continue;
        };
        let local_rotation = world
            .get::<Transform>(bone)
            .map(|t| t.rotation)
            .unwrap_or(Quat::IDENTITY);

        let local_tip = world
            .get::<Children>(bone)
            .and_then(|children| children.first().copied())
            .and_then(|child| world.get::<Transform>(child))
            .map(|t| t.translation)
            .unwrap_or(DEFAULT_TIP_OFFSET);
        let bone_length = local_tip.length();
        let bone_axis = local_tip.normalize_or_zero();
        let rest_tip = head + bone_rotation * local_tip;

        let pivot_rotation = resolve_pivot(world, bone, &config)
            .and_then(|pivot| world_transform(world, pivot))
            .map(|(_, rotation)| rotation)
            .unwrap_or(Quat::IDENTITY);

        let mut length_limits = Vec::with_capacity(config.length_limit_targets.len());
        for &target in &config.length_limit_targets {
            match world_transform(world, target) {
                Some((target_pos, _)) => {
                    length_limits.push((target, target_pos.distance(rest_tip)));
                }
                None => {
                    warn_once!(
                        "length limit target {target:?} of bone {bone:?} has no Transform; ignored"
                    );
                }
            }
        }

        let state = SpringBoneState::from_rest_pose(
            bone_axis,
            bone_length,
            local_rotation,
            head,
            rest_tip,
            pivot_rotation,
            length_limits,
        );
        world.entity_mut(bone).insert(state);
    }
}

/// Advance every manager by one simulation tick.
///
/// The timestep comes from `Time<Fixed>`, with a 1/60 fallback for testing
/// scenarios where the fixed clock has not advanced.
pub fn update_spring_bones(world: &mut World) {
    let dt = world
        .get_resource::<Time<Fixed>>()
        .map(|t| t.delta_secs())
        .filter(|&d| d > 0.0)
        .unwrap_or(1.0 / 60.0);

    let managers: Vec<Entity> = world
        .query_filtered::<Entity, With<SpringManager>>()
        .iter(world)
        .collect();
    for manager in managers {
        tick_manager(world, manager, dt);
    }
}

/// Advance one manager's bones by `dt` seconds, in stored order.
///
/// Deterministic given `dt` and the current bone/collider state. A
/// non-positive `dt` is a no-op.
pub fn tick_manager(world: &mut World, manager_entity: Entity, dt: f32) {
    if !(dt > 0.0) {
        return;
    }
    let Some(manager) = world.get::<SpringManager>(manager_entity).cloned() else {
        return;
    };
    let wind = world
        .get_resource::<SpringBoneWind>()
        .map(|w| w.0)
        .unwrap_or(Vec3::ZERO);
    let colliders = resolve_colliders(world, &manager);

    for &bone in manager.bones() {
        step_bone(world, bone, &manager, wind, &colliders, dt);
    }
}

/// Resolve the manager's collider entities into world-space primitives.
///
/// Dangling entities and missing components are skipped with a one-time
/// warning; degenerate radii fall out naturally in the penetration tests.
fn resolve_colliders(world: &World, manager: &SpringManager) -> Vec<ResolvedCollider> {
    let set = &manager.colliders;
    let mut resolved = Vec::with_capacity(set.len());

    for &entity in &set.spheres {
        match (
            world.get::<SphereCollider>(entity),
            world_transform(world, entity),
        ) {
            (Some(sphere), Some((center, _))) => resolved.push(ResolvedCollider::Sphere {
                center,
                radius: sphere.radius,
            }),
            _ => warn_once!("sphere collider {entity:?} is missing; ignored"),
        }
    }
    for &entity in &set.capsules {
        match (
            world.get::<CapsuleCollider>(entity),
            world_transform(world, entity),
        ) {
            (Some(capsule), Some((origin, rotation))) => {
                let axis = rotation * (Vec3::Y * capsule.half_length);
                resolved.push(ResolvedCollider::Capsule {
                    start: origin - axis,
                    end: origin + axis,
                    radius: capsule.radius,
                });
            }
            _ => warn_once!("capsule collider {entity:?} is missing; ignored"),
        }
    }
    for &entity in &set.panels {
        match (
            world.get::<PanelCollider>(entity),
            world_transform(world, entity),
        ) {
            (Some(panel), Some((origin, rotation))) => resolved.push(ResolvedCollider::Panel {
                origin,
                rotation,
                half_extents: panel.half_extents,
            }),
            _ => warn_once!("panel collider {entity:?} is missing; ignored"),
        }
    }
    resolved
}

/// The node a bone's angular offsets are measured against: the configured
/// pivot, or the hierarchy parent.
fn resolve_pivot(world: &World, bone: Entity, config: &SpringBone) -> Option<Entity> {
    config
        .pivot_node
        .or_else(|| world.get::<Parent>(bone).map(|p| p.get()))
}

/// One solver step for one bone: integrate, blend toward rest, clamp
/// angles, resolve collisions, enforce length limits, write the rotation.
fn step_bone(
    world: &mut World,
    bone: Entity,
    manager: &SpringManager,
    wind: Vec3,
    colliders: &[ResolvedCollider],
    dt: f32,
) {
    let Some(config) = world.get::<SpringBone>(bone).cloned() else {
        warn_once!("manager lists {bone:?} but it has no SpringBone; skipping");
        return;
    };
    if !config.enabled {
        return;
    }
    let Some(state) = world.get::<SpringBoneState>(bone).cloned() else {
        return;
    };
    if !state.is_valid() {
        return;
    }

    let Some(pivot) = resolve_pivot(world, bone, &config) else {
        warn_once!("spring bone {bone:?} has no pivot; skipping");
        return;
    };
    let Some((_, pivot_rotation)) = world_transform(world, pivot) else {
        warn_once!("pivot {pivot:?} of bone {bone:?} has no Transform; skipping");
        return;
    };
    let Some((head, _)) = world_transform(world, bone) else {
        return;
    };
    let parent_rotation = world
        .get::<Parent>(bone)
        .map(|p| p.get())
        .and_then(|parent| world_transform(world, parent))
        .map(|(_, rotation)| rotation)
        .unwrap_or(Quat::IDENTITY);

    let rest_rotation = parent_rotation * state.initial_local_rotation;
    let rest_dir = (pivot_rotation * state.rest_dir_pivot).normalize_or_zero();
    if rest_dir == Vec3::ZERO {
        return;
    }

    // Integrate external forces into the tip velocity, decay by drag.
    let external = manager.gravity * config.spring_force + wind * config.wind_influence;
    let mut velocity = state.tip_velocity + external * dt;
    velocity *= (-config.drag_force.max(0.0) * solver::DRAG_DECAY_RATE * dt).exp();

    // Advance the unconstrained tip and blend its direction toward rest.
    let advanced = state.sim_tip + velocity * dt;
    let mut current_dir = (advanced - head).normalize_or_zero();
    if current_dir == Vec3::ZERO {
        current_dir = rest_dir;
    }
    let factor =
        solver::smoothing_factor(config.angular_stiffness * config.stiffness_force, dt);
    let sim_dir = solver::blend_direction(current_dir, rest_dir, factor);
    let sim_tip = head + sim_dir * state.bone_length;
    let mut new_velocity = (sim_tip - state.sim_tip) / dt;

    // Aesthetic angle clamp, applied to the output only.
    let frame_dir = state.axis_frame * (pivot_rotation.inverse() * sim_dir);
    let clamped_frame =
        solver::clamp_direction(frame_dir, &config.y_angle_limits, &config.z_angle_limits);
    let clamped_dir = pivot_rotation * (state.axis_frame.inverse() * clamped_frame);
    let mut applied_tip = head + clamped_dir * state.bone_length;

    // Hard positional constraints: collisions first, then length limits.
    let (collided_tip, collision_bound) =
        solver::resolve_collisions(applied_tip, config.radius, colliders);
    applied_tip = collided_tip;

    let limit_targets: Vec<(Vec3, f32)> = state
        .length_limits
        .iter()
        .filter_map(|&(target, distance)| {
            world_transform(world, target).map(|(position, _)| (position, distance))
        })
        .collect();
    let (limited_tip, length_bound) = solver::apply_length_limits(applied_tip, &limit_targets);
    applied_tip = limited_tip;

    // Hard constraints feed back into the simulated state; cancel the
    // velocity component driving into the constraint.
    let mut sim_tip_out = sim_tip;
    if collision_bound || length_bound {
        let correction = applied_tip - sim_tip;
        sim_tip_out = applied_tip;
        if let Some(normal) = correction.try_normalize() {
            let into = new_velocity.dot(-normal);
            if into > 0.0 {
                new_velocity += normal * into;
            }
        }
    }

    // Re-derive and write the bone's local rotation from the final tip.
    let rest_tip_dir = rest_rotation * state.bone_axis;
    if let Some(world_rotation) =
        solver::rotation_toward(rest_rotation, rest_tip_dir, applied_tip - head)
    {
        if let Some(mut transform) = world.get_mut::<Transform>(bone) {
            transform.rotation = parent_rotation.inverse() * world_rotation;
        }
    }

    if let Some(mut state) = world.get_mut::<SpringBoneState>(bone) {
        state.sim_tip = sim_tip_out;
        state.tip_velocity = new_velocity;
        state.current_tip_position = applied_tip;
    }
}

/// Discover every [`SpringBone`] below a manager and assign them in
/// hierarchy order.
///
/// Depth-first traversal yields parent-before-child order by construction;
/// the list still goes through [`SpringManager::assign_bones`] so the
/// invariant is validated in one place. Returns the number of bones
/// assigned.
pub fn find_and_assign_spring_bones(
    world: &mut World,
    manager_entity: Entity,
) -> Result<usize, SpringBoneError> {
    let mut parents = HashMap::new();
    let mut bones = Vec::new();
    collect_spring_bones(world, manager_entity, &mut parents, &mut bones);

    let count = bones.len();
    if let Some(mut manager) = world.get_mut::<SpringManager>(manager_entity) {
        manager.assign_bones(bones, |entity| parents.get(&entity).copied())?;
    }
    Ok(count)
}

fn collect_spring_bones(
    world: &World,
    root: Entity,
    parents: &mut HashMap<Entity, Entity>,
    bones: &mut Vec<Entity>,
) {
    let Some(children) = world.get::<Children>(root) else {
        return;
    };
    let children: Vec<Entity> = children.iter().copied().collect();
    for child in children {
        parents.insert(child, root);
        if world.get::<SpringBone>(child).is_some() {
            bones.push(child);
        }
        collect_spring_bones(world, child, parents, bones);
    }
}
