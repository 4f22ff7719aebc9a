//! Manager component and bone-list ownership.
//!
//! A [`SpringManager`] owns an ordered list of bone entities plus the
//! collider set shared by all of them, and supplies the gravity vector the
//! per-bone `spring_force` scales. The list order is load-bearing: the tick
//! walks it front to back and a child bone must come after every ancestor
//! so it reads same-tick parent transforms. [`SpringManager::assign_bones`]
//! validates that instead of silently reordering.

use bevy::prelude::*;
use std::fmt;

/// Errors raised when assigning a bone list to a manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpringBoneError {
    /// The same bone appears twice in the list.
    DuplicateBone(Entity),
    /// A bone is listed before one of its ancestors.
    OutOfOrder {
        /// The offending bone.
        bone: Entity,
        /// The ancestor that appears after it.
        ancestor: Entity,
    },
}

impl fmt::Display for SpringBoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpringBoneError::DuplicateBone(bone) => {
                write!(f, "bone {bone:?} appears more than once")
            }
            SpringBoneError::OutOfOrder { bone, ancestor } => {
                write!(
                    f,
                    "bone {bone:?} is listed before its ancestor {ancestor:?}"
                )
            }
        }
    }
}

impl std::error::Error for SpringBoneError {}

/// Collision primitives shared read-only by every bone of one manager.
#[derive(Reflect, Debug, Clone, Default)]
pub struct SpringColliderSet {
    /// Entities carrying a [`SphereCollider`](crate::collider::SphereCollider).
    pub spheres: Vec<Entity>,
    /// Entities carrying a [`CapsuleCollider`](crate::collider::CapsuleCollider).
    pub capsules: Vec<Entity>,
    /// Entities carrying a [`PanelCollider`](crate::collider::PanelCollider).
    pub panels: Vec<Entity>,
}

impl SpringColliderSet {
    /// Total number of registered collider entities.
    pub fn len(&self) -> usize {
        self.spheres.len() + self.capsules.len() + self.panels.len()
    }

    /// Whether no colliders are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns an ordered collection of spring bones and drives the solver over
/// them once per simulation tick.
///
/// Bones are stored parent-before-child; see
/// [`find_and_assign_spring_bones`](crate::systems::find_and_assign_spring_bones)
/// for a setup step that produces that order by construction.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct SpringManager {
    /// Ordered bone entities. Private so the order invariant can only be
    /// established through [`assign_bones`](Self::assign_bones).
    bones: Vec<Entity>,
    /// Colliders tested against every bone tip.
    pub colliders: SpringColliderSet,
    /// Gravity acceleration scaled by each bone's `spring_force`.
    pub gravity: Vec3,
}

impl Default for SpringManager {
    fn default() -> Self {
        Self {
            bones: Vec::new(),
            colliders: SpringColliderSet::default(),
            gravity: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

impl SpringManager {
    /// Create a manager with default gravity and no bones.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the gravity vector.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set the shared collider set.
    pub fn with_colliders(mut self, colliders: SpringColliderSet) -> Self {
        self.colliders = colliders;
        self
    }

    /// The owned bones in tick order.
    pub fn bones(&self) -> &[Entity] {
        &self.bones
    }

    /// Number of owned bones.
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Drop all owned bones.
    pub fn clear_bones(&mut self) {
        self.bones.clear();
    }

    /// Replace the owned bone list wholesale.
    ///
    /// `parent_of` resolves an entity's hierarchy parent. The list is
    /// rejected (and the manager left unchanged) when it contains a
    /// duplicate or lists a bone before one of its ancestors; the solver
    /// relies on parent-before-child order without re-validating it.
    pub fn assign_bones(
        &mut self,
        bones: Vec<Entity>,
        parent_of: impl Fn(Entity) -> Option<Entity>,
    ) -> Result<(), SpringBoneError> {
        for (index, &bone) in bones.iter().enumerate() {
            if bones[..index].contains(&bone) {
                return Err(SpringBoneError::DuplicateBone(bone));
            }

            let mut ancestor = parent_of(bone);
            while let Some(node) = ancestor {
                if let Some(position) = bones.iter().position(|&b| b == node) {
                    if position > index {
                        return Err(SpringBoneError::OutOfOrder {
                            bone,
                            ancestor: node,
                        });
                    }
                }
                ancestor = parent_of(node);
            }
        }

        self.bones = bones;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::utils::HashMap;

    fn hierarchy(edges: &[(u32, u32)]) -> impl Fn(Entity) -> Option<Entity> + '_ {
        let parents: HashMap<Entity, Entity> = edges
            .iter()
            .map(|&(child, parent)| (Entity::from_raw(child), Entity::from_raw(parent)))
            .collect();
        move |entity| parents.get(&entity).copied()
    }

    #[test]
    fn accepts_parent_before_child() {
        // 1 -> 2 -> 3 chain.
        let parent_of = hierarchy(&[(2, 1), (3, 2)]);
        let bones = vec![
            Entity::from_raw(1),
            Entity::from_raw(2),
            Entity::from_raw(3),
        ];

        let mut manager = SpringManager::new();
        assert!(manager.assign_bones(bones, parent_of).is_ok());
        assert_eq!(manager.bone_count(), 3);
    }

    #[test]
    fn rejects_child_before_parent() {
        let parent_of = hierarchy(&[(2, 1), (3, 2)]);
        let bones = vec![
            Entity::from_raw(1),
            Entity::from_raw(3),
            Entity::from_raw(2),
        ];

        let mut manager = SpringManager::new();
        let err = manager.assign_bones(bones, parent_of).unwrap_err();
        assert_eq!(
            err,
            SpringBoneError::OutOfOrder {
                bone: Entity::from_raw(3),
                ancestor: Entity::from_raw(2),
            }
        );
        // The manager is left unchanged.
        assert_eq!(manager.bone_count(), 0);
    }

    #[test]
    fn rejects_indirect_ancestor_violation() {
        // 3's grandparent 1 is listed after it.
        let parent_of = hierarchy(&[(2, 1), (3, 2)]);
        let bones = vec![Entity::from_raw(3), Entity::from_raw(1)];

        let mut manager = SpringManager::new();
        assert!(matches!(
            manager.assign_bones(bones, parent_of),
            Err(SpringBoneError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn rejects_duplicates() {
        let parent_of = hierarchy(&[]);
        let bones = vec![Entity::from_raw(1), Entity::from_raw(1)];

        let mut manager = SpringManager::new();
        assert_eq!(
            manager.assign_bones(bones, parent_of),
            Err(SpringBoneError::DuplicateBone(Entity::from_raw(1)))
        );
    }

    #[test]
    fn unrelated_bones_in_any_order() {
        // Siblings under an unlisted root can appear in either order.
        let parent_of = hierarchy(&[(2, 1), (3, 1)]);
        let bones = vec![Entity::from_raw(3), Entity::from_raw(2)];

        let mut manager = SpringManager::new();
        assert!(manager.assign_bones(bones, parent_of).is_ok());
    }

    #[test]
    fn assignment_replaces_wholesale() {
        let parent_of = hierarchy(&[]);
        let mut manager = SpringManager::new();
        manager
            .assign_bones(vec![Entity::from_raw(1)], &parent_of)
            .unwrap();
        manager
            .assign_bones(vec![Entity::from_raw(2)], &parent_of)
            .unwrap();
        assert_eq!(manager.bones(), &[Entity::from_raw(2)]);
    }

    #[test]
    fn collider_set_len() {
        let mut set = SpringColliderSet::default();
        assert!(set.is_empty());
        set.spheres.push(Entity::from_raw(1));
        set.panels.push(Entity::from_raw(2));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn error_messages_name_the_entities() {
        let message = SpringBoneError::DuplicateBone(Entity::from_raw(7)).to_string();
        assert!(message.contains("more than once"));
    }
}
