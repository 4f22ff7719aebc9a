//! # `bevy_spring_bone`
//!
//! Spring bone secondary animation for Bevy: hair, tails, skirts, antennae.
//!
//! This crate simulates chains of "spring bones": transform nodes whose
//! rotation lags behind their parent under spring, drag, gravity, and wind
//! forces, with per-axis angle limits, analytic collision against spheres,
//! capsules, and panels, and length limits toward external targets.
//!
//! ## Architecture
//!
//! 1. A [`SpringManager`](manager::SpringManager) owns an ordered bone list
//!    (parent before child) and the collider set shared by all of them
//! 2. Each bone carries an authored [`SpringBone`](config::SpringBone)
//!    config and a derived [`SpringBoneState`](state::SpringBoneState)
//! 3. Every `FixedUpdate`, the solver advances each bone's tip, clamps its
//!    Y/Z angular offsets, pushes it out of colliders, enforces length
//!    limits, and writes the resulting local rotation back to `Transform`
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use bevy_spring_bone::prelude::*;
//!
//! // Authored configuration for a hair strand bone.
//! let bone = SpringBone::soft()
//!     .with_y_limits(AngleLimit::new(-45.0, 45.0))
//!     .with_radius(0.03);
//!
//! // One manager per simulated character.
//! let manager = SpringManager::new().with_gravity(Vec3::new(0.0, -9.81, 0.0));
//! ```

use bevy::prelude::*;

pub mod collider;
pub mod config;
pub mod manager;
pub mod solver;
pub mod state;
pub mod systems;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::collider::{CapsuleCollider, PanelCollider, Penetration, SphereCollider};
    pub use crate::config::{AngleLimit, SpringBone};
    pub use crate::manager::{SpringBoneError, SpringColliderSet, SpringManager};
    pub use crate::state::SpringBoneState;
    pub use crate::systems::find_and_assign_spring_bones;
    pub use crate::{SpringBonePlugin, SpringBoneWind};
}

/// Global wind acceleration, scaled per bone by its `wind_influence`.
#[derive(Resource, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Resource)]
pub struct SpringBoneWind(pub Vec3);

/// Main plugin for the spring bone system.
///
/// Registers the reflected types and schedules initialization and the
/// solver tick in `FixedUpdate`, in that order.
///
/// # Examples
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_spring_bone::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(SpringBonePlugin)
///     .run();
/// ```
#[derive(Default)]
pub struct SpringBonePlugin;

impl Plugin for SpringBonePlugin {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::AngleLimit>();
        app.register_type::<config::SpringBone>();
        app.register_type::<manager::SpringManager>();
        app.register_type::<collider::SphereCollider>();
        app.register_type::<collider::CapsuleCollider>();
        app.register_type::<collider::PanelCollider>();
        app.register_type::<SpringBoneWind>();

        app.init_resource::<SpringBoneWind>();

        // Rest-pose capture must see bones before the first solver tick.
        app.add_systems(
            FixedUpdate,
            (
                systems::initialize_spring_bones,
                systems::update_spring_bones,
            )
                .chain(),
        );
    }
}
