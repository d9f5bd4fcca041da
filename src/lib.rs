//! bonk3d: 3D collision detection and rigid-body resolution core.
//!
//! A [`PhysicsWorld`] owns entities carrying a [`Transform`], an optional
//! [`Collider`] and an optional [`Rigidbody`]. Each tick integrates dynamic
//! bodies, refreshes the world-space collider cache, bins colliders into a
//! spatial hash, runs the narrow phase, emits Enter/Stay/Exit events and
//! resolves solid contacts.

pub mod api;
pub mod broadphase;
pub mod cache;
pub mod error;
pub mod events;
pub mod geometry;
pub mod integrator;
pub mod narrowphase;
pub mod raycast;
pub mod schedule;
pub mod shapes;
pub mod solver;
pub mod time;
pub mod types;
pub mod world;

pub use crate::api::*;
pub use crate::error::{PhysicsError, Result};
pub use crate::geometry::Aabb;
pub use crate::narrowphase::Narrowphase;
pub use crate::shapes::{Capsule, Cylinder, Obb, Sphere};
pub use crate::time::TimeSource;
pub use crate::types::*;
pub use crate::world::PhysicsWorld;
