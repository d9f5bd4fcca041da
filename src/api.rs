use glam::Vec3;

use crate::error::Result;
use crate::shapes::{Capsule, Cylinder, Obb, Sphere};
use crate::types::*;

/// Public API contract for the physics world.
pub trait PhysicsWorldApi {
    // --- Component store ---------------------------------------------------

    /// Create an entity with the given transform.
    fn spawn(&mut self, transform: Transform) -> Entity;

    /// Destroy an entity; its pairs report `Exit` on the next tick.
    fn despawn(&mut self, entity: Entity) -> bool;

    /// Liveness predicate for handles.
    fn contains(&self, entity: Entity) -> bool;

    fn set_transform(&mut self, entity: Entity, transform: Transform) -> Result<()>;
    fn set_collider(&mut self, entity: Entity, collider: Collider) -> Result<()>;
    fn remove_collider(&mut self, entity: Entity) -> Option<Collider>;
    fn set_rigidbody(&mut self, entity: Entity, body: Rigidbody) -> Result<()>;
    fn remove_rigidbody(&mut self, entity: Entity) -> Option<Rigidbody>;

    fn transform(&self, entity: Entity) -> Option<&Transform>;
    fn collider(&self, entity: Entity) -> Option<&Collider>;
    fn rigidbody(&self, entity: Entity) -> Option<&Rigidbody>;

    // --- Simulation --------------------------------------------------------

    /// Run one tick with an explicit step length (clamped to `max_dt`).
    fn step(&mut self, dt: f32);

    /// Read the time source once and run one tick with the resulting step.
    fn advance(&mut self, real_elapsed: f32) -> f32;

    /// Events emitted by the last tick, in emission order.
    fn events(&self) -> &[CollisionEvent];

    /// Take the events emitted by the last tick.
    fn drain_events(&mut self) -> Vec<CollisionEvent>;

    /// Clear simulation state that persists across ticks (scene reload).
    fn reset(&mut self);

    // --- Queries -----------------------------------------------------------

    /// Closest collider hit by the ray, if any.
    fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<RayHit>;

    /// `raycast` with a layer mask, distance cap and trigger exclusion.
    fn raycast_filtered(&self, origin: Vec3, direction: Vec3, filter: &RayFilter) -> Option<RayHit>;

    /// Colliders whose cached bounds overlap the box (broad phase only).
    fn query_aabb(&self, min: Vec3, max: Vec3) -> Vec<Entity>;

    /// Current contact between two entities, if their colliders touch.
    fn overlap_pair(&self, a: Entity, b: Entity) -> Option<Overlap>;
}

/// Pairwise shape intersection tests.
///
/// Every test returns the normal pointing from the first argument toward the
/// second. Callers that swap arguments must negate the normal.
pub trait NarrowphaseApi {
    fn sphere_sphere(a: &Sphere, b: &Sphere) -> Option<Overlap>;
    fn sphere_obb(a: &Sphere, b: &Obb) -> Option<Overlap>;
    fn sphere_capsule(a: &Sphere, b: &Capsule) -> Option<Overlap>;
    fn sphere_cylinder(a: &Sphere, b: &Cylinder) -> Option<Overlap>;
    fn obb_obb(a: &Obb, b: &Obb) -> Option<Overlap>;
    fn obb_capsule(a: &Obb, b: &Capsule) -> Option<Overlap>;
    fn obb_cylinder(a: &Obb, b: &Cylinder) -> Option<Overlap>;
    fn capsule_capsule(a: &Capsule, b: &Capsule) -> Option<Overlap>;
    fn capsule_cylinder(a: &Capsule, b: &Cylinder) -> Option<Overlap>;
    fn cylinder_cylinder(a: &Cylinder, b: &Cylinder) -> Option<Overlap>;
}

/// Ray-vs-primitive tests. `dir` must be unit length; the result is the
/// smallest non-negative distance at which the ray crosses the surface.
pub trait RaycastApi {
    fn ray_sphere(origin: Vec3, dir: Vec3, s: &Sphere) -> Option<f32>;
    fn ray_obb(origin: Vec3, dir: Vec3, b: &Obb) -> Option<f32>;
    fn ray_capsule(origin: Vec3, dir: Vec3, c: &Capsule) -> Option<f32>;
    fn ray_cylinder(origin: Vec3, dir: Vec3, c: &Cylinder) -> Option<f32>;
}
