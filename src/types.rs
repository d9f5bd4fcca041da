use glam::{Mat4, Quat, Vec3};
use slotmap::new_key_type;

use crate::error::{PhysicsError, Result};

new_key_type! {
    /// Generational entity handle. Ordered by slot, then generation; pairs are
    /// canonicalized as `(min, max)` using this order.
    pub struct Entity;
}

/// Bitmask-based filtering.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerMask {
    /// Layer(s) this collider belongs to.
    pub layer: u32,
    /// Layers this collider wants to interact with.
    pub collides_with: u32,
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl LayerMask {
    /// Member of every layer, interacts with every layer.
    pub const ALL: Self = Self { layer: u32::MAX, collides_with: u32::MAX };

    pub fn simple(layer: u32, collides_with: u32) -> Self {
        Self { layer, collides_with }
    }

    /// One-directional rule: `self` wants to hit `other`.
    pub fn allows(self, other: LayerMask) -> bool {
        (self.collides_with & other.layer) != 0
    }

    /// Both sides must consent for a pair to interact.
    pub fn mutual(self, other: LayerMask) -> bool {
        self.allows(other) && other.allows(self)
    }
}

/// Discriminant of [`ColliderShape`], used to index the narrow-phase table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Sphere = 0,
    Box = 1,
    Capsule = 2,
    Cylinder = 3,
}

impl ShapeType {
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Shape-local collider parameters. Capsules and cylinders are aligned with
/// the local +Y axis; `height` is the full length (caps included).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    Capsule { height: f32, radius: f32 },
    Cylinder { height: f32, radius: f32 },
}

impl ColliderShape {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            ColliderShape::Sphere { .. } => ShapeType::Sphere,
            ColliderShape::Box { .. } => ShapeType::Box,
            ColliderShape::Capsule { .. } => ShapeType::Capsule,
            ColliderShape::Cylinder { .. } => ShapeType::Cylinder,
        }
    }
}

/// Collider component. Read-only to the simulation.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset of the shape center in the entity's local space.
    pub offset: Vec3,
    pub mask: LayerMask,
    /// Triggers report events but are never resolved.
    pub is_trigger: bool,
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self { shape, offset: Vec3::ZERO, mask: LayerMask::ALL, is_trigger: false }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(ColliderShape::Sphere { radius })
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(ColliderShape::Box { half_extents })
    }

    pub fn capsule(height: f32, radius: f32) -> Self {
        Self::new(ColliderShape::Capsule { height, radius })
    }

    pub fn cylinder(height: f32, radius: f32) -> Self {
        Self::new(ColliderShape::Cylinder { height, radius })
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }
}

/// Local transform plus the cached world matrix.
///
/// `world` is refreshed by the world at the start of each tick for entities
/// flagged dirty and is not meant to be written by callers.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub parent: Option<Entity>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) world: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
        parent: None,
        world: Mat4::IDENTITY,
    };

    pub fn from_position(position: Vec3) -> Self {
        let mut t = Self::IDENTITY;
        t.position = position;
        t.world = t.local_matrix();
        t
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self.world = self.local_matrix();
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self.world = self.local_matrix();
        self
    }

    pub fn with_parent(mut self, parent: Entity) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// World matrix as of the last cache refresh.
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BodyType {
    /// Never moves; infinite mass.
    #[default]
    Static,
    /// Moved by gameplay code only; infinite mass to contacts.
    Kinematic,
    /// Moved by the simulation.
    Dynamic,
}

impl BodyType {
    /// Static and Kinematic bodies are never moved by contacts.
    pub fn is_fixed(self) -> bool {
        !matches!(self, BodyType::Dynamic)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rigidbody {
    pub body_type: BodyType,
    pub velocity: Vec3,
    pub mass: f32,
    /// Horizontal damping coefficient (per second).
    pub drag: f32,
    pub use_gravity: bool,
    /// Set by the solver when the body rests on something this tick.
    pub is_grounded: bool,
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            velocity: Vec3::ZERO,
            mass: 1.0,
            drag: 0.0,
            use_gravity: true,
            is_grounded: false,
        }
    }
}

impl Rigidbody {
    pub fn dynamic(mass: f32) -> Self {
        Self { body_type: BodyType::Dynamic, mass, ..Default::default() }
    }

    pub fn kinematic() -> Self {
        Self { body_type: BodyType::Kinematic, use_gravity: false, ..Default::default() }
    }

    pub fn fixed() -> Self {
        Self { body_type: BodyType::Static, use_gravity: false, ..Default::default() }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag;
        self
    }

    pub fn with_gravity(mut self, use_gravity: bool) -> Self {
        self.use_gravity = use_gravity;
        self
    }

    /// Inverse mass for contact resolution; fixed bodies have none.
    /// A non-positive mass on a dynamic body is treated as 1.
    pub fn inverse_mass(&self) -> f32 {
        if self.body_type.is_fixed() {
            0.0
        } else if self.mass > 0.0 {
            1.0 / self.mass
        } else {
            1.0
        }
    }
}

/// Narrow-phase result: normal points from the first shape toward the second.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Overlap {
    pub normal: Vec3,
    /// Penetration depth (≥ 0).
    pub depth: f32,
}

impl Overlap {
    pub fn flipped(self) -> Self {
        Self { normal: -self.normal, depth: self.depth }
    }
}

/// One touching pair for this tick. `a < b`; the normal points from `a` to `b`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Contact {
    pub a: Entity,
    pub b: Entity,
    pub normal: Vec3,
    pub depth: f32,
    pub is_trigger: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventState {
    Enter,
    Stay,
    Exit,
}

/// Collision event emitted once per touching (or just separated) pair per tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionEvent {
    pub a: Entity,
    pub b: Entity,
    pub state: EventState,
    /// Contact normal from `a` toward `b`; for `Exit`, the last one seen.
    pub normal: Vec3,
    pub is_trigger: bool,
}

impl CollisionEvent {
    pub fn involves(&self, e: Entity) -> bool {
        self.a == e || self.b == e
    }
}

/// Closest raycast hit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    /// Distance along the normalized ray direction.
    pub distance: f32,
    pub point: Vec3,
}

/// Optional raycast restrictions.
#[derive(Copy, Clone, Debug)]
pub struct RayFilter {
    /// The ray's own layers; colliders must mutually consent.
    pub mask: LayerMask,
    pub max_distance: f32,
    pub include_triggers: bool,
}

impl Default for RayFilter {
    fn default() -> Self {
        Self { mask: LayerMask::ALL, max_distance: f32::INFINITY, include_triggers: true }
    }
}

/// World-level configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorldConfig {
    /// Spatial hash cell size in world units; roughly the typical object size.
    pub cell_size: f32,
    /// Upper bound on the step length fed to the integrator.
    pub max_dt: f32,
    /// Vertical gravity acceleration (negative = down).
    pub gravity: f32,
    /// Dynamic bodies below this height are respawned.
    pub kill_floor_y: f32,
    pub respawn_point: Vec3,
    /// Extend dynamic AABBs backwards over the last step's motion.
    pub sweep_dynamic_aabbs: bool,
    /// Colliders spanning more cells than this bypass the grid.
    pub max_cells_per_collider: usize,
    /// Enable per-stage timing instrumentation.
    pub enable_timing: bool,
}

/// Standard gravity, m/s².
pub const GRAVITY: f32 = -9.81;

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cell_size: 4.0,
            max_dt: 0.05,
            gravity: GRAVITY,
            kill_floor_y: -100.0,
            respawn_point: Vec3::new(0.0, 10.0, 0.0),
            sweep_dynamic_aabbs: true,
            max_cells_per_collider: 4096,
            enable_timing: false,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(PhysicsError::InvalidConfig { field: "cell_size", reason: "must be finite and > 0" });
        }
        if !(self.max_dt.is_finite() && self.max_dt > 0.0) {
            return Err(PhysicsError::InvalidConfig { field: "max_dt", reason: "must be finite and > 0" });
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig { field: "gravity", reason: "must be finite" });
        }
        if !self.respawn_point.is_finite() {
            return Err(PhysicsError::InvalidConfig { field: "respawn_point", reason: "must be finite" });
        }
        if self.max_cells_per_collider == 0 {
            return Err(PhysicsError::InvalidConfig { field: "max_cells_per_collider", reason: "must be > 0" });
        }
        Ok(())
    }
}

/// Debug/performance statistics for the last tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub entities: usize,
    pub colliders: usize,
    pub cache_rebuilds: usize,
    pub cells: usize,
    /// Broad-phase candidates that survived filtering.
    pub candidate_pairs: usize,
    pub narrow_tests: usize,
    pub contacts: usize,
    pub solid_contacts: usize,
    pub events: usize,
    /// Pairs the event tracker remembers as touching.
    pub touching_pairs: usize,
    pub stages: usize,
}

/// Timing breakdown for the last tick, in milliseconds.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct WorldTiming {
    pub integrate_ms: f64,
    pub cache_ms: f64,
    pub broadphase_ms: f64,
    pub narrowphase_ms: f64,
    pub events_ms: f64,
    pub solve_ms: f64,
    pub total_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_mutual_consent() {
        let a = LayerMask::simple(1, 2);
        let b = LayerMask::simple(2, 0);
        assert!(a.allows(b));
        assert!(!b.allows(a));
        assert!(!a.mutual(b));
        assert!(LayerMask::simple(1, 2).mutual(LayerMask::simple(2, 1)));
    }

    #[test]
    fn test_inverse_mass() {
        assert_eq!(Rigidbody::fixed().inverse_mass(), 0.0);
        assert_eq!(Rigidbody::kinematic().inverse_mass(), 0.0);
        assert_eq!(Rigidbody::dynamic(4.0).inverse_mass(), 0.25);
        assert_eq!(Rigidbody::dynamic(0.0).inverse_mass(), 1.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(WorldConfig::default().validate().is_ok());
        let bad = WorldConfig { cell_size: 0.0, ..Default::default() };
        assert!(matches!(bad.validate(), Err(PhysicsError::InvalidConfig { field: "cell_size", .. })));
        let bad = WorldConfig { max_dt: f32::NAN, ..Default::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_shape_type_indices_are_dense() {
        let shapes = [
            ColliderShape::Sphere { radius: 1.0 },
            ColliderShape::Box { half_extents: Vec3::ONE },
            ColliderShape::Capsule { height: 2.0, radius: 0.5 },
            ColliderShape::Cylinder { height: 2.0, radius: 0.5 },
        ];
        for (i, s) in shapes.iter().enumerate() {
            assert_eq!(s.shape_type().index(), i);
        }
    }
}
