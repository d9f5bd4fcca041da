//! World-space collider cache.
//!
//! Entries are rebuilt only for entities whose transform or collider changed
//! (see the dirty set kept by [`crate::world::PhysicsWorld`]).

use glam::{Mat4, Vec3};
use slotmap::SecondaryMap;

use crate::geometry::{Aabb, EPSILON};
use crate::shapes::{Capsule, Cylinder, Obb, Sphere};
use crate::types::{BodyType, Collider, ColliderShape, Entity, LayerMask, ShapeType};

/// A collider resolved into world space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WorldShape {
    Sphere(Sphere),
    Obb(Obb),
    Capsule(Capsule),
    Cylinder(Cylinder),
}

impl WorldShape {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            WorldShape::Sphere(_) => ShapeType::Sphere,
            WorldShape::Obb(_) => ShapeType::Box,
            WorldShape::Capsule(_) => ShapeType::Capsule,
            WorldShape::Cylinder(_) => ShapeType::Cylinder,
        }
    }

    pub fn center(&self) -> Vec3 {
        match self {
            WorldShape::Sphere(s) => s.center,
            WorldShape::Obb(b) => b.center,
            WorldShape::Capsule(c) => c.center(),
            WorldShape::Cylinder(c) => c.center,
        }
    }

    /// Tight world AABB of the (unswept) shape.
    pub fn aabb(&self) -> Aabb {
        match self {
            WorldShape::Sphere(s) => Aabb::from_center_half_extents(s.center, Vec3::splat(s.radius)),
            WorldShape::Obb(b) => b.aabb(),
            WorldShape::Capsule(c) => c.aabb(),
            WorldShape::Cylinder(c) => c.aabb(),
        }
    }

    /// Resolves a local collider under `world` into world space.
    ///
    /// Round radii scale by the largest scale component; non-uniform scale on
    /// spheres, capsules and cylinders is approximated, not modeled.
    pub fn from_collider(world: &Mat4, collider: &Collider) -> Self {
        let (scale, rotation, _) = world.to_scale_rotation_translation();
        let scale = scale.abs();
        let center = world.transform_point3(collider.offset);
        let max_scale = scale.max_element();

        match collider.shape {
            ColliderShape::Sphere { radius } => WorldShape::Sphere(Sphere { center, radius: radius.abs() * max_scale }),
            ColliderShape::Box { half_extents } => WorldShape::Obb(Obb {
                center,
                half_extents: half_extents.abs() * scale,
                axes: [
                    (rotation * Vec3::X).normalize_or(Vec3::X),
                    (rotation * Vec3::Y).normalize_or(Vec3::Y),
                    (rotation * Vec3::Z).normalize_or(Vec3::Z),
                ],
            }),
            ColliderShape::Capsule { height, radius } => {
                let axis = (rotation * Vec3::Y).normalize_or(Vec3::Y);
                let radius = radius.abs() * max_scale;
                let half = (height.abs() * scale.y * 0.5 - radius).max(0.0);
                WorldShape::Capsule(Capsule { start: center - axis * half, end: center + axis * half, radius })
            }
            ColliderShape::Cylinder { height, radius } => WorldShape::Cylinder(Cylinder {
                center,
                axis: (rotation * Vec3::Y).normalize_or(Vec3::Y),
                half_height: height.abs() * scale.y * 0.5,
                radius: radius.abs() * max_scale,
            }),
        }
    }
}

/// Cached world-space collider for one entity.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WorldCollider {
    pub shape: WorldShape,
    /// Conservative bounds; swept backwards over the last step for dynamic bodies.
    pub aabb: Aabb,
    pub mask: LayerMask,
    pub is_trigger: bool,
    pub body_type: BodyType,
}

impl WorldCollider {
    /// `sweep` is the displacement to also cover (`-velocity * dt`), if any.
    pub fn build(world: &Mat4, collider: &Collider, body_type: BodyType, sweep: Option<Vec3>) -> Self {
        let shape = WorldShape::from_collider(world, collider);
        let mut aabb = shape.aabb();
        if let Some(delta) = sweep.filter(|d| d.length_squared() > EPSILON * EPSILON) {
            aabb = aabb.swept(delta);
        }
        Self { shape, aabb, mask: collider.mask, is_trigger: collider.is_trigger, body_type }
    }
}

/// Per-entity world collider storage.
#[derive(Default)]
pub struct ColliderCache {
    entries: SecondaryMap<Entity, WorldCollider>,
}

impl ColliderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity, collider: WorldCollider) {
        self.entries.insert(entity, collider);
    }

    pub fn remove(&mut self, entity: Entity) -> Option<WorldCollider> {
        self.entries.remove(entity)
    }

    pub fn get(&self, entity: Entity) -> Option<&WorldCollider> {
        self.entries.get(entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &WorldCollider)> + '_ {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn test_box_extents_follow_scale() {
        let world = Mat4::from_scale_rotation_translation(Vec3::new(2.0, 1.0, 3.0), Quat::IDENTITY, Vec3::ZERO);
        let c = Collider::cuboid(Vec3::splat(0.5));
        let WorldShape::Obb(b) = WorldShape::from_collider(&world, &c) else {
            panic!("expected obb");
        };
        assert!(approx(b.half_extents, Vec3::new(1.0, 0.5, 1.5)));
        assert!(approx(b.axes[0], Vec3::X));
    }

    #[test]
    fn test_rotated_box_aabb_grows() {
        let rot = Quat::from_rotation_z(std::f32::consts::FRAC_PI_4);
        let world = Mat4::from_rotation_translation(rot, Vec3::ZERO);
        let s = WorldShape::from_collider(&world, &Collider::cuboid(Vec3::ONE));
        let aabb = s.aabb();
        let expect = std::f32::consts::SQRT_2;
        assert!((aabb.max.x - expect).abs() < 1e-5);
        assert!((aabb.max.y - expect).abs() < 1e-5);
        assert!((aabb.max.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_uses_max_scale() {
        let world = Mat4::from_scale(Vec3::new(1.0, 3.0, 2.0));
        let s = WorldShape::from_collider(&world, &Collider::sphere(0.5));
        assert_eq!(s, WorldShape::Sphere(Sphere { center: Vec3::ZERO, radius: 1.5 }));
    }

    #[test]
    fn test_capsule_total_length_matches_height() {
        let world = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let s = WorldShape::from_collider(&world, &Collider::capsule(2.0, 0.5));
        let WorldShape::Capsule(c) = s else { panic!("expected capsule") };
        assert!(approx(c.start, Vec3::new(0.0, 4.5, 0.0)));
        assert!(approx(c.end, Vec3::new(0.0, 5.5, 0.0)));
        assert_eq!(c.radius, 0.5);
        let aabb = s.aabb();
        assert!((aabb.max.y - aabb.min.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_short_capsule_collapses_to_sphere() {
        let s = WorldShape::from_collider(&Mat4::IDENTITY, &Collider::capsule(0.5, 1.0));
        let WorldShape::Capsule(c) = s else { panic!("expected capsule") };
        assert_eq!(c.start, c.end);
    }

    #[test]
    fn test_cylinder_aabb_lying_on_side() {
        let world = Mat4::from_quat(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let s = WorldShape::from_collider(&world, &Collider::cylinder(4.0, 1.0));
        let aabb = s.aabb();
        assert!((aabb.max.x - 2.0).abs() < 1e-4);
        assert!((aabb.max.y - 1.0).abs() < 1e-4);
        assert!((aabb.max.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_offset_is_transformed() {
        let world = Mat4::from_rotation_translation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), Vec3::new(1.0, 0.0, 0.0));
        let c = Collider::sphere(1.0).with_offset(Vec3::new(0.0, 0.0, 1.0));
        assert!(approx(WorldShape::from_collider(&world, &c).center(), Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_dynamic_sweep_extends_backwards() {
        let c = Collider::sphere(0.5);
        let wc = WorldCollider::build(&Mat4::IDENTITY, &c, BodyType::Dynamic, Some(Vec3::new(0.0, 2.0, 0.0)));
        assert!((wc.aabb.max.y - 2.5).abs() < 1e-6);
        assert!((wc.aabb.min.y + 0.5).abs() < 1e-6);
    }
}
