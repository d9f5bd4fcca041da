use bonk3d::broadphase::SpatialHash;
use bonk3d::cache::WorldShape;
use bonk3d::narrowphase::collide;
use bonk3d::*;
use glam::{Mat4, Quat, Vec3};
use proptest::prelude::*;
use slotmap::SlotMap;

fn vec3(range: std::ops::Range<f32>) -> impl Strategy<Value = Vec3> {
    (range.clone(), range.clone(), range).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn rotation() -> impl Strategy<Value = Quat> {
    (vec3(-1.0..1.0), -3.1f32..3.1).prop_map(|(axis, angle)| Quat::from_axis_angle(axis.normalize_or(Vec3::Y), angle))
}

fn collider() -> impl Strategy<Value = Collider> {
    (0u8..4, 0.2f32..2.0, 0.2f32..2.0, vec3(0.2..1.5)).prop_map(|(kind, a, b, he)| match kind {
        0 => Collider::sphere(a),
        1 => Collider::cuboid(he),
        2 => Collider::capsule(a + b, b.min(1.0)),
        _ => Collider::cylinder(a, b),
    })
}

fn placed() -> impl Strategy<Value = (Collider, Vec3, Quat)> {
    (collider(), vec3(-3.0..3.0), rotation())
}

fn world_shape((c, p, r): &(Collider, Vec3, Quat)) -> WorldShape {
    WorldShape::from_collider(&Mat4::from_rotation_translation(*r, *p), c)
}

/// Pairs whose test only reports true intersections, so their bounds must meet.
fn is_exact(a: &WorldShape, b: &WorldShape) -> bool {
    let round = |s: &WorldShape| matches!(s, WorldShape::Capsule(_) | WorldShape::Cylinder(_));
    let boxy = |s: &WorldShape| matches!(s, WorldShape::Obb(_));
    let both_cylinders = matches!((a, b), (WorldShape::Cylinder(_), WorldShape::Cylinder(_)));
    !(both_cylinders || (boxy(a) && round(b)) || (round(a) && boxy(b)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn swapping_arguments_negates_normal(a in placed(), b in placed()) {
        let (sa, sb) = (world_shape(&a), world_shape(&b));
        let ab = collide(&sa, &sb);
        let ba = collide(&sb, &sa);
        prop_assert_eq!(ab.is_some(), ba.is_some());
        if let (Some(ab), Some(ba)) = (ab, ba) {
            prop_assert!((ab.depth - ba.depth).abs() < 1e-3, "depth {} vs {}", ab.depth, ba.depth);
            prop_assert!(ab.normal.abs_diff_eq(-ba.normal, 1e-2), "normal {:?} vs {:?}", ab.normal, ba.normal);
        }
    }

    #[test]
    fn hits_have_unit_normal_and_nonnegative_depth(a in placed(), b in placed()) {
        if let Some(hit) = collide(&world_shape(&a), &world_shape(&b)) {
            prop_assert!(hit.depth >= 0.0);
            prop_assert!((hit.normal.length() - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn disjoint_bounds_never_hit(a in placed(), b in placed()) {
        let (sa, sb) = (world_shape(&a), world_shape(&b));
        if is_exact(&sa, &sb) && !sa.aabb().overlaps(&sb.aabb()) {
            prop_assert!(collide(&sa, &sb).is_none());
        }
    }

    #[test]
    fn world_contacts_require_bounds_overlap(a in placed(), b in placed()) {
        let mut world = PhysicsWorld::default();
        let ea = world.spawn(Transform::from_position(a.1).with_rotation(a.2));
        let eb = world.spawn(Transform::from_position(b.1).with_rotation(b.2));
        world.set_collider(ea, a.0).unwrap();
        world.set_collider(eb, b.0).unwrap();
        world.set_rigidbody(eb, Rigidbody::kinematic()).unwrap();
        world.step(0.0);

        let wa = world.world_collider(ea).unwrap().aabb;
        let wb = world.world_collider(eb).unwrap().aabb;
        if !wa.overlaps(&wb) {
            prop_assert!(world.contacts().is_empty());
        }
        for c in world.contacts() {
            prop_assert!(c.a < c.b);
            prop_assert!(c.depth >= 0.0);
        }
    }

    #[test]
    fn spatial_hash_never_misses_an_overlap(
        boxes in prop::collection::vec((vec3(-10.0..10.0), vec3(0.05..3.0)), 1..40),
        probe in (vec3(-10.0..10.0), vec3(0.05..3.0)),
        cell in 0.5f32..4.0,
    ) {
        let mut keys: SlotMap<Entity, ()> = SlotMap::with_key();
        let mut grid = SpatialHash::new(cell, 4096);
        let mut entries = Vec::new();
        for (c, h) in boxes {
            let e = keys.insert(());
            let aabb = Aabb::from_center_half_extents(c, h);
            grid.register(e, &aabb);
            entries.push((e, aabb));
        }
        let q = Aabb::from_center_half_extents(probe.0, probe.1);
        let found = grid.query(&q);
        for (e, aabb) in &entries {
            if aabb.overlaps(&q) {
                prop_assert!(found.contains(e), "missed {:?}", e);
            }
        }
    }
}
