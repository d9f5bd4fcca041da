use bonk3d::*;
use glam::Vec3;

fn main() -> Result<()> {
    let mut world = PhysicsWorld::new(WorldConfig { cell_size: 2.0, ..Default::default() })?;

    let crate_box = world.spawn(Transform::from_position(Vec3::new(0.0, 0.0, 4.0)));
    world.set_collider(crate_box, Collider::cuboid(Vec3::splat(0.5)))?;

    let pillar = world.spawn(Transform::from_position(Vec3::new(0.0, 0.0, 8.0)));
    world.set_collider(pillar, Collider::cylinder(4.0, 0.75))?;

    let sensor = world.spawn(Transform::from_position(Vec3::new(0.0, 0.0, 2.0)));
    world.set_collider(sensor, Collider::sphere(0.5).trigger())?;

    world.refresh();

    let origin = Vec3::ZERO;
    for (label, filter) in [
        ("any", RayFilter::default()),
        ("solid only", RayFilter { include_triggers: false, ..Default::default() }),
        ("solid within 3", RayFilter { include_triggers: false, max_distance: 3.0, ..Default::default() }),
    ] {
        match world.raycast_filtered(origin, Vec3::Z, &filter) {
            Some(hit) => println!(
                "{label:>15}: hit {:?} at t={:.3} point=({:.2}, {:.2}, {:.2})",
                hit.entity, hit.distance, hit.point.x, hit.point.y, hit.point.z
            ),
            None => println!("{label:>15}: no hit"),
        }
    }
    Ok(())
}
