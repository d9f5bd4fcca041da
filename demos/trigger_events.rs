use bonk3d::*;
use glam::Vec3;

fn main() -> Result<()> {
    let mut world = PhysicsWorld::new(WorldConfig::default())?;

    let gate = world.spawn(Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
    world.set_collider(gate, Collider::cuboid(Vec3::new(0.25, 1.0, 2.0)).trigger())?;

    let runner = world.spawn(Transform::from_position(Vec3::new(-3.0, 1.0, 0.0)));
    world.set_collider(runner, Collider::capsule(1.8, 0.3))?;
    world.set_rigidbody(runner, Rigidbody::kinematic())?;

    world.time.set_time_scale(0.5)?;
    for _ in 0..120 {
        let dt = world.advance(1.0 / 30.0);
        // Kinematic bodies are moved by gameplay code.
        if let Some(t) = world.transform_mut(runner) {
            t.position.x += 4.0 * dt;
        }
        for ev in world.events() {
            if ev.involves(gate) && ev.state != EventState::Stay {
                println!("tick {:>3}: runner {:?} gate (trigger={})", world.tick(), ev.state, ev.is_trigger);
            }
        }
    }
    Ok(())
}
