use bonk3d::*;
use glam::{Quat, Vec3};
use tracing_subscriber::EnvFilter;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let mut world = PhysicsWorld::new(WorldConfig { enable_timing: true, ..Default::default() })?;

    let floor = world.spawn(Transform::from_position(Vec3::new(0.0, -0.5, 0.0)));
    world.set_collider(floor, Collider::cuboid(Vec3::new(10.0, 0.5, 10.0)))?;

    let shapes = [
        Collider::cuboid(Vec3::splat(0.5)),
        Collider::sphere(0.5),
        Collider::capsule(1.5, 0.4),
        Collider::cylinder(1.0, 0.5),
    ];
    let mut bodies = Vec::new();
    for (i, collider) in shapes.into_iter().enumerate() {
        let y = 1.5 + i as f32 * 1.6;
        let t = Transform::from_position(Vec3::new(0.05 * i as f32, y, 0.0)).with_rotation(Quat::from_rotation_y(0.3 * i as f32));
        let e = world.spawn(t);
        world.set_collider(e, collider)?;
        world.set_rigidbody(e, Rigidbody::dynamic(1.0 + i as f32).with_drag(0.5))?;
        bodies.push(e);
    }

    for frame in 0..180 {
        world.step(1.0 / 60.0);
        for ev in world.drain_events() {
            if ev.state != EventState::Stay {
                println!("frame {frame:>3}: {:?} {:?} <-> {:?}", ev.state, ev.a, ev.b);
            }
        }
    }

    for e in &bodies {
        if let (Some(t), Some(rb)) = (world.transform(*e), world.rigidbody(*e)) {
            println!("{e:?}: y={:.3} grounded={}", t.position.y, rb.is_grounded);
        }
    }
    let stats = world.debug_stats();
    println!("stats: {stats:?}");
    if let Some(t) = world.timing() {
        println!(
            "timing (ms): total={:.3} integrate={:.3} cache={:.3} broad={:.3} narrow={:.3} events={:.3} solve={:.3}",
            t.total_ms, t.integrate_ms, t.cache_ms, t.broadphase_ms, t.narrowphase_ms, t.events_ms, t.solve_ms
        );
    }
    Ok(())
}
