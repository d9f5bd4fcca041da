//! Semi-implicit Euler integration for dynamic bodies.

use glam::Vec3;

use crate::types::{BodyType, Rigidbody};

/// Advances one body by `dt`: velocity first, then position.
///
/// Non-dynamic bodies are left untouched. `dt` is used as given; the world
/// clamps it before calling in.
pub fn integrate(position: &mut Vec3, body: &mut Rigidbody, gravity: f32, dt: f32) {
    if body.body_type != BodyType::Dynamic {
        return;
    }
    body.is_grounded = false;

    if body.use_gravity {
        body.velocity.y += gravity * dt;
    }

    // Drag damps horizontal motion only so falling speed stays gravity-driven.
    let damp = (1.0 - body.drag * dt).max(0.0);
    body.velocity.x *= damp;
    body.velocity.z *= damp;

    *position += body.velocity * dt;
}

/// True when a dynamic body has fallen out of the world.
pub fn below_kill_floor(position: Vec3, body: &Rigidbody, kill_floor_y: f32) -> bool {
    body.body_type == BodyType::Dynamic && position.y < kill_floor_y
}

/// Teleports the body to `point` and stops it.
pub fn respawn(position: &mut Vec3, body: &mut Rigidbody, point: Vec3) {
    *position = point;
    body.velocity = Vec3::ZERO;
    body.is_grounded = false;
}
