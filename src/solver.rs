//! Single-pass contact resolution.

use glam::Vec3;

use crate::types::{Contact, Rigidbody};

/// Contacts whose normal points this far along +Y (or -Y) ground the upper body.
pub const GROUND_NORMAL_Y: f32 = 0.7;

/// Mutable view of one side of a contact.
///
/// `body` is `None` for entities without a rigidbody; they behave as static.
pub struct SolverBody<'a> {
    pub position: &'a mut Vec3,
    pub body: Option<&'a mut Rigidbody>,
}

impl SolverBody<'_> {
    fn inverse_mass(&self) -> f32 {
        self.body.as_ref().map_or(0.0, |b| b.inverse_mass())
    }

    fn is_free(&self) -> bool {
        self.inverse_mass() > 0.0
    }

    fn velocity(&self) -> Vec3 {
        self.body.as_ref().map_or(Vec3::ZERO, |b| b.velocity)
    }

    fn set_velocity(&mut self, v: Vec3) {
        if let Some(b) = self.body.as_deref_mut() {
            b.velocity = v;
        }
    }

    fn ground(&mut self) {
        if let Some(b) = self.body.as_deref_mut().filter(|b| !b.body_type.is_fixed()) {
            b.is_grounded = true;
        }
    }
}

/// Pushes the pair apart along the contact normal and removes the
/// approaching velocity (no restitution). Returns whether anything moved.
pub fn solve_contact(contact: &Contact, a: &mut SolverBody<'_>, b: &mut SolverBody<'_>) -> bool {
    if contact.is_trigger || contact.depth <= 0.0 {
        return false;
    }
    let inv_a = a.inverse_mass();
    let inv_b = b.inverse_mass();
    let total = inv_a + inv_b;
    if total <= 0.0 {
        return false;
    }
    let n = contact.normal;

    // Position: split by inverse mass; a fixed side takes none of it.
    let correction = n * contact.depth / total;
    *a.position -= correction * inv_a;
    *b.position += correction * inv_b;

    match (a.is_free(), b.is_free()) {
        (true, true) => {
            let va = a.velocity();
            let vb = b.velocity();
            let closing = (vb - va).dot(n);
            if closing < 0.0 {
                let j = -closing / total;
                a.set_velocity(va - n * (j * inv_a));
                b.set_velocity(vb + n * (j * inv_b));
            }
        }
        (true, false) => {
            let va = a.velocity();
            let into = va.dot(n);
            if into > 0.0 {
                a.set_velocity(va - n * into);
            }
        }
        (false, true) => {
            let vb = b.velocity();
            let into = vb.dot(n);
            if into < 0.0 {
                b.set_velocity(vb - n * into);
            }
        }
        (false, false) => {}
    }

    if n.y > GROUND_NORMAL_Y {
        b.ground();
    } else if n.y < -GROUND_NORMAL_Y {
        a.ground();
    }
    true
}
