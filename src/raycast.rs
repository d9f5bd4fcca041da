//! Ray-vs-primitive tests.
//!
//! Every test reports the smallest non-negative distance at which the ray
//! crosses the shape's surface. A ray starting inside a shape hits the exit
//! point.

use glam::Vec3;

use crate::api::RaycastApi;
use crate::cache::WorldShape;
use crate::geometry::EPSILON;
use crate::narrowphase::Narrowphase;
use crate::shapes::{Capsule, Cylinder, Obb, Sphere};

/// Both roots of `|o + d t - c|^2 = r^2`, ascending.
fn sphere_roots(o: Vec3, d: Vec3, c: Vec3, r: f32) -> Option<(f32, f32)> {
    let m = o - c;
    let b = m.dot(d);
    let cc = m.length_squared() - r * r;
    let disc = b * b - cc;
    if disc < 0.0 {
        return None;
    }
    let s = disc.sqrt();
    Some((-b - s, -b + s))
}

/// Both roots of the infinite cylinder of radius `r` around the line through
/// `base` along unit `axis`. `None` when the ray runs parallel to the axis or
/// misses.
fn tube_roots(o: Vec3, d: Vec3, base: Vec3, axis: Vec3, r: f32) -> Option<(f32, f32)> {
    let m = o - base;
    let d_perp = d - axis * d.dot(axis);
    let m_perp = m - axis * m.dot(axis);
    let a = d_perp.length_squared();
    if a < EPSILON {
        return None;
    }
    let b = m_perp.dot(d_perp);
    let c = m_perp.length_squared() - r * r;
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let s = disc.sqrt();
    Some(((-b - s) / a, (-b + s) / a))
}

/// Keeps the smallest non-negative candidate.
#[derive(Default)]
struct Nearest(Option<f32>);

impl Nearest {
    fn offer(&mut self, t: f32) {
        if t >= 0.0 && t.is_finite() && self.0.is_none_or(|best| t < best) {
            self.0 = Some(t);
        }
    }
}

impl RaycastApi for Narrowphase {
    fn ray_sphere(origin: Vec3, dir: Vec3, s: &Sphere) -> Option<f32> {
        let (t0, t1) = sphere_roots(origin, dir, s.center, s.radius)?;
        let mut best = Nearest::default();
        best.offer(t0);
        best.offer(t1);
        best.0
    }

    fn ray_obb(origin: Vec3, dir: Vec3, b: &Obb) -> Option<f32> {
        let o = b.to_local(origin);
        let d = b.dir_to_local(dir);
        let e = b.half_extents;
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        for i in 0..3 {
            if d[i].abs() < EPSILON {
                if o[i].abs() > e[i] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d[i];
            let t1 = (-e[i] - o[i]) * inv;
            let t2 = (e[i] - o[i]) * inv;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
            if tmin > tmax {
                return None;
            }
        }
        if tmax < 0.0 {
            return None;
        }
        Some(if tmin >= 0.0 { tmin } else { tmax })
    }

    fn ray_capsule(origin: Vec3, dir: Vec3, c: &Capsule) -> Option<f32> {
        let axis = c.axis();
        let len = (c.end - c.start).length();
        let axial = |t: f32| (origin + dir * t - c.start).dot(axis);
        let mut best = Nearest::default();

        if let Some((t0, t1)) = tube_roots(origin, dir, c.start, axis, c.radius) {
            for t in [t0, t1] {
                let s = axial(t);
                if (0.0..=len).contains(&s) {
                    best.offer(t);
                }
            }
        }
        if let Some((t0, t1)) = sphere_roots(origin, dir, c.start, c.radius) {
            for t in [t0, t1] {
                if axial(t) <= 0.0 {
                    best.offer(t);
                }
            }
        }
        if let Some((t0, t1)) = sphere_roots(origin, dir, c.end, c.radius) {
            for t in [t0, t1] {
                if axial(t) >= len {
                    best.offer(t);
                }
            }
        }
        best.0
    }

    fn ray_cylinder(origin: Vec3, dir: Vec3, c: &Cylinder) -> Option<f32> {
        let hh = c.half_height;
        let axial = |t: f32| (origin + dir * t - c.center).dot(c.axis);
        let mut best = Nearest::default();

        if let Some((t0, t1)) = tube_roots(origin, dir, c.center, c.axis, c.radius) {
            for t in [t0, t1] {
                if axial(t).abs() <= hh {
                    best.offer(t);
                }
            }
        }

        let along = dir.dot(c.axis);
        if along.abs() > EPSILON {
            let start = (origin - c.center).dot(c.axis);
            for cap in [-hh, hh] {
                let t = (cap - start) / along;
                let p = origin + dir * t - c.center;
                let radial = p - c.axis * p.dot(c.axis);
                if radial.length_squared() <= c.radius * c.radius {
                    best.offer(t);
                }
            }
        }
        best.0
    }
}

/// Distance along unit `dir` to the first surface crossing of `shape`.
pub fn ray_shape(origin: Vec3, dir: Vec3, shape: &WorldShape) -> Option<f32> {
    match shape {
        WorldShape::Sphere(s) => Narrowphase::ray_sphere(origin, dir, s),
        WorldShape::Obb(b) => Narrowphase::ray_obb(origin, dir, b),
        WorldShape::Capsule(c) => Narrowphase::ray_capsule(origin, dir, c),
        WorldShape::Cylinder(c) => Narrowphase::ray_cylinder(origin, dir, c),
    }
}
