//! Small geometric helpers shared by the cache, broad phase and narrow phase.

use glam::Vec3;

/// Tolerance used for degenerate-geometry guards (zero-length axes, parallel
/// segments, coincident points).
pub const EPSILON: f32 = 1e-6;

/// Axis-aligned bounding box in world coordinates.
///
/// `min` is component-wise less than or equal to `max`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Builds a box from two corners in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let h = half_extents.abs();
        Self { min: center - h, max: center + h }
    }

    /// Inclusive on faces so touching boxes still pair up in the broad phase.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    pub fn union(&self, other: &Aabb) -> Self {
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    pub fn translated(&self, delta: Vec3) -> Self {
        Self { min: self.min + delta, max: self.max + delta }
    }

    /// The box enlarged to also cover itself displaced by `delta`.
    pub fn swept(&self, delta: Vec3) -> Self {
        self.union(&self.translated(delta))
    }
}

/// Returns a unit vector perpendicular to `v` (which need not be normalized).
pub fn any_perpendicular(v: Vec3) -> Vec3 {
    let n = v.normalize_or(Vec3::Y);
    let helper = if n.y.abs() < 0.9 { Vec3::Y } else { Vec3::X };
    n.cross(helper).normalize_or(Vec3::X)
}

/// Closest point to `p` on the segment `a..b`, with the segment parameter.
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= EPSILON {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Closest points between segments `p1..q1` and `p2..q2`.
///
/// Returns `(c1, c2)` where `c1` lies on the first segment and `c2` on the
/// second. Handles zero-length segments on either or both sides.
pub fn closest_points_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a <= EPSILON && e <= EPSILON {
        return (p1, p2);
    }

    let (s, t) = if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            // Parallel segments: any s works, pick the start.
            let mut s = if denom > EPSILON { ((b * f - c * e) / denom).clamp(0.0, 1.0) } else { 0.0 };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}
