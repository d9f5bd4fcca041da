use glam::Vec3;

use crate::api::NarrowphaseApi;
use crate::cache::WorldShape;
use crate::geometry::{any_perpendicular, closest_point_on_segment, closest_points_segments, EPSILON};
use crate::shapes::{Capsule, Cylinder, Obb, Sphere};
use crate::types::{Overlap, ShapeType};

/// Cross-product axes shorter than this (squared) are parallel edges and are
/// skipped by the SAT tests.
const SAT_AXIS_EPSILON: f32 = 1e-6;

/// Cylinder-cylinder reports the axial (SAT) contact only when it is tighter
/// than this fraction of the radial overlap.
const AXIAL_PREFERENCE: f32 = 0.9;

/// Narrowphase primitive tests.
pub struct Narrowphase;

/// Separating-axis accumulator: tracks the axis of least overlap, oriented
/// along `t` (first center toward second).
struct Sat {
    t: Vec3,
    depth: f32,
    normal: Vec3,
}

impl Sat {
    fn new(t: Vec3) -> Self {
        Self { t, depth: f32::INFINITY, normal: Vec3::Y }
    }

    /// Tests one candidate axis. `extent` returns the summed projected
    /// half-widths of both shapes on a unit axis. Returns `false` when the
    /// axis separates the shapes.
    fn test(&mut self, axis: Vec3, extent: impl Fn(Vec3) -> f32) -> bool {
        let len2 = axis.length_squared();
        if len2 < SAT_AXIS_EPSILON {
            return true;
        }
        let l = axis / len2.sqrt();
        let dist = self.t.dot(l);
        let overlap = extent(l) - dist.abs();
        if overlap < 0.0 {
            return false;
        }
        if overlap < self.depth {
            self.depth = overlap;
            self.normal = if dist < 0.0 { -l } else { l };
        }
        true
    }

    fn finish(self) -> Option<Overlap> {
        self.depth.is_finite().then_some(Overlap { normal: self.normal, depth: self.depth })
    }
}

impl NarrowphaseApi for Narrowphase {
    fn sphere_sphere(a: &Sphere, b: &Sphere) -> Option<Overlap> {
        let d = b.center - a.center;
        let rsum = a.radius + b.radius;
        let dist2 = d.length_squared();
        if dist2 >= rsum * rsum {
            return None;
        }
        let dist = dist2.sqrt();
        // Coincident centers; pick up.
        let normal = if dist > EPSILON { d / dist } else { Vec3::Y };
        Some(Overlap { normal, depth: (rsum - dist).max(0.0) })
    }

    fn sphere_obb(a: &Sphere, b: &Obb) -> Option<Overlap> {
        let local = b.to_local(a.center);
        let e = b.half_extents;
        let inside = local.abs().cmple(e).all();

        if !inside {
            let closest = b.from_local(local.clamp(-e, e));
            let diff = closest - a.center;
            let dist2 = diff.length_squared();
            if dist2 > a.radius * a.radius {
                return None;
            }
            let dist = dist2.sqrt();
            if dist > EPSILON {
                return Some(Overlap { normal: diff / dist, depth: (a.radius - dist).max(0.0) });
            }
            // Center sits on the surface: resolve through the nearest face.
        }

        // Push out through the face with the least distance.
        let face = e - local.abs();
        let k = if face.x <= face.y && face.x <= face.z {
            0
        } else if face.y <= face.z {
            1
        } else {
            2
        };
        let sign = if local[k] >= 0.0 { 1.0 } else { -1.0 };
        Some(Overlap { normal: -b.axes[k] * sign, depth: a.radius + face[k].max(0.0) })
    }

    fn sphere_capsule(a: &Sphere, b: &Capsule) -> Option<Overlap> {
        let (core, _) = closest_point_on_segment(a.center, b.start, b.end);
        Self::sphere_sphere(a, &Sphere { center: core, radius: b.radius })
    }

    fn sphere_cylinder(a: &Sphere, b: &Cylinder) -> Option<Overlap> {
        let rel = a.center - b.center;
        let h = rel.dot(b.axis);
        let radial = rel - b.axis * h;
        let rd = radial.length();
        let radial_dir = if rd > EPSILON { radial / rd } else { any_perpendicular(b.axis) };
        let hh = b.half_height;

        if h.abs() <= hh && rd <= b.radius {
            let side = b.radius - rd;
            let top = hh - h;
            let bottom = hh + h;
            let (normal, pen) = if side <= top && side <= bottom {
                (-radial_dir, side)
            } else if top <= bottom {
                (-b.axis, top)
            } else {
                (b.axis, bottom)
            };
            return Some(Overlap { normal, depth: pen + a.radius });
        }

        // Closest point on the solid: side wall, cap disc or cap rim.
        let closest = b.center + b.axis * h.clamp(-hh, hh) + radial_dir * rd.min(b.radius);
        let diff = closest - a.center;
        let dist2 = diff.length_squared();
        if dist2 > a.radius * a.radius {
            return None;
        }
        let dist = dist2.sqrt();
        let normal = if dist > EPSILON {
            diff / dist
        } else if h.abs() > hh {
            -b.axis * h.signum()
        } else {
            -radial_dir
        };
        Some(Overlap { normal, depth: (a.radius - dist).max(0.0) })
    }

    fn obb_obb(a: &Obb, b: &Obb) -> Option<Overlap> {
        let mut sat = Sat::new(b.center - a.center);
        let extent = |l: Vec3| a.project_radius(l) + b.project_radius(l);
        for axis in a.axes.iter().chain(b.axes.iter()) {
            if !sat.test(*axis, extent) {
                return None;
            }
        }
        for ea in &a.axes {
            for eb in &b.axes {
                if !sat.test(ea.cross(*eb), extent) {
                    return None;
                }
            }
        }
        sat.finish()
    }

    fn obb_capsule(a: &Obb, b: &Capsule) -> Option<Overlap> {
        let mut sat = Sat::new(b.center() - a.center);
        let extent = |l: Vec3| a.project_radius(l) + b.project_radius(l);
        let axis = b.axis();
        for face in &a.axes {
            if !sat.test(*face, extent) || !sat.test(face.cross(axis), extent) {
                return None;
            }
        }
        sat.finish()
    }

    fn obb_cylinder(a: &Obb, b: &Cylinder) -> Option<Overlap> {
        let mut sat = Sat::new(b.center - a.center);
        let extent = |l: Vec3| a.project_radius(l) + b.project_radius(l);
        for face in &a.axes {
            if !sat.test(*face, extent) || !sat.test(face.cross(b.axis), extent) {
                return None;
            }
        }
        sat.finish()
    }

    fn capsule_capsule(a: &Capsule, b: &Capsule) -> Option<Overlap> {
        let (pa, pb) = closest_points_segments(a.start, a.end, b.start, b.end);
        Self::sphere_sphere(&Sphere { center: pa, radius: a.radius }, &Sphere { center: pb, radius: b.radius })
    }

    fn capsule_cylinder(a: &Capsule, b: &Cylinder) -> Option<Overlap> {
        // Probe the end caps and the core point nearest the cylinder axis.
        let (near_axis, _) = closest_points_segments(a.start, a.end, b.bottom(), b.top());
        let mut best: Option<Overlap> = None;
        for probe in [a.start, a.end, near_axis] {
            let Some(hit) = Self::sphere_cylinder(&Sphere { center: probe, radius: a.radius }, b) else {
                continue;
            };
            if best.is_none_or(|cur| hit.depth > cur.depth) {
                best = Some(hit);
            }
        }
        best
    }

    fn cylinder_cylinder(a: &Cylinder, b: &Cylinder) -> Option<Overlap> {
        // Both the radial and the axial test must report overlap.
        let (pa, pb) = closest_points_segments(a.bottom(), a.top(), b.bottom(), b.top());
        let d = pb - pa;
        let dist = d.length();
        let radial_depth = a.radius + b.radius - dist;
        if radial_depth <= 0.0 {
            return None;
        }

        let t = b.center - a.center;
        let mut sat = Sat::new(t);
        let extent = |l: Vec3| a.project_radius(l) + b.project_radius(l);
        for axis in [a.axis, b.axis, a.axis.cross(b.axis)] {
            if !sat.test(axis, extent) {
                return None;
            }
        }
        let axial = sat.finish()?;

        if axial.depth < radial_depth * AXIAL_PREFERENCE {
            return Some(axial);
        }
        let normal = if dist > EPSILON {
            d / dist
        } else {
            let off_axis = t - a.axis * t.dot(a.axis);
            off_axis.normalize_or(any_perpendicular(a.axis))
        };
        Some(Overlap { normal, depth: radial_depth })
    }
}

/// Signature shared by every entry of the dispatch table.
pub type PairTest = fn(&WorldShape, &WorldShape) -> Option<Overlap>;

macro_rules! pair_test {
    ($name:ident, $va:ident, $vb:ident, $test:path) => {
        fn $name(a: &WorldShape, b: &WorldShape) -> Option<Overlap> {
            match (a, b) {
                (WorldShape::$va(a), WorldShape::$vb(b)) => $test(a, b),
                _ => None,
            }
        }
    };
    // Reversed argument order: run the canonical test and flip the normal.
    ($name:ident, $va:ident, $vb:ident, $test:path, swapped) => {
        fn $name(a: &WorldShape, b: &WorldShape) -> Option<Overlap> {
            match (a, b) {
                (WorldShape::$va(a), WorldShape::$vb(b)) => $test(b, a).map(Overlap::flipped),
                _ => None,
            }
        }
    };
}

pair_test!(sphere_sphere, Sphere, Sphere, Narrowphase::sphere_sphere);
pair_test!(sphere_obb, Sphere, Obb, Narrowphase::sphere_obb);
pair_test!(sphere_capsule, Sphere, Capsule, Narrowphase::sphere_capsule);
pair_test!(sphere_cylinder, Sphere, Cylinder, Narrowphase::sphere_cylinder);
pair_test!(obb_sphere, Obb, Sphere, Narrowphase::sphere_obb, swapped);
pair_test!(obb_obb, Obb, Obb, Narrowphase::obb_obb);
pair_test!(obb_capsule, Obb, Capsule, Narrowphase::obb_capsule);
pair_test!(obb_cylinder, Obb, Cylinder, Narrowphase::obb_cylinder);
pair_test!(capsule_sphere, Capsule, Sphere, Narrowphase::sphere_capsule, swapped);
pair_test!(capsule_obb, Capsule, Obb, Narrowphase::obb_capsule, swapped);
pair_test!(capsule_capsule, Capsule, Capsule, Narrowphase::capsule_capsule);
pair_test!(capsule_cylinder, Capsule, Cylinder, Narrowphase::capsule_cylinder);
pair_test!(cylinder_sphere, Cylinder, Sphere, Narrowphase::sphere_cylinder, swapped);
pair_test!(cylinder_obb, Cylinder, Obb, Narrowphase::obb_cylinder, swapped);
pair_test!(cylinder_capsule, Cylinder, Capsule, Narrowphase::capsule_cylinder, swapped);
pair_test!(cylinder_cylinder, Cylinder, Cylinder, Narrowphase::cylinder_cylinder);

/// Pair tests indexed by `[first.shape_type()][second.shape_type()]`.
pub const DISPATCH: [[PairTest; ShapeType::COUNT]; ShapeType::COUNT] = [
    [sphere_sphere, sphere_obb, sphere_capsule, sphere_cylinder],
    [obb_sphere, obb_obb, obb_capsule, obb_cylinder],
    [capsule_sphere, capsule_obb, capsule_capsule, capsule_cylinder],
    [cylinder_sphere, cylinder_obb, cylinder_capsule, cylinder_cylinder],
];

/// Intersects two world shapes; the normal points from `a` toward `b`.
pub fn collide(a: &WorldShape, b: &WorldShape) -> Option<Overlap> {
    DISPATCH[a.shape_type().index()][b.shape_type().index()](a, b)
}
