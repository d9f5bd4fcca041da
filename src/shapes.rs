//! World-space primitive shapes consumed by the narrow phase and raycaster.

use glam::Vec3;

use crate::geometry::Aabb;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Oriented box. `axes` are unit basis vectors; `half_extents` are measured
/// along them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Obb {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub axes: [Vec3; 3],
}

impl Obb {
    /// Half-width of the box projected onto unit axis `l`.
    pub fn project_radius(&self, l: Vec3) -> f32 {
        self.half_extents.x * self.axes[0].dot(l).abs()
            + self.half_extents.y * self.axes[1].dot(l).abs()
            + self.half_extents.z * self.axes[2].dot(l).abs()
    }

    /// World point expressed in box coordinates.
    pub fn to_local(&self, p: Vec3) -> Vec3 {
        let rel = p - self.center;
        Vec3::new(rel.dot(self.axes[0]), rel.dot(self.axes[1]), rel.dot(self.axes[2]))
    }

    /// World direction expressed in box coordinates.
    pub fn dir_to_local(&self, d: Vec3) -> Vec3 {
        Vec3::new(d.dot(self.axes[0]), d.dot(self.axes[1]), d.dot(self.axes[2]))
    }

    pub fn from_local(&self, p: Vec3) -> Vec3 {
        self.center + self.axes[0] * p.x + self.axes[1] * p.y + self.axes[2] * p.z
    }

    pub fn aabb(&self) -> Aabb {
        let half = self.axes[0].abs() * self.half_extents.x
            + self.axes[1].abs() * self.half_extents.y
            + self.axes[2].abs() * self.half_extents.z;
        Aabb::from_center_half_extents(self.center, half)
    }
}

/// Segment `start..end` inflated by `radius`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Capsule {
    pub start: Vec3,
    pub end: Vec3,
    pub radius: f32,
}

impl Capsule {
    pub fn center(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    /// Unit core axis; +Y when the core segment has collapsed to a point.
    pub fn axis(&self) -> Vec3 {
        (self.end - self.start).normalize_or(Vec3::Y)
    }

    pub fn half_length(&self) -> f32 {
        (self.end - self.start).length() * 0.5
    }

    /// Half-width projected onto unit axis `l`: the core segment's reach plus
    /// the full radius (the swept sphere is round in every direction).
    pub fn project_radius(&self, l: Vec3) -> f32 {
        self.half_length() * self.axis().dot(l).abs() + self.radius
    }

    pub fn aabb(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        Aabb { min: self.start.min(self.end) - r, max: self.start.max(self.end) + r }
    }
}

/// Solid cylinder with flat caps.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Cylinder {
    pub center: Vec3,
    /// Unit axis.
    pub axis: Vec3,
    pub half_height: f32,
    pub radius: f32,
}

impl Cylinder {
    pub fn top(&self) -> Vec3 {
        self.center + self.axis * self.half_height
    }

    pub fn bottom(&self) -> Vec3 {
        self.center - self.axis * self.half_height
    }

    /// Half-width projected onto unit axis `l`: axial reach plus the cap
    /// disc's reach, `radius * sin(theta)`.
    pub fn project_radius(&self, l: Vec3) -> f32 {
        let cos = self.axis.dot(l).abs();
        let sin = self.axis.cross(l).length();
        self.half_height * cos + self.radius * sin
    }

    pub fn aabb(&self) -> Aabb {
        let disc = (Vec3::ONE - self.axis * self.axis).max(Vec3::ZERO);
        let disc = Vec3::new(disc.x.sqrt(), disc.y.sqrt(), disc.z.sqrt());
        let half = self.axis.abs() * self.half_height + disc * self.radius;
        Aabb::from_center_half_extents(self.center, half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obb_projection_matches_extent_on_own_axes() {
        let b = Obb { center: Vec3::ZERO, half_extents: Vec3::new(1.0, 2.0, 3.0), axes: [Vec3::X, Vec3::Y, Vec3::Z] };
        assert_eq!(b.project_radius(Vec3::Y), 2.0);
        let diag = Vec3::ONE.normalize();
        assert!((b.project_radius(diag) - 6.0 / 3f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_obb_local_roundtrip() {
        let r = glam::Quat::from_rotation_y(0.7);
        let b = Obb { center: Vec3::new(1.0, 2.0, 3.0), half_extents: Vec3::ONE, axes: [r * Vec3::X, r * Vec3::Y, r * Vec3::Z] };
        let p = Vec3::new(-4.0, 0.5, 9.0);
        assert!(b.from_local(b.to_local(p)).abs_diff_eq(p, 1e-4));
    }

    #[test]
    fn test_cylinder_projection() {
        let c = Cylinder { center: Vec3::ZERO, axis: Vec3::Y, half_height: 2.0, radius: 1.0 };
        assert!((c.project_radius(Vec3::Y) - 2.0).abs() < 1e-6);
        assert!((c.project_radius(Vec3::X) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_capsule_projection_includes_radius() {
        let c = Capsule { start: Vec3::new(0.0, -1.0, 0.0), end: Vec3::new(0.0, 1.0, 0.0), radius: 0.5 };
        assert!((c.project_radius(Vec3::Y) - 1.5).abs() < 1e-6);
        assert!((c.project_radius(Vec3::X) - 0.5).abs() < 1e-6);
    }
}
