//! Uniform-grid spatial hash.
//!
//! Cells are keyed by XOR-ing each integer cell coordinate multiplied by a
//! distinct large prime. Distinct cells may share a key; that only adds false
//! positives, which the narrow phase rejects.

use glam::{DVec3, I64Vec3, Vec3};
use rustc_hash::FxHashMap;

use crate::geometry::Aabb;
use crate::types::Entity;

const PRIME_X: i64 = 73_856_093;
const PRIME_Y: i64 = 19_349_663;
const PRIME_Z: i64 = 83_492_791;

pub struct SpatialHash {
    cell_size: f32,
    max_cells_per_entry: usize,
    cells: FxHashMap<i64, Vec<Entity>>,
    /// Entries too large to bin; returned by every query.
    oversized: Vec<Entity>,
}

impl SpatialHash {
    pub fn new(cell_size: f32, max_cells_per_entry: usize) -> Self {
        Self {
            cell_size: cell_size.max(1e-5),
            max_cells_per_entry: max_cells_per_entry.max(1),
            cells: FxHashMap::default(),
            oversized: Vec::new(),
        }
    }

    /// Number of occupied hash buckets.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.oversized.clear();
    }

    pub fn cell_key(cell: I64Vec3) -> i64 {
        cell.x.wrapping_mul(PRIME_X) ^ cell.y.wrapping_mul(PRIME_Y) ^ cell.z.wrapping_mul(PRIME_Z)
    }

    /// Inclusive cell range covered by `aabb`, or `None` when the bounds are
    /// non-finite or span more than `max_cells_per_entry` cells.
    ///
    /// The cell count is measured in f64 so huge bounds never reach integer math.
    fn span(&self, aabb: &Aabb) -> Option<(I64Vec3, I64Vec3)> {
        if !aabb.min.is_finite() || !aabb.max.is_finite() {
            return None;
        }
        let cell = f64::from(self.cell_size);
        let lo = (aabb.min.as_dvec3() / cell).floor();
        let hi = (aabb.max.as_dvec3() / cell).floor();
        let d = (hi - lo + DVec3::ONE).max(DVec3::ONE);
        if d.x * d.y * d.z > self.max_cells_per_entry as f64 {
            return None;
        }
        Some((lo.as_i64vec3(), hi.as_i64vec3()))
    }

    /// Inserts `entity` into every cell its bounds overlap.
    pub fn register(&mut self, entity: Entity, aabb: &Aabb) {
        let Some((lo, hi)) = self.span(aabb) else {
            self.oversized.push(entity);
            return;
        };
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    self.cells.entry(Self::cell_key(I64Vec3::new(x, y, z))).or_default().push(entity);
                }
            }
        }
    }

    /// All entities sharing a cell with `aabb`, sorted and deduplicated.
    pub fn query(&self, aabb: &Aabb) -> Vec<Entity> {
        let mut out = self.oversized.clone();
        if let Some((lo, hi)) = self.span(aabb) {
            for z in lo.z..=hi.z {
                for y in lo.y..=hi.y {
                    for x in lo.x..=hi.x {
                        if let Some(list) = self.cells.get(&Self::cell_key(I64Vec3::new(x, y, z))) {
                            out.extend_from_slice(list);
                        }
                    }
                }
            }
        } else {
            // Walking that many cells is worse than returning every bucket.
            for list in self.cells.values() {
                out.extend_from_slice(list);
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn entities(n: usize) -> Vec<Entity> {
        let mut sm: SlotMap<Entity, ()> = SlotMap::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    #[test]
    fn test_register_covers_straddled_cells() {
        let e = entities(1);
        let mut grid = SpatialHash::new(1.0, 64);
        grid.register(e[0], &Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5)));
        // Bounds straddling the origin touch 2x2x2 cells.
        assert_eq!(grid.cell_count(), 8);
        for corner in [Vec3::splat(-0.25), Vec3::splat(0.25), Vec3::new(-0.25, 0.25, -0.25)] {
            let q = grid.query(&Aabb::from_center_half_extents(corner, Vec3::splat(0.01)));
            assert_eq!(q, vec![e[0]]);
        }
    }

    #[test]
    fn test_query_sorts_and_dedups() {
        let e = entities(3);
        let mut grid = SpatialHash::new(1.0, 64);
        grid.register(e[2], &Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(1.5)));
        grid.register(e[0], &Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(1.5)));
        grid.register(e[1], &Aabb::from_center_half_extents(Vec3::splat(50.0), Vec3::splat(0.5)));
        let q = grid.query(&Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(2.0)));
        assert_eq!(q, vec![e[0], e[2]]);
    }

    #[test]
    fn test_clear_empties_grid() {
        let e = entities(1);
        let mut grid = SpatialHash::new(2.0, 64);
        grid.register(e[0], &Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE));
        grid.clear();
        assert_eq!(grid.cell_count(), 0);
        assert!(grid.query(&Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE)).is_empty());
    }

    #[test]
    fn test_oversized_entries_always_returned() {
        let e = entities(2);
        let mut grid = SpatialHash::new(1.0, 8);
        grid.register(e[0], &Aabb::from_center_half_extents(Vec3::ZERO, Vec3::new(500.0, 0.5, 500.0)));
        grid.register(e[1], &Aabb::from_center_half_extents(Vec3::new(300.0, 0.0, 0.0), Vec3::splat(0.4)));
        let q = grid.query(&Aabb::from_center_half_extents(Vec3::new(300.0, 0.0, 0.0), Vec3::splat(0.4)));
        assert_eq!(q, vec![e[0], e[1]]);
    }

    #[test]
    fn test_huge_bounds_go_oversized() {
        let e = entities(2);
        let mut grid = SpatialHash::new(1.0, 4096);
        grid.register(e[0], &Aabb::from_center_half_extents(Vec3::ZERO, Vec3::new(1e10, 0.5, 1e10)));
        grid.register(e[1], &Aabb::from_center_half_extents(Vec3::new(0.0, 2.0, 0.0), Vec3::splat(0.5)));
        assert_eq!(grid.cell_count(), 8);
        let q = grid.query(&Aabb::from_center_half_extents(Vec3::new(0.0, 2.0, 0.0), Vec3::splat(0.1)));
        assert_eq!(q, vec![e[0], e[1]]);
    }

    #[test]
    fn test_query_everything_returns_all_entries() {
        let e = entities(2);
        let mut grid = SpatialHash::new(1.0, 4096);
        grid.register(e[0], &Aabb::from_center_half_extents(Vec3::splat(-40.0), Vec3::splat(0.5)));
        grid.register(e[1], &Aabb::from_center_half_extents(Vec3::splat(40.0), Vec3::splat(0.5)));
        let q = grid.query(&Aabb::new(Vec3::splat(-1e10), Vec3::splat(1e10)));
        assert_eq!(q, vec![e[0], e[1]]);
        let q = grid.query(&Aabb::new(Vec3::splat(f32::MIN), Vec3::splat(f32::MAX)));
        assert_eq!(q, vec![e[0], e[1]]);
    }

    #[test]
    fn test_non_finite_bounds_go_oversized() {
        let e = entities(1);
        let mut grid = SpatialHash::new(1.0, 64);
        grid.register(e[0], &Aabb::new(Vec3::ZERO, Vec3::new(f32::INFINITY, 1.0, 1.0)));
        assert_eq!(grid.cell_count(), 0);
        assert_eq!(grid.query(&Aabb::from_center_half_extents(Vec3::splat(5.0), Vec3::ONE)), vec![e[0]]);
    }

    #[test]
    fn test_far_small_box_stays_in_grid() {
        let e = entities(1);
        let mut grid = SpatialHash::new(1.0, 64);
        let far = Aabb::from_center_half_extents(Vec3::splat(1e12), Vec3::splat(0.5));
        grid.register(e[0], &far);
        assert!(grid.cell_count() >= 1);
        assert_eq!(grid.query(&far), vec![e[0]]);
    }

    #[test]
    fn test_negative_coordinates_floor() {
        let grid = SpatialHash::new(2.0, 8);
        let p = Aabb::new(Vec3::new(-0.1, 0.0, 3.9), Vec3::new(-0.1, 0.0, 3.9));
        assert_eq!(grid.span(&p), Some((I64Vec3::new(-1, 0, 1), I64Vec3::new(-1, 0, 1))));
    }
}
