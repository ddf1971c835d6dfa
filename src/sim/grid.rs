//! Uniform spatial hash grid
//!
//! Buckets indices by cell so neighbor queries touch a handful of cells
//! instead of every entity. Queries are conservative: callers still distance
//! check. There is no removal; the grid is cleared and refilled instead.

use std::collections::HashMap;

use glam::Vec2;

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell: f32,
    buckets: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell: f32) -> Self {
        Self {
            cell: cell.max(1.0),
            buckets: HashMap::new(),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell
    }

    #[inline]
    fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell).floor() as i32,
            (pos.y / self.cell).floor() as i32,
        )
    }

    /// Drop every bucket entry (bucket allocations are kept)
    pub fn clear(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
    }

    pub fn insert_index(&mut self, index: usize, pos: Vec2) {
        let key = self.cell_of(pos);
        self.buckets.entry(key).or_default().push(index);
    }

    /// Append every index within `ceil(range / cell) + 1` rings of `pos`'s cell
    pub fn neighbors_into(&self, pos: Vec2, range: f32, out: &mut Vec<usize>) {
        let (cx, cy) = self.cell_of(pos);
        let rings = (range.max(0.0) / self.cell).ceil() as i32 + 1;
        for gy in cy - rings..=cy + rings {
            for gx in cx - rings..=cx + rings {
                if let Some(bucket) = self.buckets.get(&(gx, gy)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
    }

    pub fn neighbors(&self, pos: Vec2, range: f32) -> Vec<usize> {
        let mut out = Vec::new();
        self.neighbors_into(pos, range, &mut out);
        out
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_superset() {
        let mut grid = SpatialGrid::new(50.0);
        let points = [
            Vec2::new(10.0, 10.0),
            Vec2::new(60.0, 10.0),
            Vec2::new(300.0, 300.0),
            Vec2::new(-40.0, -5.0),
        ];
        for (i, p) in points.iter().enumerate() {
            grid.insert_index(i, *p);
        }

        let found = grid.neighbors(Vec2::new(20.0, 20.0), 60.0);
        for (i, p) in points.iter().enumerate() {
            if p.distance(Vec2::new(20.0, 20.0)) <= 60.0 {
                assert!(found.contains(&i), "missing neighbor {i}");
            }
        }
        assert!(!found.contains(&2));
    }

    #[test]
    fn test_clear() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert_index(0, Vec2::ZERO);
        grid.insert_index(1, Vec2::new(5.0, 5.0));
        assert_eq!(grid.len(), 2);
        grid.clear();
        assert!(grid.is_empty());
        assert!(grid.neighbors(Vec2::ZERO, 100.0).is_empty());
    }
}
