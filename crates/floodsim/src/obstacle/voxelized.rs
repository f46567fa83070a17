//! Obstacle backed by a closed triangle mesh.

use glam::Mat4;

use super::mesh::{bounds, cast_vertical_ray, TriangleMesh};
use super::{ObstacleSource, SolidInterval};
use crate::grid::Grid;

/// Mesh voxelized into one solid interval per grid column.
///
/// The mesh is given in the water grid's local space; `transform` places it.
/// Each column keeps the first and last crossing of a vertical ray through
/// the cell centre.
#[derive(Clone, Debug)]
pub struct VoxelizedObstacle {
    grid: Grid,
    mesh: TriangleMesh,
    transform: Mat4,
    dynamic: bool,
    dirty: bool,
    intervals: Vec<Option<SolidInterval>>,
}

impl VoxelizedObstacle {
    pub fn new(grid: Grid, mesh: TriangleMesh, transform: Mat4, dynamic: bool) -> Self {
        Self {
            grid,
            mesh,
            transform,
            dynamic,
            dirty: true,
            intervals: vec![None; grid.cell_count()],
        }
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Move the mesh; intervals are recomputed on the next `update()`.
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.dirty = true;
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// Columns with solid material.
    pub fn footprint(&self) -> impl Iterator<Item = (usize, SolidInterval)> + '_ {
        self.intervals
            .iter()
            .enumerate()
            .filter_map(|(idx, iv)| iv.map(|iv| (idx, iv)))
    }

    fn voxelize(&mut self) {
        self.intervals.fill(None);
        let world = self.mesh.transformed(&self.transform);
        let Some((lo, hi)) = bounds(&world) else {
            return;
        };

        for idx in 0..self.grid.cell_count() {
            let c = self.grid.cell_center(idx);
            if c.x < lo.x || c.x > hi.x || c.z < lo.z || c.z > hi.z {
                continue;
            }
            let mut first = f32::INFINITY;
            let mut last = f32::NEG_INFINITY;
            for tri in &self.mesh.triangles {
                let [a, b, cc] = tri.map(|i| world[i as usize]);
                if let Some(h) = cast_vertical_ray(a, b, cc, c.x, c.z) {
                    first = first.min(h);
                    last = last.max(h);
                }
            }
            if first < last {
                self.intervals[idx] = Some(SolidInterval {
                    bottom: first,
                    top: last,
                });
            }
        }
    }
}

impl ObstacleSource for VoxelizedObstacle {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn update(&mut self) {
        if self.dirty {
            self.voxelize();
            self.dirty = false;
        }
    }

    fn interval(&self, idx: usize) -> Option<SolidInterval> {
        self.intervals[idx]
    }

    fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_footprint_follows_transform() {
        let grid = Grid::new(8, 8.0).unwrap();
        let mesh = TriangleMesh::cuboid(Vec3::new(1.0, 1.0, 1.0));
        let mut obstacle = VoxelizedObstacle::new(grid, mesh, Mat4::IDENTITY, true);
        obstacle.update();
        let before: Vec<usize> = obstacle.footprint().map(|(idx, _)| idx).collect();
        assert_eq!(before.len(), 4);

        obstacle.set_transform(Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        // Not recomputed until update()
        assert_eq!(obstacle.footprint().count(), 4);
        obstacle.update();
        let after: Vec<usize> = obstacle.footprint().map(|(idx, _)| idx).collect();
        assert_eq!(after.len(), 4);
        assert!(after.iter().all(|idx| !before.contains(idx)));
    }

    #[test]
    fn test_rotated_box_intervals() {
        let grid = Grid::new(9, 9.0).unwrap();
        let mesh = TriangleMesh::cuboid(Vec3::new(2.0, 0.5, 2.0));
        let transform = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let mut obstacle = VoxelizedObstacle::new(grid, mesh, transform, false);
        obstacle.update();
        let centre = grid.index(0.0, 0.0).unwrap();
        let interval = obstacle.interval(centre).unwrap();
        assert!((interval.bottom + 0.5).abs() < 1e-5);
        assert!((interval.top - 0.5).abs() < 1e-5);
        // Corner of the grid stays empty
        assert!(obstacle.interval(0).is_none());
    }
}
