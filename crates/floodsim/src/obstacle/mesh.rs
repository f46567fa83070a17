//! Triangle meshes and vertical ray casts against them.

use glam::{Mat4, Vec3};

use crate::error::{Result, SimError};

/// Indexed triangle soup.
#[derive(Clone, Debug)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Validate that every index points at a vertex.
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        let count = positions.len() as u32;
        if let Some(bad) = triangles.iter().flatten().find(|&&i| i >= count) {
            return Err(SimError::config(format!(
                "triangle index {bad} out of range for {count} vertices"
            )));
        }
        Ok(Self {
            positions,
            triangles,
        })
    }

    /// Closed axis-aligned box centred on the origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let positions = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let triangles = vec![
            // bottom
            [0, 2, 1],
            [0, 3, 2],
            // top
            [4, 5, 6],
            [4, 6, 7],
            // sides
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ];
        Self {
            positions,
            triangles,
        }
    }

    /// Vertex positions after `transform`.
    pub fn transformed(&self, transform: &Mat4) -> Vec<Vec3> {
        self.positions
            .iter()
            .map(|&p| transform.transform_point3(p))
            .collect()
    }
}

/// Axis-aligned bounds of a point set, `None` when empty.
pub fn bounds(points: &[Vec3]) -> Option<(Vec3, Vec3)> {
    let first = *points.first()?;
    Some(
        points
            .iter()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
    )
}

/// Height at which a vertical line through (x, z) crosses triangle `abc`.
///
/// Triangles seen edge-on from above (vertical walls) never report a hit.
pub fn cast_vertical_ray(a: Vec3, b: Vec3, c: Vec3, x: f32, z: f32) -> Option<f32> {
    const EDGE_EPS: f32 = -1e-6;

    let det = (b.z - c.z) * (a.x - c.x) + (c.x - b.x) * (a.z - c.z);
    if det.abs() < 1e-12 {
        return None;
    }
    let l1 = ((b.z - c.z) * (x - c.x) + (c.x - b.x) * (z - c.z)) / det;
    let l2 = ((c.z - a.z) * (x - c.x) + (a.x - c.x) * (z - c.z)) / det;
    let l3 = 1.0 - l1 - l2;
    if l1 < EDGE_EPS || l2 < EDGE_EPS || l3 < EDGE_EPS {
        return None;
    }
    Some(l1 * a.y + l2 * b.y + l3 * c.y)
}
