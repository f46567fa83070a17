//! Square simulation grid and the height fields laid out on it.
//!
//! The grid is centred on the local origin: it spans `[-size/2, size/2]` on
//! both X and Z. Samples are stored row-major, `idx = row * res + col`, with
//! rows running along Z and columns along X.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::reduce;

/// Cardinal neighbour direction on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `col - 1`
    Left,
    /// `col + 1`
    Right,
    /// `row - 1`
    Top,
    /// `row + 1`
    Bottom,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Top,
        Direction::Bottom,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
        }
    }

    /// (row, col) offset.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
            Direction::Top => (-1, 0),
            Direction::Bottom => (1, 0),
        }
    }
}

/// A cell picked up by a circular gather.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffectedCell {
    pub id: usize,
    /// Normalised radial distance from the gather centre, in `[0, 1)`.
    pub weight: f32,
}

/// Square grid: `res` cells per side over an edge of `size` world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    res: usize,
    size: f32,
}

impl Grid {
    /// Create a grid. Needs at least one interior cell (`res >= 3`).
    pub fn new(res: usize, size: f32) -> Result<Self> {
        if res < 3 {
            return Err(SimError::config(format!(
                "grid resolution must be at least 3, got {res}"
            )));
        }
        if !(size.is_finite() && size > 0.0) {
            return Err(SimError::config(format!(
                "grid size must be positive, got {size}"
            )));
        }
        Ok(Self { res, size })
    }

    #[inline]
    pub fn res(&self) -> usize {
        self.res
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Edge length of one cell.
    #[inline]
    pub fn segment_size(&self) -> f32 {
        self.size / self.res as f32
    }

    #[inline]
    pub fn cell_area(&self) -> f32 {
        let s = self.segment_size();
        s * s
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.res * self.res
    }

    /// Flat index from (row, col).
    #[inline]
    pub fn idx(&self, row: usize, col: usize) -> usize {
        row * self.res + col
    }

    /// (row, col) from a flat index.
    #[inline]
    pub fn row_col(&self, idx: usize) -> (usize, usize) {
        (idx / self.res, idx % self.res)
    }

    /// Nearest cell for a local-space (x, z) position, `None` when outside.
    pub fn index(&self, x: f32, z: f32) -> Option<usize> {
        let half = self.size * 0.5;
        let res = self.res as f32;
        let row = ((z + half) / self.size * res).floor();
        let col = ((x + half) / self.size * res).floor();
        if !(row >= 0.0 && row < res && col >= 0.0 && col < res) {
            return None;
        }
        Some(self.idx(row as usize, col as usize))
    }

    /// [`Grid::index`] for a 3D position; `y` is ignored.
    pub fn index_of(&self, position: Vec3) -> Option<usize> {
        self.index(position.x, position.z)
    }

    /// Local-space centre of a cell (y = 0).
    pub fn cell_center(&self, idx: usize) -> Vec3 {
        let (row, col) = self.row_col(idx);
        let seg = self.segment_size();
        let half = self.size * 0.5;
        Vec3::new(
            -half + (col as f32 + 0.5) * seg,
            0.0,
            -half + (row as f32 + 0.5) * seg,
        )
    }

    #[inline]
    pub fn is_border(&self, idx: usize) -> bool {
        let (row, col) = self.row_col(idx);
        row == 0 || col == 0 || row + 1 == self.res || col + 1 == self.res
    }

    /// Indices of the cells a scheme propagates: `[1, res-2]²`.
    pub fn interior(&self) -> impl Iterator<Item = usize> + '_ {
        (1..self.res - 1).flat_map(move |row| (1..self.res - 1).map(move |col| self.idx(row, col)))
    }

    /// Indices of the outermost ring of cells.
    pub fn border(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.cell_count()).filter(move |&idx| self.is_border(idx))
    }

    /// Neighbour in `dir`, `None` past the domain edge.
    #[inline]
    pub fn neighbor(&self, idx: usize, dir: Direction) -> Option<usize> {
        let (row, col) = self.row_col(idx);
        let (dr, dc) = dir.offset();
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        let res = self.res as isize;
        if nr < 0 || nc < 0 || nr >= res || nc >= res {
            return None;
        }
        Some(self.idx(nr as usize, nc as usize))
    }

    /// Neighbours of an interior cell: `[left, right, top, bottom]`.
    ///
    /// Only valid for interior cells; border cells would wrap.
    #[inline]
    pub fn interior_neighbors(&self, idx: usize) -> [usize; 4] {
        [idx - 1, idx + 1, idx - self.res, idx + self.res]
    }

    /// Circular gather around `position`.
    ///
    /// Walks offsets from `position` over the bounding square of side
    /// `2 * radius` in steps of one segment, and keeps the offsets strictly
    /// inside the circle that land on the grid. The weight is the normalised
    /// offset length `|offset| / radius`, so the cell under the brush centre
    /// always has weight 0.
    pub fn gather(&self, position: Vec3, radius: f32) -> Vec<AffectedCell> {
        if !(radius > 0.0) {
            return Vec::new();
        }
        let seg = self.segment_size();
        let steps = (radius / seg).floor() as i64;

        let mut cells = Vec::new();
        for j in -steps..=steps {
            for i in -steps..=steps {
                let dx = i as f32 * seg;
                let dz = j as f32 * seg;
                let dist = (dx * dx + dz * dz).sqrt();
                if dist >= radius {
                    continue;
                }
                if let Some(id) = self.index(position.x + dx, position.z + dz) {
                    cells.push(AffectedCell {
                        id,
                        weight: dist / radius,
                    });
                }
            }
        }
        cells
    }
}

/// Force the four border rows/columns of `data` to `h`.
pub fn pin_border(grid: &Grid, data: &mut [f32], h: f32) {
    let res = grid.res();
    for i in 0..res {
        data[grid.idx(0, i)] = h;
        data[grid.idx(res - 1, i)] = h;
        data[grid.idx(i, 0)] = h;
        data[grid.idx(i, res - 1)] = h;
    }
}

/// Scalar samples on a [`Grid`].
#[derive(Clone, Debug)]
pub struct HeightField {
    grid: Grid,
    pub data: Vec<f32>,
}

impl HeightField {
    /// Create a field with every sample at `initial`.
    pub fn new(grid: Grid, initial: f32) -> Self {
        Self {
            grid,
            data: vec![initial; grid.cell_count()],
        }
    }

    /// Wrap existing samples; the length must be `res * res`.
    pub fn from_data(grid: Grid, data: Vec<f32>) -> Result<Self> {
        if data.len() != grid.cell_count() {
            return Err(SimError::config(format!(
                "height field needs {} samples, got {}",
                grid.cell_count(),
                data.len()
            )));
        }
        Ok(Self { grid, data })
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn get(&self, idx: usize) -> f32 {
        self.data[idx]
    }

    #[inline]
    pub fn set(&mut self, idx: usize, value: f32) {
        self.data[idx] = value;
    }

    /// Height at (row, col), 0 outside the grid.
    pub fn get_height(&self, row: usize, col: usize) -> f32 {
        if row < self.grid.res() && col < self.grid.res() {
            self.data[self.grid.idx(row, col)]
        } else {
            0.0
        }
    }

    /// Height at the cell containing a local (x, z) position.
    pub fn sample(&self, x: f32, z: f32) -> Option<f32> {
        self.grid.index(x, z).map(|idx| self.data[idx])
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Pin the border rows/columns to `h`.
    pub fn set_mean_height(&mut self, h: f32) {
        pin_border(&self.grid, &mut self.data, h);
    }

    pub fn min(&self) -> f32 {
        reduce::min(&self.data)
    }

    pub fn max(&self) -> f32 {
        reduce::max(&self.data)
    }

    pub fn mean(&self) -> f32 {
        reduce::mean(&self.data)
    }

    pub fn std_dev(&self) -> f32 {
        reduce::std_dev(&self.data)
    }
}
