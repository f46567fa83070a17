//! Two-buffer ripple scheme.
//!
//! Keeps the current and previous surface in two owned buffers and flips a
//! single index between them. Relative to the mean height `m`:
//! `prev' = ((Σ₄(cur - m)) / 2 - (prev - m)) · damping + m`,
//! then the freshly written buffer becomes current.

use super::{IntegrationScheme, StepContext};
use crate::grid::Grid;

#[derive(Clone, Debug)]
pub struct XWater {
    buffers: [Vec<f32>; 2],
    current: usize,
}

impl XWater {
    pub fn new(grid: &Grid, mean_height: f32) -> Self {
        let cells = grid.cell_count();
        Self {
            buffers: [vec![mean_height; cells], vec![mean_height; cells]],
            current: 0,
        }
    }

    pub fn current(&self) -> &[f32] {
        &self.buffers[self.current]
    }

    pub fn previous(&self) -> &[f32] {
        &self.buffers[1 - self.current]
    }

    fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

impl IntegrationScheme for XWater {
    fn name(&self) -> &'static str {
        "xwater"
    }

    fn propagate(&mut self, ctx: &mut StepContext<'_>) {
        let grid = ctx.grid;
        let m = ctx.mean_height;
        // Injected surface is the current state
        self.buffers[self.current].copy_from_slice(ctx.height);

        let (first, second) = self.buffers.split_at_mut(1);
        let (cur, prev) = if self.current == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        };
        for idx in grid.interior() {
            let [l, r, t, b] = grid.interior_neighbors(idx);
            let around = (cur[l] - m) + (cur[r] - m) + (cur[t] - m) + (cur[b] - m);
            prev[idx] = (around * 0.5 - (prev[idx] - m)) * ctx.damping + m;
        }
        self.swap();
        ctx.height.copy_from_slice(&self.buffers[self.current]);
    }

    fn reset(&mut self, _grid: &Grid, mean_height: f32, _height: &mut [f32]) {
        for buffer in &mut self.buffers {
            buffer.fill(mean_height);
        }
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SchemeConfig, WaterConfig};
    use crate::water::WaterSolver;
    use glam::Vec3;

    #[test]
    fn test_ring_expands_around_mean() {
        let config = WaterConfig::new(7.0, 7, 1.0)
            .with_scheme(SchemeConfig::XWater)
            .with_mean_height(2.0);
        let mut water = WaterSolver::new(&config).unwrap();
        water.disturb(Vec3::ZERO, 1.0);
        water.update(0.1);

        let grid = *water.grid();
        // The spike itself falls back, its neighbours rise by half of it
        assert!((water.surface(grid.idx(3, 3)) - 2.0).abs() < 1e-6);
        assert!((water.surface(grid.idx(3, 2)) - 2.5).abs() < 1e-6);
        assert_eq!(water.surface(0), 2.0);
    }

    #[test]
    fn test_buffers_flip() {
        let grid = Grid::new(5, 5.0).unwrap();
        let mut scheme = XWater::new(&grid, 0.0);
        assert_eq!(scheme.current, 0);
        scheme.swap();
        assert_eq!(scheme.current, 1);
        scheme.reset(&grid, 0.0, &mut []);
        assert_eq!(scheme.current, 0);
    }
}
