//! Neighbour-average wave scheme.
//!
//! Each cell accelerates towards the average of its four neighbours:
//! `v += avg - h; v *= damping; h += v`. Frame-rate dependent (`dt` is not
//! used) but unconditionally cheap.

use super::{neighbor_sum, IntegrationScheme, StepContext};
use crate::grid::Grid;

#[derive(Clone, Debug)]
pub struct MuellerHelloWorld {
    velocity: Vec<f32>,
    next: Vec<f32>,
}

impl MuellerHelloWorld {
    pub fn new(grid: &Grid) -> Self {
        let cells = grid.cell_count();
        Self {
            velocity: vec![0.0; cells],
            next: vec![0.0; cells],
        }
    }

    /// Vertical velocity per cell.
    pub fn velocity(&self) -> &[f32] {
        &self.velocity
    }
}

impl IntegrationScheme for MuellerHelloWorld {
    fn name(&self) -> &'static str {
        "mueller-hello-world"
    }

    fn propagate(&mut self, ctx: &mut StepContext<'_>) {
        let grid = ctx.grid;
        let height = &*ctx.height;
        for idx in grid.interior() {
            let avg = neighbor_sum(&grid, height, idx) * 0.25;
            let v = (self.velocity[idx] + avg - height[idx]) * ctx.damping;
            self.velocity[idx] = v;
            self.next[idx] = height[idx] + v;
        }
        std::mem::swap(ctx.height, &mut self.next);
    }

    fn reset(&mut self, _grid: &Grid, mean_height: f32, _height: &mut [f32]) {
        self.velocity.fill(0.0);
        self.next.fill(mean_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SchemeConfig, WaterConfig};
    use crate::water::WaterSolver;
    use glam::Vec3;

    #[test]
    fn test_spike_spreads_to_neighbours() {
        let config = WaterConfig::new(5.0, 5, 1.0).with_scheme(SchemeConfig::MuellerHelloWorld);
        let mut water = WaterSolver::new(&config).unwrap();
        water.disturb(Vec3::ZERO, 1.0);
        water.update(0.1);

        let grid = *water.grid();
        let centre = water.surface(grid.idx(2, 2));
        let west = water.surface(grid.idx(2, 1));
        assert!(centre.abs() < 1e-6);
        assert!((west - 0.25).abs() < 1e-6);
    }
}
