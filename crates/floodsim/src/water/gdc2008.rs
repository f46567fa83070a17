//! Explicit 2D wave equation with CFL substepping.
//!
//! `v += c² (Σ₄h - 4h) / seg² · dt; v *= damping; h += v · dt`, run
//! `substeps` times per step so that the wave never crosses more than a
//! fraction of a cell per substep.

use super::{neighbor_sum, IntegrationScheme, StepContext};
use crate::error::{Result, SimError};
use crate::grid::Grid;

/// Largest stable step and the substep count for a step of `dt`.
///
/// `max_dt = segment_size / speed`, `substeps = ceil(k · dt / max_dt)`,
/// never fewer than one.
pub fn cfl_substeps(dt: f32, segment_size: f32, speed: f32, k: f32) -> (f32, u32) {
    let max_dt = segment_size / speed;
    let substeps = (k * dt / max_dt).ceil();
    let substeps = if substeps.is_finite() && substeps >= 1.0 {
        substeps as u32
    } else {
        1
    };
    (max_dt, substeps)
}

#[derive(Clone, Debug)]
pub struct MuellerGdc2008 {
    horizontal_speed: f32,
    cfl_factor: f32,
    velocity: Vec<f32>,
    next: Vec<f32>,
}

impl MuellerGdc2008 {
    pub fn new(grid: &Grid, horizontal_speed: f32, cfl_factor: f32) -> Result<Self> {
        if !(horizontal_speed > 0.0 && horizontal_speed.is_finite()) {
            return Err(SimError::config(format!(
                "horizontal speed must be positive, got {horizontal_speed}"
            )));
        }
        if !(cfl_factor >= 1.0) {
            return Err(SimError::config(format!(
                "CFL factor must be at least 1, got {cfl_factor}"
            )));
        }
        let cells = grid.cell_count();
        Ok(Self {
            horizontal_speed,
            cfl_factor,
            velocity: vec![0.0; cells],
            next: vec![0.0; cells],
        })
    }

    pub fn horizontal_speed(&self) -> f32 {
        self.horizontal_speed
    }

    pub fn velocity(&self) -> &[f32] {
        &self.velocity
    }

    fn substep(&mut self, ctx: &mut StepContext<'_>, dt: f32) {
        let grid = ctx.grid;
        let seg = grid.segment_size();
        let c2 = self.horizontal_speed * self.horizontal_speed / (seg * seg);
        let height = &*ctx.height;
        for idx in grid.interior() {
            let laplacian = neighbor_sum(&grid, height, idx) - 4.0 * height[idx];
            let v = (self.velocity[idx] + c2 * laplacian * dt) * ctx.damping;
            self.velocity[idx] = v;
            self.next[idx] = height[idx] + v * dt;
        }
        std::mem::swap(ctx.height, &mut self.next);
    }
}

impl IntegrationScheme for MuellerGdc2008 {
    fn name(&self) -> &'static str {
        "mueller-gdc2008"
    }

    fn propagate(&mut self, ctx: &mut StepContext<'_>) {
        let seg = ctx.grid.segment_size();
        let (_, substeps) = cfl_substeps(ctx.dt, seg, self.horizontal_speed, self.cfl_factor);
        let sub_dt = ctx.dt / substeps as f32;
        log::trace!("gdc2008: {substeps} substeps of {sub_dt}");
        for _ in 0..substeps {
            self.substep(ctx, sub_dt);
        }
    }

    fn reset(&mut self, _grid: &Grid, mean_height: f32, _height: &mut [f32]) {
        self.velocity.fill(0.0);
        self.next.fill(mean_height);
    }
}
