//! Tessendorf's iWave: convolution-based vertical derivative.
//!
//! Works on the surface relative to the mean height so that the pinned
//! border and everything outside the grid read as zero:
//!
//! ```text
//! h' = (h (2 - α dt) - h_prev - g dt² (G * h)) / (1 + α dt)
//! ```
//!
//! The step is pinned to [`FIXED_DT`] whatever the caller asks for.

use super::{IntegrationScheme, KernelTable, StepContext};
use crate::constants::FIXED_DT;
use crate::grid::Grid;

#[derive(Clone, Debug)]
pub struct TessendorfIWave {
    kernel: KernelTable,
    gravity: f32,
    /// Previous surface, relative to the mean.
    prev: Vec<f32>,
    centered: Vec<f32>,
    next: Vec<f32>,
}

impl TessendorfIWave {
    pub fn new(grid: &Grid, kernel: KernelTable, gravity: f32) -> Self {
        let cells = grid.cell_count();
        Self {
            kernel,
            gravity,
            prev: vec![0.0; cells],
            centered: vec![0.0; cells],
            next: vec![0.0; cells],
        }
    }

    pub fn kernel(&self) -> &KernelTable {
        &self.kernel
    }

    /// The kernel is built up front, so the scheme can always step.
    pub fn is_ready(&self) -> bool {
        true
    }

    /// `(G * h)` at `(row, col)`, summing the four reflections of each
    /// quadrant entry.
    fn vertical_derivative(&self, grid: &Grid, row: usize, col: usize) -> f32 {
        let r = self.kernel.radius() as isize;
        let res = grid.res() as isize;
        let sample = |dr: isize, dc: isize| -> f32 {
            let rr = row as isize + dr;
            let cc = col as isize + dc;
            if rr < 0 || cc < 0 || rr >= res || cc >= res {
                0.0
            } else {
                self.centered[grid.idx(rr as usize, cc as usize)]
            }
        };

        let mut sum = 0.0;
        for k in 0..=r {
            for l in 0..=r {
                let g = self.kernel.get(k, l);
                let taps = match (k, l) {
                    (0, 0) => sample(0, 0),
                    (0, _) => sample(0, l) + sample(0, -l),
                    (_, 0) => sample(k, 0) + sample(-k, 0),
                    _ => sample(k, l) + sample(-k, l) + sample(k, -l) + sample(-k, -l),
                };
                sum += g * taps;
            }
        }
        sum
    }
}

impl IntegrationScheme for TessendorfIWave {
    fn name(&self) -> &'static str {
        "tessendorf-iwave"
    }

    fn propagate(&mut self, ctx: &mut StepContext<'_>) {
        let grid = ctx.grid;
        let m = ctx.mean_height;
        let dt = FIXED_DT;
        let alpha_dt = ctx.damping * dt;
        let g_dt2 = self.gravity * dt * dt;

        for (c, &h) in self.centered.iter_mut().zip(ctx.height.iter()) {
            *c = h - m;
        }
        for idx in grid.interior() {
            let (row, col) = grid.row_col(idx);
            let vd = self.vertical_derivative(&grid, row, col);
            let h = self.centered[idx];
            let h_new = (h * (2.0 - alpha_dt) - self.prev[idx] - g_dt2 * vd) / (1.0 + alpha_dt);
            self.next[idx] = h_new + m;
        }
        std::mem::swap(&mut self.prev, &mut self.centered);
        std::mem::swap(ctx.height, &mut self.next);
    }

    fn reset(&mut self, _grid: &Grid, mean_height: f32, _height: &mut [f32]) {
        self.prev.fill(0.0);
        self.centered.fill(0.0);
        self.next.fill(mean_height);
    }
}
