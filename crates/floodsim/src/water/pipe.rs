//! Virtual-pipe shallow-water model.
//!
//! Every interior cell is connected to its four neighbours by pipes. Flux
//! through a pipe accelerates with the surface difference across it:
//!
//! ```text
//! f' = max(0, damping · f + dt · A · g · Δh / L)
//! ```
//!
//! Outflow is scaled down when it would drain more than the cell holds, then
//! the water height changes by net inflow. The border ring is a closed wall:
//! no pipe leads into or out of it, so interior volume is conserved.
//!
//! Water sits on a ground made of the terrain and the tops of static
//! obstacles; dynamic obstacles cut fluxes instead. At rest the column fills
//! the ground up to the mean height.
//!
//! Sources add or drain water. Disturbances only move it: the masked
//! disturbance is shifted to zero sum over the open cells and clipped so no
//! cell gives up more than it holds, so ripples and body feedback never
//! change the volume.

use super::{cfl_substeps, IntegrationScheme, StepContext};
use crate::config::PipeParams;
use crate::error::{Result, SimError};
use crate::grid::{Direction, Grid};
use crate::obstacle::{Obstacle, ObstacleSource};
use crate::reduce;

use std::collections::BTreeMap;

/// Outgoing flux of every cell, one array per direction (m³/s).
#[derive(Clone, Debug, PartialEq)]
pub struct FluxField {
    right: Vec<f32>,
    left: Vec<f32>,
    top: Vec<f32>,
    bottom: Vec<f32>,
}

impl FluxField {
    pub fn new(cells: usize) -> Self {
        Self {
            right: vec![0.0; cells],
            left: vec![0.0; cells],
            top: vec![0.0; cells],
            bottom: vec![0.0; cells],
        }
    }

    pub fn dir(&self, dir: Direction) -> &[f32] {
        match dir {
            Direction::Right => &self.right,
            Direction::Left => &self.left,
            Direction::Top => &self.top,
            Direction::Bottom => &self.bottom,
        }
    }

    pub fn dir_mut(&mut self, dir: Direction) -> &mut [f32] {
        match dir {
            Direction::Right => &mut self.right,
            Direction::Left => &mut self.left,
            Direction::Top => &mut self.top,
            Direction::Bottom => &mut self.bottom,
        }
    }

    /// Total outflow of a cell.
    #[inline]
    pub fn outflow(&self, idx: usize) -> f32 {
        self.right[idx] + self.left[idx] + self.top[idx] + self.bottom[idx]
    }

    pub fn fill(&mut self, value: f32) {
        for dir in Direction::ALL {
            self.dir_mut(dir).fill(value);
        }
    }

    fn scale(&mut self, idx: usize, k: f32) {
        self.right[idx] *= k;
        self.left[idx] *= k;
        self.top[idx] *= k;
        self.bottom[idx] *= k;
    }
}

#[derive(Clone, Debug)]
pub struct PipeModel {
    grid: Grid,
    params: PipeParams,
    terrain: Vec<f32>,
    /// Terrain raised to the top of static obstacles.
    ground: Vec<f32>,
    water: Vec<f32>,
    water_next: Vec<f32>,
    surface: Vec<f32>,
    flux: FluxField,
    flux_next: FluxField,
    velocity_x: Vec<f32>,
    velocity_z: Vec<f32>,
    /// Scratch for the volume-neutral disturbance.
    shift: Vec<f32>,
}

impl PipeModel {
    pub fn new(grid: &Grid, params: PipeParams) -> Result<Self> {
        let positive = |name: &str, v: f32| {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(SimError::config(format!(
                    "pipe {name} must be positive, got {v}"
                )))
            }
        };
        positive("gravity", params.gravity)?;
        positive("max horizontal speed", params.max_horizontal_speed)?;
        positive("CFL factor", params.cfl_factor)?;
        if let Some(length) = params.pipe_length {
            positive("length", length)?;
        }
        if let Some(area) = params.pipe_cross_section_area {
            positive("cross-section area", area)?;
        }

        let cells = grid.cell_count();
        Ok(Self {
            grid: *grid,
            params,
            terrain: vec![0.0; cells],
            ground: vec![0.0; cells],
            water: vec![0.0; cells],
            water_next: vec![0.0; cells],
            surface: vec![0.0; cells],
            flux: FluxField::new(cells),
            flux_next: FluxField::new(cells),
            velocity_x: vec![0.0; cells],
            velocity_z: vec![0.0; cells],
            shift: vec![0.0; cells],
        })
    }

    pub fn params(&self) -> &PipeParams {
        &self.params
    }

    pub(crate) fn set_terrain(&mut self, terrain: &[f32]) {
        self.terrain.copy_from_slice(terrain);
        self.ground.copy_from_slice(terrain);
    }

    pub fn terrain(&self) -> &[f32] {
        &self.terrain
    }

    /// Terrain raised to static obstacle tops, as of the last step.
    pub fn ground(&self) -> &[f32] {
        &self.ground
    }

    /// Water column height above the ground.
    pub fn water(&self) -> &[f32] {
        &self.water
    }

    pub fn flux(&self) -> &FluxField {
        &self.flux
    }

    pub fn velocity(&self) -> (&[f32], &[f32]) {
        (&self.velocity_x, &self.velocity_z)
    }

    /// Water held by the grid (m³). Border cells never hold any.
    pub fn total_volume(&self) -> f32 {
        reduce::sum(&self.water) * self.grid.cell_area()
    }

    pub fn pipe_length(&self) -> f32 {
        self.params
            .pipe_length
            .unwrap_or_else(|| self.grid.segment_size())
    }

    pub fn pipe_cross_section_area(&self) -> f32 {
        self.params
            .pipe_cross_section_area
            .unwrap_or_else(|| self.grid.cell_area())
    }

    fn update_ground(&mut self, obstacles: &BTreeMap<String, Obstacle>) {
        self.ground.copy_from_slice(&self.terrain);
        for obstacle in obstacles.values().filter(|o| !o.is_dynamic()) {
            for (idx, ground) in self.ground.iter_mut().enumerate() {
                if let Some(interval) = obstacle.interval(idx) {
                    if interval.top.is_finite() {
                        *ground = ground.max(interval.top);
                    }
                }
            }
        }
    }

    fn substep(&mut self, dt: f32, damping: f32, obstacles: &BTreeMap<String, Obstacle>) {
        let grid = self.grid;
        let seg = grid.segment_size();
        let area = grid.cell_area();
        let accel = dt * self.pipe_cross_section_area() * self.params.gravity / self.pipe_length();

        for ((s, &g), &w) in self.surface.iter_mut().zip(&self.ground).zip(&self.water) {
            *s = g + w;
        }

        // ===== Fluxes =====
        for idx in grid.interior() {
            for dir in Direction::ALL {
                let f = match grid.neighbor(idx, dir) {
                    Some(n) if !grid.is_border(n) => {
                        let dh = self.surface[idx] - self.surface[n];
                        (damping * self.flux.dir(dir)[idx] + accel * dh).max(0.0)
                    }
                    _ => 0.0,
                };
                self.flux_next.dir_mut(dir)[idx] = f;
            }
        }
        for obstacle in obstacles.values().filter(|o| o.is_dynamic()) {
            obstacle.update_flux(&self.surface, &mut self.flux_next);
        }

        // ===== Outflow limiting =====
        for idx in grid.interior() {
            let out = self.flux_next.outflow(idx) * dt;
            if out > 0.0 {
                let available = self.water[idx].max(0.0) * area;
                let k = (available / out).min(1.0);
                if k < 1.0 {
                    self.flux_next.scale(idx, k);
                }
            }
        }
        std::mem::swap(&mut self.flux, &mut self.flux_next);

        // ===== Heights and velocities =====
        let flux = &self.flux;
        for idx in grid.interior() {
            let [l, r, t, b] = grid.interior_neighbors(idx);
            let inflow = flux.right[l] + flux.left[r] + flux.bottom[t] + flux.top[b];
            let water = self.water[idx];
            let next = (water + dt * (inflow - flux.outflow(idx)) / area)
                .max(self.params.min_water_height);
            self.water_next[idx] = next;

            let depth = 0.5 * (water + next);
            if depth > 0.0 && depth >= self.params.min_velocity_depth {
                let through_x = 0.5 * ((flux.right[l] - flux.left[idx]) + (flux.right[idx] - flux.left[r]));
                let through_z =
                    0.5 * ((flux.bottom[t] - flux.top[idx]) + (flux.bottom[idx] - flux.top[b]));
                self.velocity_x[idx] = through_x / (seg * depth);
                self.velocity_z[idx] = through_z / (seg * depth);
            } else {
                self.velocity_x[idx] = 0.0;
                self.velocity_z[idx] = 0.0;
            }
        }
        std::mem::swap(&mut self.water, &mut self.water_next);
    }
}

impl IntegrationScheme for PipeModel {
    fn name(&self) -> &'static str {
        "pipe-model"
    }

    /// Sources are added as-is; disturbances move water between open cells.
    fn inject(&mut self, ctx: &mut StepContext<'_>) {
        let grid = ctx.grid;
        let min = self.params.min_water_height;
        for idx in grid.interior() {
            self.water[idx] = (self.water[idx] + ctx.source[idx]).max(min);
        }

        let (mut total, mut open) = (0.0f32, 0.0f32);
        for idx in grid.interior() {
            total += ctx.disturb[idx] * ctx.obstacle_field[idx];
            open += ctx.obstacle_field[idx];
        }
        if open <= 0.0 {
            return;
        }
        let mean = total / open;

        let (mut raise, mut lower) = (0.0f32, 0.0f32);
        for idx in grid.interior() {
            let d = ((ctx.disturb[idx] - mean) * ctx.obstacle_field[idx])
                .max(-self.water[idx].max(0.0));
            if d > 0.0 {
                raise += d;
            } else {
                lower -= d;
            }
            self.shift[idx] = d;
        }
        if raise <= 0.0 || lower <= 0.0 {
            return;
        }

        // Scale the larger side down so raised and lowered volumes match
        let (up, down) = if raise > lower {
            (lower / raise, 1.0)
        } else {
            (1.0, raise / lower)
        };
        for idx in grid.interior() {
            let d = self.shift[idx];
            self.water[idx] += if d > 0.0 { d * up } else { d * down };
        }
    }

    fn propagate(&mut self, ctx: &mut StepContext<'_>) {
        self.update_ground(ctx.obstacles);

        let seg = ctx.grid.segment_size();
        let (_, substeps) = cfl_substeps(
            ctx.dt,
            seg,
            self.params.max_horizontal_speed,
            self.params.cfl_factor,
        );
        let sub_dt = ctx.dt / substeps as f32;
        log::trace!("pipe model: {substeps} substeps of {sub_dt}");
        for _ in 0..substeps {
            self.substep(sub_dt, ctx.damping, ctx.obstacles);
        }

        for idx in ctx.grid.interior() {
            ctx.height[idx] = self.ground[idx] + self.water[idx];
        }
    }

    fn reset(&mut self, grid: &Grid, mean_height: f32, height: &mut [f32]) {
        self.water.fill(0.0);
        self.water_next.fill(0.0);
        self.flux.fill(0.0);
        self.flux_next.fill(0.0);
        self.velocity_x.fill(0.0);
        self.velocity_z.fill(0.0);
        self.ground.copy_from_slice(&self.terrain);
        for idx in grid.interior() {
            self.water[idx] = (mean_height - self.ground[idx]).max(0.0);
            height[idx] = self.ground[idx] + self.water[idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SchemeConfig, WaterConfig};
    use crate::grid::HeightField;
    use crate::obstacle::{TriangleMesh, VoxelizedObstacle};
    use crate::water::WaterSolver;
    use glam::{Mat4, Vec3};
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn pipe_solver(res: usize, size: f32) -> WaterSolver {
        let config = WaterConfig::new(size, res, 1.0)
            .with_scheme(SchemeConfig::PipeModel(PipeParams::default()));
        WaterSolver::new(&config).unwrap()
    }

    fn pipe_solver_at(res: usize, size: f32, mean: f32) -> WaterSolver {
        let config = WaterConfig::new(size, res, 1.0)
            .with_mean_height(mean)
            .with_scheme(SchemeConfig::PipeModel(PipeParams::default()));
        WaterSolver::new(&config).unwrap()
    }

    fn pipe(water: &WaterSolver) -> &PipeModel {
        water.scheme().as_pipe().unwrap()
    }

    #[test]
    fn test_column_spreads_and_conserves() {
        let mut water = pipe_solver(16, 16.0);
        water.source(Vec3::new(-3.0, 0.0, 0.0), 1.0, 2.0).unwrap();
        water.update(DT);
        let initial = water.total_water_volume().unwrap();
        assert!(initial > 0.0);

        for _ in 0..120 {
            water.update(DT);
        }
        let grid = *water.grid();
        let volume = water.total_water_volume().unwrap();
        assert!((volume - initial).abs() < initial * 1e-3);
        assert!(pipe(&water).water()[grid.idx(7, 12)] > 0.0);
        for idx in grid.border() {
            assert_eq!(pipe(&water).water()[idx], 0.0);
        }
    }

    #[test]
    fn test_flow_runs_downhill() {
        let mut water = pipe_solver(16, 16.0);
        water.source(Vec3::new(-3.0, 0.0, 0.0), 1.0, 2.0).unwrap();
        for _ in 0..5 {
            water.update(DT);
        }
        let grid = *water.grid();
        let (vx, _) = water.velocity().unwrap();
        // East rim of the column moves east
        let rim = grid.index(-1.5, 0.0).unwrap();
        assert!(vx[rim] > 0.0, "vx = {}", vx[rim]);
    }

    #[test]
    fn test_thin_film_has_no_velocity() {
        let mut water = pipe_solver(16, 16.0);
        water.source(Vec3::ZERO, 0.05, 3.0).unwrap();
        for _ in 0..10 {
            water.update(DT);
        }
        let (vx, vz) = water.velocity().unwrap();
        assert!(vx.iter().chain(vz).all(|&v| v == 0.0));
    }

    #[test]
    fn test_water_never_below_minimum() {
        let mut water = pipe_solver(8, 8.0);
        water.source(Vec3::ZERO, -5.0, 2.0).unwrap();
        water.update(DT);
        let min = PipeParams::default().min_water_height;
        assert!(pipe(&water).water().iter().all(|&w| w >= min));
    }

    #[test]
    fn test_dynamic_wall_blocks_flow() {
        let mut water = pipe_solver(8, 8.0);
        let grid = *water.grid();
        // Full-height wall over column 4
        let wall = VoxelizedObstacle::new(
            grid,
            TriangleMesh::cuboid(Vec3::new(0.4, 5.0, 4.0)),
            Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0)),
            true,
        );
        water.add_obstacle("wall", wall).unwrap();
        water.source(Vec3::new(-2.0, 0.0, 0.0), 1.0, 1.5).unwrap();
        for _ in 0..200 {
            water.update(DT);
        }
        for row in 1..7 {
            for col in 4..7 {
                assert_eq!(pipe(&water).water()[grid.idx(row, col)], 0.0);
            }
        }
    }

    #[test]
    fn test_static_obstacle_raises_ground() {
        let mut water = pipe_solver(8, 8.0);
        let grid = *water.grid();
        let block = VoxelizedObstacle::new(
            grid,
            TriangleMesh::cuboid(Vec3::new(0.4, 0.5, 0.4)),
            Mat4::from_translation(Vec3::new(0.5, 0.5, 0.5)),
            false,
        );
        water.add_obstacle("block", block).unwrap();
        water.update(DT);
        assert!((water.surface(grid.idx(4, 4)) - 1.0).abs() < 1e-5);
        assert_eq!(water.surface(grid.idx(2, 2)), 0.0);
    }

    #[test]
    fn test_terrain_sets_displayed_ground() {
        let mut water = pipe_solver(8, 8.0);
        let grid = *water.grid();
        let terrain = HeightField::new(grid, 2.0);
        water.set_terrain(&terrain).unwrap();
        assert_eq!(water.surface(grid.idx(3, 3)), 2.0);
        assert_eq!(water.surface(0), 0.0);

        let wrong = HeightField::new(Grid::new(4, 8.0).unwrap(), 2.0);
        assert!(water.set_terrain(&wrong).is_err());
    }

    #[test]
    fn test_rest_state_holds_mean_height() {
        let mut water = pipe_solver_at(8, 8.0, 0.7);
        let grid = *water.grid();
        assert!(water.heights().data.iter().all(|&h| h == 0.7));
        assert!((water.total_water_volume().unwrap() - 0.7 * 36.0).abs() < 1e-4);

        for _ in 0..100 {
            water.update(DT);
        }
        for idx in grid.interior() {
            assert_eq!(water.surface(idx), 0.7, "cell {} moved at rest", idx);
        }

        water.source(Vec3::ZERO, 1.0, 2.0).unwrap();
        for _ in 0..10 {
            water.update(DT);
        }
        water.reset();
        assert!(water.heights().data.iter().all(|&h| h == 0.7));
    }

    #[test]
    fn test_reset_leaves_high_ground_dry() {
        let mut water = pipe_solver_at(8, 8.0, 0.5);
        let grid = *water.grid();
        let mut terrain = HeightField::new(grid, 0.0);
        terrain.set(grid.idx(3, 3), 1.0);
        water.set_terrain(&terrain).unwrap();
        water.reset();

        assert_eq!(pipe(&water).water()[grid.idx(3, 3)], 0.0);
        assert_eq!(water.surface(grid.idx(3, 3)), 1.0);
        assert_eq!(water.surface(grid.idx(4, 4)), 0.5);
    }

    #[test]
    fn test_disturbance_moves_water_without_creating_it() {
        let mut water = pipe_solver_at(16, 16.0, 0.5);
        let initial = water.total_water_volume().unwrap();
        for step in 0..60 {
            let x = -4.0 + (step % 8) as f32;
            water.disturb_area(Vec3::new(x, 0.0, 1.0), 0.3, 2.0);
            water.disturb(Vec3::new(2.0, 0.0, -3.0), -0.4);
            water.update(DT);
        }
        let volume = water.total_water_volume().unwrap();
        assert!(
            (volume - initial).abs() < initial * 1e-4,
            "volume moved from {} to {}",
            initial,
            volume
        );

        // Nothing to push around in a dry basin
        let mut dry = pipe_solver(8, 8.0);
        dry.disturb(Vec3::ZERO, 1.0);
        dry.update(DT);
        assert_eq!(dry.total_water_volume().unwrap(), 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_outflow_never_exceeds_cell_volume(
            columns in prop::collection::vec(-0.03f32..3.0, 64),
            dt in 0.005f32..0.1,
        ) {
            let grid = Grid::new(8, 8.0).unwrap();
            let mut model = PipeModel::new(&grid, PipeParams::default()).unwrap();
            for idx in grid.interior() {
                model.water[idx] = columns[idx];
            }
            let area = grid.cell_area();
            let obstacles = BTreeMap::new();

            for _ in 0..4 {
                let before = model.water.clone();
                model.substep(dt, 1.0, &obstacles);
                for idx in grid.interior() {
                    let available = before[idx].max(0.0) * area;
                    let out = model.flux.outflow(idx) * dt;
                    prop_assert!(
                        out <= available + 1e-5 * (1.0 + available),
                        "cell {} sent {} but held {}",
                        idx,
                        out,
                        available
                    );
                }
                prop_assert!(model.water.iter().all(|w| w.is_finite()));
            }
        }
    }
}
