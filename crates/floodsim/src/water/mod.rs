//! Height-field water solver.
//!
//! [`WaterSolver`] owns the displayed water surface, the per-step transient
//! inputs (disturbances, sources, obstacle mask) and the obstacles that act
//! on it. The propagation itself is delegated to one of the [`Scheme`]s.
//!
//! One step runs in a fixed order:
//! 1. update every obstacle for its current pose;
//! 2. build the obstacle mask (1 = open, 0 = closed);
//! 3. inject disturbances and sources, masked by obstacles;
//! 4. propagate interior cells with the selected scheme;
//! 5. pin the border to the mean height;
//! 6. clear the transients.
//!
//! The border ring is a fixed boundary condition and never evolves.

mod gdc2008;
mod hello_world;
mod iwave;
mod kernel;
mod pipe;
mod xwater;

use std::collections::BTreeMap;

use glam::Vec3;

pub use gdc2008::{cfl_substeps, MuellerGdc2008};
pub use hello_world::MuellerHelloWorld;
pub use iwave::TessendorfIWave;
pub use kernel::{bessel_j0, KernelTable};
pub use pipe::{FluxField, PipeModel};
pub use xwater::XWater;

use crate::config::{SchemeConfig, WaterConfig};
use crate::error::{NameKind, Result, SimError};
use crate::grid::{pin_border, Grid, HeightField};
use crate::obstacle::{Obstacle, ObstacleHeightTest, ObstacleSource};
use crate::sculpt::Profile;

// =============================================================================
// SCHEME CONTRACT
// =============================================================================

/// Everything a scheme may read or write during one step.
///
/// `height` is the displayed surface; the transient slices are read-only and
/// cleared by the solver after the step.
pub struct StepContext<'a> {
    pub grid: Grid,
    pub dt: f32,
    pub damping: f32,
    pub mean_height: f32,
    pub height: &'a mut Vec<f32>,
    pub disturb: &'a [f32],
    pub source: &'a [f32],
    pub obstacle_field: &'a [f32],
    pub obstacles: &'a BTreeMap<String, Obstacle>,
}

/// One propagation rule over the height field.
pub trait IntegrationScheme {
    fn name(&self) -> &'static str;

    /// Add the transients to the surface.
    ///
    /// Disturbed heights are masked towards the mean height, so closed cells
    /// stay at rest.
    fn inject(&mut self, ctx: &mut StepContext<'_>) {
        let grid = ctx.grid;
        let mean = ctx.mean_height;
        for idx in grid.interior() {
            let h = ctx.height[idx] + ctx.disturb[idx];
            ctx.height[idx] = (h - mean) * ctx.obstacle_field[idx] + mean;
        }
    }

    /// Advance interior cells by `ctx.dt`.
    fn propagate(&mut self, ctx: &mut StepContext<'_>);

    fn step(&mut self, ctx: &mut StepContext<'_>) {
        self.inject(ctx);
        self.propagate(ctx);
        pin_border(&ctx.grid, ctx.height, ctx.mean_height);
    }

    /// Return to rest. `height` is the displayed surface, already filled
    /// with the mean height.
    fn reset(&mut self, grid: &Grid, mean_height: f32, height: &mut [f32]);
}

/// The integration schemes the solver can run.
#[derive(Clone, Debug)]
pub enum Scheme {
    MuellerHelloWorld(MuellerHelloWorld),
    MuellerGdc2008(MuellerGdc2008),
    XWater(XWater),
    TessendorfIWave(TessendorfIWave),
    PipeModel(PipeModel),
}

impl Scheme {
    pub fn from_config(config: &SchemeConfig, grid: &Grid, mean_height: f32) -> Result<Self> {
        let scheme = match config {
            SchemeConfig::MuellerHelloWorld => {
                Scheme::MuellerHelloWorld(MuellerHelloWorld::new(grid))
            }
            SchemeConfig::MuellerGdc2008 {
                horizontal_speed,
                cfl_factor,
            } => Scheme::MuellerGdc2008(MuellerGdc2008::new(grid, *horizontal_speed, *cfl_factor)?),
            SchemeConfig::XWater => Scheme::XWater(XWater::new(grid, mean_height)),
            SchemeConfig::TessendorfIWave { kernel, gravity } => {
                let kernel = KernelTable::from_source(kernel)?;
                Scheme::TessendorfIWave(TessendorfIWave::new(grid, kernel, *gravity))
            }
            SchemeConfig::PipeModel(params) => Scheme::PipeModel(PipeModel::new(grid, *params)?),
        };
        Ok(scheme)
    }

    pub fn as_pipe(&self) -> Option<&PipeModel> {
        match self {
            Scheme::PipeModel(pipe) => Some(pipe),
            _ => None,
        }
    }

    pub fn as_pipe_mut(&mut self) -> Option<&mut PipeModel> {
        match self {
            Scheme::PipeModel(pipe) => Some(pipe),
            _ => None,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn IntegrationScheme {
        match self {
            Scheme::MuellerHelloWorld(s) => s,
            Scheme::MuellerGdc2008(s) => s,
            Scheme::XWater(s) => s,
            Scheme::TessendorfIWave(s) => s,
            Scheme::PipeModel(s) => s,
        }
    }
}

impl IntegrationScheme for Scheme {
    fn name(&self) -> &'static str {
        match self {
            Scheme::MuellerHelloWorld(s) => s.name(),
            Scheme::MuellerGdc2008(s) => s.name(),
            Scheme::XWater(s) => s.name(),
            Scheme::TessendorfIWave(s) => s.name(),
            Scheme::PipeModel(s) => s.name(),
        }
    }

    fn inject(&mut self, ctx: &mut StepContext<'_>) {
        self.inner_mut().inject(ctx)
    }

    fn propagate(&mut self, ctx: &mut StepContext<'_>) {
        self.inner_mut().propagate(ctx)
    }

    fn reset(&mut self, grid: &Grid, mean_height: f32, height: &mut [f32]) {
        self.inner_mut().reset(grid, mean_height, height)
    }
}

/// Sum of the four direct neighbours of an interior cell.
#[inline]
pub(crate) fn neighbor_sum(grid: &Grid, data: &[f32], idx: usize) -> f32 {
    let [l, r, t, b] = grid.interior_neighbors(idx);
    data[l] + data[r] + data[t] + data[b]
}

// =============================================================================
// SOLVER
// =============================================================================

/// Water surface simulation on a square grid.
#[derive(Debug)]
pub struct WaterSolver {
    grid: Grid,
    damping: f32,
    mean_height: f32,
    multisteps: u32,
    obstacle_test: ObstacleHeightTest,

    heights: HeightField,
    disturb: Vec<f32>,
    source: Vec<f32>,
    obstacle_field: Vec<f32>,

    obstacles: BTreeMap<String, Obstacle>,
    scheme: Scheme,
}

impl WaterSolver {
    /// Build a solver, rejecting incomplete or out-of-range configuration.
    pub fn new(config: &WaterConfig) -> Result<Self> {
        let size = config
            .size
            .ok_or_else(|| SimError::config("water size is required"))?;
        let res = config
            .res
            .ok_or_else(|| SimError::config("water resolution is required"))?;
        let damping = config
            .damping_factor
            .ok_or_else(|| SimError::config("damping factor is required"))?;
        if !(damping > 0.0 && damping <= 1.0) {
            return Err(SimError::config(format!(
                "damping factor must be in (0, 1], got {damping}"
            )));
        }
        if config.multisteps == 0 {
            return Err(SimError::config("multisteps must be at least 1"));
        }
        if !config.mean_height.is_finite() {
            return Err(SimError::config("mean height must be finite"));
        }

        let grid = Grid::new(res, size)?;
        let cells = grid.cell_count();
        let mut heights = HeightField::new(grid, config.mean_height);
        let mut scheme = Scheme::from_config(&config.scheme, &grid, config.mean_height)?;
        scheme.reset(&grid, config.mean_height, &mut heights.data);

        log::info!(
            "water solver: {} on {}x{} cells, segment {:.3}",
            scheme.name(),
            res,
            res,
            grid.segment_size()
        );

        Ok(Self {
            grid,
            damping,
            mean_height: config.mean_height,
            multisteps: config.multisteps,
            obstacle_test: config.obstacle_test,
            heights,
            disturb: vec![0.0; cells],
            source: vec![0.0; cells],
            obstacle_field: vec![1.0; cells],
            obstacles: BTreeMap::new(),
            scheme,
        })
    }

    /// Advance the simulation by `dt` seconds, `multisteps` times.
    pub fn update(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            log::warn!("ignoring water update with dt = {dt}");
            return;
        }
        for _ in 0..self.multisteps {
            self.step(dt);
        }
    }

    fn step(&mut self, dt: f32) {
        for obstacle in self.obstacles.values_mut() {
            obstacle.update();
        }
        for obstacle in self.obstacles.values() {
            obstacle.update_obstacle_field(
                &self.heights.data,
                self.mean_height,
                self.obstacle_test,
                &mut self.obstacle_field,
            );
        }

        let mut ctx = StepContext {
            grid: self.grid,
            dt,
            damping: self.damping,
            mean_height: self.mean_height,
            height: &mut self.heights.data,
            disturb: &self.disturb,
            source: &self.source,
            obstacle_field: &self.obstacle_field,
            obstacles: &self.obstacles,
        };
        self.scheme.step(&mut ctx);

        self.clear_transients();

        if cfg!(debug_assertions) {
            if let Err(err) = self.check_finite() {
                log::error!("{err}");
            }
        }
    }

    fn clear_transients(&mut self) {
        self.disturb.fill(0.0);
        self.source.fill(0.0);
        self.obstacle_field.fill(1.0);
    }

    // ===== Inputs =====

    /// Push the surface at `position` (grid-local) by `amount` next step.
    ///
    /// Positions outside the grid are ignored.
    pub fn disturb(&mut self, position: Vec3, amount: f32) {
        match self.grid.index_of(position) {
            Some(idx) => self.disturb[idx] += amount,
            None => log::debug!("disturbance at {position} is outside the grid"),
        }
    }

    /// Disturb every cell within `radius` of `position`, cosine falloff.
    pub fn disturb_area(&mut self, position: Vec3, amount: f32, radius: f32) {
        for cell in self.grid.gather(position, radius) {
            self.disturb[cell.id] += amount * Profile::Cosine.modulate(cell.weight);
        }
    }

    /// Add a whole disturbance map, one value per cell.
    pub fn add_disturbance_map(&mut self, map: &[f32]) -> Result<()> {
        if map.len() != self.disturb.len() {
            return Err(SimError::config(format!(
                "disturbance map has {} values, grid has {}",
                map.len(),
                self.disturb.len()
            )));
        }
        for (d, &m) in self.disturb.iter_mut().zip(map) {
            *d += m;
        }
        Ok(())
    }

    /// Add `amount` of water height to every cell within `radius` of
    /// `position`. Negative amounts drain. Pipe model only.
    pub fn source(&mut self, position: Vec3, amount: f32, radius: f32) -> Result<()> {
        self.require_pipe("source")?;
        let cells = self.grid.gather(position, radius);
        if cells.is_empty() {
            if let Some(idx) = self.grid.index_of(position) {
                self.source[idx] += amount;
            }
            return Ok(());
        }
        for cell in cells {
            self.source[cell.id] += amount;
        }
        Ok(())
    }

    /// Spread `volume` evenly over the interior. Pipe model only.
    pub fn flood(&mut self, volume: f32) -> Result<()> {
        self.require_pipe("flood")?;
        let interior = (self.grid.res() - 2).pow(2) as f32;
        let height = volume / (interior * self.grid.cell_area());
        for idx in self.grid.interior() {
            self.source[idx] += height;
        }
        log::debug!("flooding {volume} m³ ({height} per cell)");
        Ok(())
    }

    /// Base height the pipe model flows over.
    ///
    /// Water columns are kept as they are; [`WaterSolver::reset`] refills
    /// the new ground up to the mean height.
    pub fn set_terrain(&mut self, terrain: &HeightField) -> Result<()> {
        if terrain.grid() != &self.grid {
            return Err(SimError::config("terrain grid does not match the water grid"));
        }
        let grid = self.grid;
        let pipe = self
            .scheme
            .as_pipe_mut()
            .ok_or_else(|| unsupported("set_terrain"))?;
        pipe.set_terrain(&terrain.data);
        for idx in grid.interior() {
            self.heights.data[idx] = pipe.terrain()[idx] + pipe.water()[idx];
        }
        Ok(())
    }

    fn require_pipe(&self, op: &str) -> Result<&PipeModel> {
        self.scheme.as_pipe().ok_or_else(|| unsupported(op))
    }

    // ===== Obstacles =====

    pub fn add_obstacle(&mut self, name: &str, obstacle: impl Into<Obstacle>) -> Result<()> {
        let obstacle = obstacle.into();
        if obstacle.grid() != &self.grid {
            return Err(SimError::config(format!(
                "obstacle '{name}' is not laid out on the water grid"
            )));
        }
        if self.obstacles.contains_key(name) {
            return Err(SimError::duplicate(NameKind::Obstacle, name));
        }
        log::debug!(
            "added {} obstacle '{}'",
            if obstacle.is_dynamic() { "dynamic" } else { "static" },
            name
        );
        self.obstacles.insert(name.to_string(), obstacle);
        Ok(())
    }

    pub fn remove_obstacle(&mut self, name: &str) -> Result<Obstacle> {
        self.obstacles
            .remove(name)
            .ok_or_else(|| SimError::not_found(NameKind::Obstacle, name))
    }

    pub fn obstacle(&self, name: &str) -> Result<&Obstacle> {
        self.obstacles
            .get(name)
            .ok_or_else(|| SimError::not_found(NameKind::Obstacle, name))
    }

    pub fn obstacle_mut(&mut self, name: &str) -> Result<&mut Obstacle> {
        self.obstacles
            .get_mut(name)
            .ok_or_else(|| SimError::not_found(NameKind::Obstacle, name))
    }

    pub fn obstacle_names(&self) -> impl Iterator<Item = &str> {
        self.obstacles.keys().map(String::as_str)
    }

    /// Bring the water back to rest. Obstacles and terrain are kept.
    pub fn reset(&mut self) {
        self.heights.fill(self.mean_height);
        self.scheme
            .reset(&self.grid, self.mean_height, &mut self.heights.data);
        self.clear_transients();
    }

    // ===== Queries =====

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn mean_height(&self) -> f32 {
        self.mean_height
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Displayed water surface.
    pub fn heights(&self) -> &HeightField {
        &self.heights
    }

    #[inline]
    pub fn surface(&self, idx: usize) -> f32 {
        self.heights.data[idx]
    }

    /// Horizontal velocity `(x, z)` per cell, pipe model only.
    pub fn velocity(&self) -> Option<(&[f32], &[f32])> {
        self.scheme.as_pipe().map(PipeModel::velocity)
    }

    /// Water volume held by the interior (m³). Pipe model only.
    pub fn total_water_volume(&self) -> Result<f32> {
        Ok(self.require_pipe("total_water_volume")?.total_volume())
    }

    /// Fail on the first non-finite surface height.
    pub fn check_finite(&self) -> Result<()> {
        match self.heights.data.iter().position(|h| !h.is_finite()) {
            Some(cell) => Err(SimError::NumericalInstability {
                cell,
                value: self.heights.data[cell],
            }),
            None => Ok(()),
        }
    }
}

fn unsupported(op: &str) -> SimError {
    SimError::UnsupportedOperation(format!("{op} requires the pipe model"))
}
