//! Two-way exchange between the water surface and rigid bodies.
//!
//! Each dynamic body is voxelized onto the water grid. Per frame the manager
//! measures how much water the body displaces, turns that into buoyancy and
//! an impulse-style drag from the local flow, and reports the resulting
//! force to every listener. Frame-to-frame changes in displacement are
//! blurred and fed back to the solver as disturbance, which is what makes
//! moving bodies leave ripples.
//!
//! The manager never writes water state directly; its only output into the
//! solver is the disturbance map.

use std::collections::BTreeMap;

use glam::{Mat4, Vec3};

use crate::config::CouplingConfig;
use crate::error::{NameKind, Result, SimError};
use crate::grid::Grid;
use crate::obstacle::{ObstacleSource, SolidInterval, TriangleMesh, VoxelizedObstacle};
use crate::reduce;
use crate::water::WaterSolver;

type ForceListener = Box<dyn FnMut(&str, Vec3)>;

/// Coupling state of one dynamic body, recomputed every frame.
#[derive(Clone, Debug)]
pub struct BodyState {
    pub mass: f32,
    pub total_displaced_volume: f32,
    /// Footprint area on the grid (m²).
    pub total_area: f32,
    pub average_velocity_x: f32,
    pub average_velocity_z: f32,
    pub force: Vec3,
    displaced: Vec<f32>,
    previous: Vec<f32>,
    footprint: Vec<f32>,
    primed: bool,
}

impl BodyState {
    fn new(mass: f32, cells: usize) -> Self {
        Self {
            mass,
            total_displaced_volume: 0.0,
            total_area: 0.0,
            average_velocity_x: 0.0,
            average_velocity_z: 0.0,
            force: Vec3::ZERO,
            displaced: vec![0.0; cells],
            previous: vec![0.0; cells],
            footprint: vec![0.0; cells],
            primed: false,
        }
    }

    /// Displaced water height per cell, as of the last update.
    pub fn displaced(&self) -> &[f32] {
        &self.displaced
    }
}

/// Submerged height of a solid column against a water surface.
///
/// Above the water nothing is displaced, fully below the whole column is,
/// and a straddling column displaces the part under the surface.
pub fn displaced_height(interval: SolidInterval, surface: f32) -> f32 {
    if interval.bottom >= surface {
        0.0
    } else if interval.top <= surface {
        interval.top - interval.bottom
    } else {
        surface - interval.bottom
    }
}

/// 3x3 box average; the border ring is passed through.
pub fn box_blur(grid: &Grid, input: &[f32]) -> Vec<f32> {
    let res = grid.res();
    let mut output = input.to_vec();
    for idx in grid.interior() {
        let (row, col) = grid.row_col(idx);
        let mut sum = 0.0;
        for r in row - 1..=row + 1 {
            for c in col - 1..=col + 1 {
                sum += input[r * res + c];
            }
        }
        output[idx] = sum / 9.0;
    }
    output
}

/// Registers bodies as obstacles on a [`WaterSolver`] and couples them.
pub struct CouplingManager {
    config: CouplingConfig,
    bodies: BTreeMap<String, BodyState>,
    listeners: Vec<ForceListener>,
}

impl std::fmt::Debug for CouplingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouplingManager")
            .field("config", &self.config)
            .field("bodies", &self.bodies)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl CouplingManager {
    pub fn new(config: CouplingConfig) -> Self {
        Self {
            config,
            bodies: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &CouplingConfig {
        &self.config
    }

    /// Block the water with a mesh that never moves and exerts nothing.
    pub fn add_static_obstacle(
        &mut self,
        water: &mut WaterSolver,
        name: &str,
        mesh: TriangleMesh,
    ) -> Result<()> {
        let obstacle = VoxelizedObstacle::new(*water.grid(), mesh, Mat4::IDENTITY, false);
        water.add_obstacle(name, obstacle)
    }

    /// Add a body of `mass` kg that both blocks and feels the water.
    pub fn add_dynamic_obstacle(
        &mut self,
        water: &mut WaterSolver,
        name: &str,
        mesh: TriangleMesh,
        mass: f32,
    ) -> Result<()> {
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(SimError::config(format!(
                "body '{name}' needs a positive mass, got {mass}"
            )));
        }
        if self.bodies.contains_key(name) {
            return Err(SimError::duplicate(NameKind::Body, name));
        }
        let grid = *water.grid();
        let obstacle = VoxelizedObstacle::new(grid, mesh, Mat4::IDENTITY, true);
        water.add_obstacle(name, obstacle)?;
        self.bodies
            .insert(name.to_string(), BodyState::new(mass, grid.cell_count()));
        log::debug!("coupling body '{name}' ({mass} kg)");
        Ok(())
    }

    /// Remove a static or dynamic obstacle added through the manager.
    pub fn remove(&mut self, water: &mut WaterSolver, name: &str) -> Result<()> {
        water.remove_obstacle(name)?;
        self.bodies.remove(name);
        Ok(())
    }

    /// Move a body (grid-local space).
    pub fn set_transform(&mut self, water: &mut WaterSolver, name: &str, transform: Mat4) -> Result<()> {
        water
            .obstacle_mut(name)?
            .as_voxelized_mut()
            .ok_or_else(|| SimError::config(format!("obstacle '{name}' is not a mesh")))?
            .set_transform(transform);
        Ok(())
    }

    /// Called with `(body, force)` every time a body's force is computed.
    pub fn add_exert_force_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&str, Vec3) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self, name: &str) -> Result<&BodyState> {
        self.bodies
            .get(name)
            .ok_or_else(|| SimError::not_found(NameKind::Body, name))
    }

    pub fn body_names(&self) -> impl Iterator<Item = &str> {
        self.bodies.keys().map(String::as_str)
    }

    /// Compute forces for every body against the current surface, notify
    /// listeners and queue the displacement feedback for the next step.
    pub fn update(&mut self, water: &mut WaterSolver, dt: f32) -> Result<()> {
        if !(dt.is_finite() && dt > 0.0) {
            log::warn!("ignoring coupling update with dt = {dt}");
            return Ok(());
        }
        let grid = *water.grid();
        let cell_area = grid.cell_area();
        let CouplingConfig {
            water_density,
            gravity,
            disturb_scale,
            blur_passes,
        } = self.config;

        let mut feedback = vec![0.0; grid.cell_count()];
        let mut moved = false;

        for (name, body) in self.bodies.iter_mut() {
            water.obstacle_mut(name)?.update();
            let obstacle = water.obstacle(name)?;
            let surface = &water.heights().data;

            for idx in 0..grid.cell_count() {
                let (displaced, inside) = match obstacle.interval(idx) {
                    Some(interval) => (displaced_height(interval, surface[idx]), 1.0),
                    None => (0.0, 0.0),
                };
                body.displaced[idx] = displaced;
                body.footprint[idx] = inside;
            }

            let cells = reduce::count_where(&body.footprint, |m| m > 0.0);
            body.total_displaced_volume = reduce::sum(&body.displaced) * cell_area;
            body.total_area = cells as f32 * cell_area;
            (body.average_velocity_x, body.average_velocity_z) = match water.velocity() {
                Some((vx, vz)) if cells > 0 => (
                    reduce::masked_sum(vx, &body.footprint) / cells as f32,
                    reduce::masked_sum(vz, &body.footprint) / cells as f32,
                ),
                _ => (0.0, 0.0),
            };
            body.force = Vec3::new(
                body.average_velocity_x / dt * body.mass,
                body.total_displaced_volume * water_density * gravity,
                body.average_velocity_z / dt * body.mass,
            );

            if body.primed {
                for ((f, &curr), &prev) in feedback.iter_mut().zip(&body.displaced).zip(&body.previous) {
                    *f += curr - prev;
                }
                moved |= body.displaced != body.previous;
            }
            body.previous.copy_from_slice(&body.displaced);
            body.primed = true;

            log::trace!(
                "body '{}': displaced {:.4} m³, force {}",
                name,
                body.total_displaced_volume,
                body.force
            );
        }

        for (name, body) in &self.bodies {
            for listener in &mut self.listeners {
                listener(name, body.force);
            }
        }

        if moved {
            for _ in 0..blur_passes {
                feedback = box_blur(&grid, &feedback);
            }
            for f in &mut feedback {
                *f *= disturb_scale;
            }
            water.add_disturbance_map(&feedback)?;
        }
        Ok(())
    }
}
