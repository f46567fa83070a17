//! Solid geometry that blocks or displaces water.
//!
//! Every obstacle reports, per grid column, the vertical interval occupied
//! by solid material. The water solver uses it two ways:
//! - **masking**: a cell whose water height lies strictly inside the
//!   interval is closed for this step (`obstacle_field = 0`);
//! - **flux blocking** (pipe model): flow towards a column whose interval
//!   contains the donor's surface is cut.
//!
//! Obstacles only ever close cells. Several obstacles compose additively and
//! in any order.

mod mesh;
mod terrain;
mod voxelized;

use serde::{Deserialize, Serialize};

pub use mesh::{bounds, cast_vertical_ray, TriangleMesh};
pub use terrain::TerrainObstacle;
pub use voxelized::VoxelizedObstacle;

use crate::grid::{Direction, Grid};
use crate::water::FluxField;

/// Solid span of one grid column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolidInterval {
    pub bottom: f32,
    pub top: f32,
}

impl SolidInterval {
    /// Strictly inside `(bottom, top)`.
    #[inline]
    pub fn contains(&self, height: f32) -> bool {
        self.bottom < height && height < self.top
    }
}

/// Which water height is compared against the solid interval.
///
/// `LiveHeight` follows the moving surface and reacts to waves but flickers
/// as the height oscillates around an interval bound. `MeanHeight` compares
/// against the rest height and is stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleHeightTest {
    LiveHeight,
    #[default]
    MeanHeight,
}

/// Per-frame obstacle contract: `update()` once, then query.
pub trait ObstacleSource {
    /// Grid the intervals are laid out on.
    fn grid(&self) -> &Grid;

    /// Recompute the per-column intervals for the current pose.
    fn update(&mut self);

    /// Solid interval of a column, `None` when the column is empty.
    fn interval(&self, idx: usize) -> Option<SolidInterval>;

    /// Whether the obstacle moves and can exchange forces with the water.
    fn is_dynamic(&self) -> bool;

    /// Close every cell whose tested height lies inside its interval.
    ///
    /// Never reopens a cell.
    fn update_obstacle_field(
        &self,
        surface: &[f32],
        mean_height: f32,
        test: ObstacleHeightTest,
        obstacle_field: &mut [f32],
    ) {
        for (idx, open) in obstacle_field.iter_mut().enumerate() {
            let Some(interval) = self.interval(idx) else {
                continue;
            };
            let height = match test {
                ObstacleHeightTest::LiveHeight => surface[idx],
                ObstacleHeightTest::MeanHeight => mean_height,
            };
            if interval.contains(height) {
                *open = 0.0;
            }
        }
    }

    /// Zero every flux that would carry water into a solid interval.
    fn update_flux(&self, surface: &[f32], flux: &mut FluxField) {
        let grid = *self.grid();
        for idx in 0..grid.cell_count() {
            for dir in Direction::ALL {
                let Some(neighbor) = grid.neighbor(idx, dir) else {
                    continue;
                };
                if let Some(interval) = self.interval(neighbor) {
                    if interval.contains(surface[idx]) {
                        flux.dir_mut(dir)[idx] = 0.0;
                    }
                }
            }
        }
    }
}

/// The obstacle kinds the solver knows about.
#[derive(Clone, Debug)]
pub enum Obstacle {
    Voxelized(VoxelizedObstacle),
    Terrain(TerrainObstacle),
}

impl Obstacle {
    pub fn as_voxelized_mut(&mut self) -> Option<&mut VoxelizedObstacle> {
        match self {
            Obstacle::Voxelized(v) => Some(v),
            Obstacle::Terrain(_) => None,
        }
    }

    pub fn as_terrain_mut(&mut self) -> Option<&mut TerrainObstacle> {
        match self {
            Obstacle::Terrain(t) => Some(t),
            Obstacle::Voxelized(_) => None,
        }
    }

    fn inner(&self) -> &dyn ObstacleSource {
        match self {
            Obstacle::Voxelized(v) => v,
            Obstacle::Terrain(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ObstacleSource {
        match self {
            Obstacle::Voxelized(v) => v,
            Obstacle::Terrain(t) => t,
        }
    }
}

impl From<VoxelizedObstacle> for Obstacle {
    fn from(value: VoxelizedObstacle) -> Self {
        Obstacle::Voxelized(value)
    }
}

impl From<TerrainObstacle> for Obstacle {
    fn from(value: TerrainObstacle) -> Self {
        Obstacle::Terrain(value)
    }
}

impl ObstacleSource for Obstacle {
    fn grid(&self) -> &Grid {
        self.inner().grid()
    }

    fn update(&mut self) {
        self.inner_mut().update()
    }

    fn interval(&self, idx: usize) -> Option<SolidInterval> {
        self.inner().interval(idx)
    }

    fn is_dynamic(&self) -> bool {
        self.inner().is_dynamic()
    }
}
