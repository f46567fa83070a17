//! Obstacle backed by a terrain height field.

use super::{ObstacleSource, SolidInterval};
use crate::error::{Result, SimError};
use crate::grid::{Grid, HeightField};

/// Everything below the terrain surface is solid.
#[derive(Clone, Debug)]
pub struct TerrainObstacle {
    terrain: HeightField,
    intervals: Vec<Option<SolidInterval>>,
}

impl TerrainObstacle {
    pub fn new(terrain: HeightField) -> Self {
        let cells = terrain.grid().cell_count();
        Self {
            terrain,
            intervals: vec![None; cells],
        }
    }

    /// Copy the latest terrain heights, e.g. after a sculpt stroke.
    pub fn sync_from(&mut self, heights: &HeightField) -> Result<()> {
        if heights.grid() != self.terrain.grid() {
            return Err(SimError::config(
                "terrain obstacle grid does not match the source height field",
            ));
        }
        self.terrain.data.copy_from_slice(&heights.data);
        Ok(())
    }

    pub fn terrain(&self) -> &HeightField {
        &self.terrain
    }
}

impl ObstacleSource for TerrainObstacle {
    fn grid(&self) -> &Grid {
        self.terrain.grid()
    }

    fn update(&mut self) {
        for (interval, &top) in self.intervals.iter_mut().zip(&self.terrain.data) {
            *interval = Some(SolidInterval {
                bottom: f32::NEG_INFINITY,
                top,
            });
        }
    }

    fn interval(&self, idx: usize) -> Option<SolidInterval> {
        self.intervals[idx]
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}
