//! Height-field flood simulation
//!
//! A 2D water surface evolved over a square grid, with sculptable terrain
//! underneath and rigid bodies floating in it.
//!
//! - [`sculpt`]: layered terrain editing with brushes, image and noise input
//! - [`water`]: the solver and its five integration schemes
//! - [`obstacle`]: solid geometry that masks cells and blocks flux
//! - [`coupling`]: buoyancy and drag on bodies, ripples back into the water
//!
//! # Example
//!
//! ```
//! use floodsim::{SchemeConfig, Vec3, WaterConfig, WaterSolver};
//!
//! let config = WaterConfig::new(16.0, 32, 0.99).with_scheme(SchemeConfig::MuellerHelloWorld);
//! let mut water = WaterSolver::new(&config).unwrap();
//!
//! water.disturb(Vec3::ZERO, 0.5);
//! for _ in 0..10 {
//!     water.update(1.0 / 60.0);
//! }
//! assert!(water.check_finite().is_ok());
//! ```

pub mod config;
pub mod constants;
pub mod coupling;
pub mod error;
pub mod grid;
pub mod obstacle;
pub mod reduce;
pub mod sculpt;
pub mod water;

pub use config::{CouplingConfig, KernelSource, PipeParams, SchemeConfig, SculptConfig, WaterConfig};
pub use coupling::{BodyState, CouplingManager};
pub use error::{NameKind, Result, SimError};
pub use glam::{Mat4, Vec3};
pub use grid::{AffectedCell, Direction, Grid, HeightField};
pub use obstacle::{
    Obstacle, ObstacleHeightTest, ObstacleSource, SolidInterval, TerrainObstacle, TriangleMesh,
    VoxelizedObstacle,
};
pub use sculpt::{Brush, DisplacementChange, Profile, SculptEngine, SculptLayer, SculptMesh};
pub use water::{IntegrationScheme, KernelTable, Scheme, WaterSolver};
