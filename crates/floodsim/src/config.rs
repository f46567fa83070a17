//! Serializable configuration for the solver, the sculpt brush and coupling.
//!
//! Required water parameters (`size`, `res`, `damping_factor`) are `Option`s:
//! a config file that omits them still parses, and
//! [`WaterSolver::new`](crate::water::WaterSolver::new) reports the gap as a
//! configuration error instead of inventing a default.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::constants::{
    GDC2008_CFL_FACTOR, GRAVITY_MAGNITUDE, MIN_VELOCITY_DEPTH, MIN_WATER_HEIGHT,
    PIPE_CFL_FACTOR, PIPE_MAX_HORIZONTAL_SPEED, WATER_DENSITY,
};
use crate::error::Result;
use crate::obstacle::ObstacleHeightTest;
use crate::sculpt::Profile;

/// Where the iWave convolution kernel comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum KernelSource {
    /// Evaluate the kernel integral at start-up.
    Generated { radius: usize },
    /// Read a `{ k: { l: coefficient } }` JSON table.
    File { radius: usize, path: PathBuf },
}

impl Default for KernelSource {
    fn default() -> Self {
        KernelSource::Generated { radius: 2 }
    }
}

/// Pipe-model shallow-water parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeParams {
    /// Gravity (m/s^2).
    pub gravity: f32,
    /// Virtual pipe length; `None` uses the segment size.
    pub pipe_length: Option<f32>,
    /// Virtual pipe cross-section; `None` uses the segment size squared.
    pub pipe_cross_section_area: Option<f32>,
    /// Lowest water height a cell may reach.
    pub min_water_height: f32,
    /// Speed assumed when deriving CFL substeps (m/s).
    pub max_horizontal_speed: f32,
    /// Substep safety factor.
    pub cfl_factor: f32,
    /// Average depth under which velocities are zeroed.
    pub min_velocity_depth: f32,
}

impl Default for PipeParams {
    fn default() -> Self {
        Self {
            gravity: GRAVITY_MAGNITUDE,
            pipe_length: None,
            pipe_cross_section_area: None,
            min_water_height: MIN_WATER_HEIGHT,
            max_horizontal_speed: PIPE_MAX_HORIZONTAL_SPEED,
            cfl_factor: PIPE_CFL_FACTOR,
            min_velocity_depth: MIN_VELOCITY_DEPTH,
        }
    }
}

/// Integration scheme selection and its scheme-specific parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemeConfig {
    #[default]
    MuellerHelloWorld,
    MuellerGdc2008 {
        horizontal_speed: f32,
        #[serde(default = "default_gdc_cfl")]
        cfl_factor: f32,
    },
    #[serde(rename = "xwater")]
    XWater,
    #[serde(rename = "iwave")]
    TessendorfIWave {
        #[serde(default)]
        kernel: KernelSource,
        #[serde(default = "default_gravity")]
        gravity: f32,
    },
    PipeModel(PipeParams),
}

fn default_gdc_cfl() -> f32 {
    GDC2008_CFL_FACTOR
}

fn default_gravity() -> f32 {
    GRAVITY_MAGNITUDE
}

/// Water solver configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    /// Edge length of the square domain (required).
    pub size: Option<f32>,
    /// Cells per side (required).
    pub res: Option<usize>,
    /// Per-step velocity damping in `(0, 1]` (required).
    pub damping_factor: Option<f32>,
    /// Rest height of the water surface.
    pub mean_height: f32,
    /// Repetitions of the whole step per `update` call.
    pub multisteps: u32,
    /// Height compared against obstacle intervals.
    pub obstacle_test: ObstacleHeightTest,
    pub scheme: SchemeConfig,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            size: None,
            res: None,
            damping_factor: None,
            mean_height: 0.0,
            multisteps: 1,
            obstacle_test: ObstacleHeightTest::default(),
            scheme: SchemeConfig::default(),
        }
    }
}

impl WaterConfig {
    /// Config with the three required parameters set.
    pub fn new(size: f32, res: usize, damping_factor: f32) -> Self {
        Self {
            size: Some(size),
            res: Some(res),
            damping_factor: Some(damping_factor),
            ..Default::default()
        }
    }

    pub fn with_scheme(mut self, scheme: SchemeConfig) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_mean_height(mut self, mean_height: f32) -> Self {
        self.mean_height = mean_height;
        self
    }

    pub fn with_multisteps(mut self, multisteps: u32) -> Self {
        self.multisteps = multisteps;
        self
    }

    pub fn with_obstacle_test(mut self, test: ObstacleHeightTest) -> Self {
        self.obstacle_test = test;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        from_json_str(json)
    }

    /// Load configuration from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        load_json(path)
    }

    /// Save configuration to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }
}

/// Fluid/object coupling parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingConfig {
    /// kg/m³
    pub water_density: f32,
    /// m/s^2
    pub gravity: f32,
    /// Scale of the displaced-height delta fed back as disturbance.
    pub disturb_scale: f32,
    /// 3x3 box-blur passes applied to the feedback map.
    pub blur_passes: u32,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            water_density: WATER_DENSITY,
            gravity: GRAVITY_MAGNITUDE,
            disturb_scale: 1.0,
            blur_passes: 1,
        }
    }
}

impl CouplingConfig {
    pub fn load_json(path: &Path) -> Result<Self> {
        load_json(path)
    }
}

/// Sculpt brush settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SculptConfig {
    /// Brush diameter in world units.
    pub brush_size: f32,
    pub brush_amount: f32,
    pub profile: Profile,
}

impl Default for SculptConfig {
    fn default() -> Self {
        Self {
            brush_size: 1.0,
            brush_amount: 0.1,
            profile: Profile::Cosine,
        }
    }
}

impl SculptConfig {
    pub fn load_json(path: &Path) -> Result<Self> {
        load_json(path)
    }
}

fn from_json_str<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)?;
    from_json_str(&json)
}

fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_fields_parse_as_none() {
        let config = WaterConfig::from_json_str(r#"{ "size": 16.0 }"#).unwrap();
        assert_eq!(config.size, Some(16.0));
        assert_eq!(config.res, None);
        assert_eq!(config.damping_factor, None);
        assert_eq!(config.multisteps, 1);
    }

    #[test]
    fn test_scheme_tagged_json() {
        let json = r#"{
            "size": 32.0, "res": 32, "damping_factor": 0.99,
            "scheme": { "kind": "mueller_gdc2008", "horizontal_speed": 2.0 }
        }"#;
        let config = WaterConfig::from_json_str(json).unwrap();
        assert_eq!(
            config.scheme,
            SchemeConfig::MuellerGdc2008 {
                horizontal_speed: 2.0,
                cfl_factor: GDC2008_CFL_FACTOR
            }
        );
    }

    #[test]
    fn test_pipe_and_iwave_defaults() {
        let pipe: SchemeConfig = serde_json::from_str(r#"{ "kind": "pipe_model" }"#).unwrap();
        assert_eq!(pipe, SchemeConfig::PipeModel(PipeParams::default()));

        let iwave: SchemeConfig =
            serde_json::from_str(r#"{ "kind": "iwave" }"#).unwrap();
        assert_eq!(
            iwave,
            SchemeConfig::TessendorfIWave {
                kernel: KernelSource::Generated { radius: 2 },
                gravity: GRAVITY_MAGNITUDE
            }
        );
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = WaterConfig::new(8.0, 16, 0.95)
            .with_scheme(SchemeConfig::TessendorfIWave {
                kernel: KernelSource::File {
                    radius: 6,
                    path: PathBuf::from("kernels/iwave_6.json"),
                },
                gravity: 9.0,
            })
            .with_multisteps(3);
        let json = serde_json::to_string(&config).unwrap();
        let loaded = WaterConfig::from_json_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_bad_json_is_reported() {
        assert!(matches!(
            WaterConfig::from_json_str("{ size: }"),
            Err(crate::SimError::Json(_))
        ));
    }
}
