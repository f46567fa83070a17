//! iWave vertical-derivative convolution kernel.
//!
//! The kernel is radially symmetric, so only the quadrant `0 <= k, l <= r`
//! is stored. Coefficients come either from a JSON table or from the
//! discretised integral
//!
//! ```text
//! G0     = Σ q² e^(-σ q²)
//! G(k,l) = Σ q² e^(-σ q²) J0(q √(k² + l²)) / G0
//! ```
//!
//! with `q = n Δq` for `n = 1..=N`.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::KernelSource;
use crate::constants::{IWAVE_DELTA_Q, IWAVE_SAMPLES, IWAVE_SIGMA};
use crate::error::{Result, SimError};

/// Kernel radii with tabulated coefficients.
pub const SUPPORTED_RADII: [usize; 2] = [2, 6];

/// Bessel function of the first kind, order zero.
///
/// Polynomial approximation, absolute error below 5e-8 on `|x| <= 3` and
/// 1.6e-8 relative beyond.
pub fn bessel_j0(x: f64) -> f64 {
    let ax = x.abs();
    if ax <= 3.0 {
        let y = (x / 3.0).powi(2);
        1.0 + y
            * (-2.249_999_7
                + y * (1.265_620_8
                    + y * (-0.316_386_6 + y * (0.044_447_9 + y * (-0.003_944_4 + y * 0.000_210_0)))))
    } else {
        let y = 3.0 / ax;
        let f0 = 0.797_884_56
            + y * (-0.000_000_77
                + y * (-0.005_527_40
                    + y * (-0.000_095_12 + y * (0.001_372_37 + y * (-0.000_728_05 + y * 0.000_144_76)))));
        let t0 = ax - 0.785_398_16
            + y * (-0.041_663_97
                + y * (-0.000_039_54
                    + y * (0.002_625_73 + y * (-0.000_541_25 + y * (-0.000_293_33 + y * 0.000_135_58)))));
        f0 * t0.cos() / ax.sqrt()
    }
}

/// One quadrant of the iWave kernel.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelTable {
    radius: usize,
    /// Row-major `(radius + 1)²`, symmetric in `k` and `l`.
    coefficients: Vec<f32>,
}

impl KernelTable {
    /// Evaluate the kernel integral for every quadrant entry.
    pub fn generate(radius: usize) -> Result<Self> {
        check_radius(radius)?;
        let n = radius + 1;
        let mut coefficients = vec![0.0; n * n];
        let g0 = integrate(0.0);
        for k in 0..n {
            for l in k..n {
                let r = ((k * k + l * l) as f64).sqrt();
                let g = (integrate(r) / g0) as f32;
                coefficients[k * n + l] = g;
                coefficients[l * n + k] = g;
            }
        }
        log::debug!("generated iWave kernel of radius {radius}");
        Ok(Self {
            radius,
            coefficients,
        })
    }

    /// Parse a `{ "k": { "l": coefficient } }` table.
    ///
    /// Tables usually list `k < l` only; the mirrored entries are filled by
    /// symmetry and anything still missing (diagonal, centre) is generated.
    pub fn from_json_str(json: &str, radius: usize) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, f64>> = serde_json::from_str(json)?;
        let mut table = Self::generate(radius)?;
        let n = radius + 1;
        for (k, row) in &raw {
            let k = parse_offset(k, radius)?;
            for (l, &value) in row {
                let l = parse_offset(l, radius)?;
                table.coefficients[k * n + l] = value as f32;
                table.coefficients[l * n + k] = value as f32;
            }
        }
        Ok(table)
    }

    pub fn load_json(path: &Path, radius: usize) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let table = Self::from_json_str(&json, radius)?;
        log::info!("loaded iWave kernel from {}", path.display());
        Ok(table)
    }

    pub fn from_source(source: &KernelSource) -> Result<Self> {
        match source {
            KernelSource::Generated { radius } => Self::generate(*radius),
            KernelSource::File { radius, path } => Self::load_json(path, *radius),
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Coefficient at offset `(k, l)`; sign is irrelevant.
    #[inline]
    pub fn get(&self, k: isize, l: isize) -> f32 {
        let n = self.radius + 1;
        self.coefficients[k.unsigned_abs() * n + l.unsigned_abs()]
    }
}

fn check_radius(radius: usize) -> Result<()> {
    if SUPPORTED_RADII.contains(&radius) {
        Ok(())
    } else {
        Err(SimError::config(format!(
            "iWave kernel radius must be one of {SUPPORTED_RADII:?}, got {radius}"
        )))
    }
}

fn parse_offset(key: &str, radius: usize) -> Result<usize> {
    match key.trim().parse::<usize>() {
        Ok(v) if v <= radius => Ok(v),
        _ => Err(SimError::config(format!(
            "kernel offset '{key}' is outside radius {radius}"
        ))),
    }
}

fn integrate(r: f64) -> f64 {
    (1..=IWAVE_SAMPLES)
        .map(|n| {
            let q = n as f64 * IWAVE_DELTA_Q;
            q * q * (-IWAVE_SIGMA * q * q).exp() * bessel_j0(q * r)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bessel_j0_known_values() {
        assert!((bessel_j0(0.0) - 1.0).abs() < 1e-7);
        assert!((bessel_j0(1.0) - 0.765_197_7).abs() < 1e-6);
        assert!((bessel_j0(2.404_825_6)).abs() < 1e-6);
        assert!((bessel_j0(5.0) + 0.177_596_8).abs() < 1e-6);
        assert!((bessel_j0(-1.0) - bessel_j0(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_generated_kernel_is_normalised_and_symmetric() {
        let kernel = KernelTable::generate(2).unwrap();
        assert!((kernel.get(0, 0) - 1.0).abs() < 1e-6);
        assert!((kernel.get(0, 1) - 0.678_28).abs() < 1e-3);
        assert!((kernel.get(1, 1) - 0.444_56).abs() < 1e-3);
        assert!(kernel.get(2, 2) < 0.0);
        for k in -2..=2 {
            for l in -2..=2 {
                assert_eq!(kernel.get(k, l), kernel.get(l, k));
                assert_eq!(kernel.get(k, l), kernel.get(-k, l));
            }
        }
    }

    #[test]
    fn test_unsupported_radius() {
        assert!(matches!(
            KernelTable::generate(3),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn test_json_table_overrides_and_fills() {
        let json = r#"{ "0": { "1": 0.5, "2": 0.1 }, "1": { "2": 0.05 } }"#;
        let kernel = KernelTable::from_json_str(json, 2).unwrap();
        assert_eq!(kernel.get(0, 1), 0.5);
        assert_eq!(kernel.get(1, 0), 0.5);
        assert_eq!(kernel.get(2, 1), 0.05);
        // Diagonal comes from the generator
        assert!((kernel.get(0, 0) - 1.0).abs() < 1e-6);

        let out_of_range = r#"{ "0": { "5": 0.5 } }"#;
        assert!(KernelTable::from_json_str(out_of_range, 2).is_err());
    }
}
