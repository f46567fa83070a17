//! Physical and numerical constants for the height-field solvers.
//!
//! ## Time step conventions
//!
//! The schemes are visual solvers, not CFD. Two things keep them bounded:
//!
//! 1. **Fixed or snapped `dt`** - iWave always steps with [`FIXED_DT`].
//! 2. **CFL-derived substeps** - `substeps = ceil(k * dt / max_dt)` where
//!    `max_dt = segment_size / horizontal_speed`. The factor `k` is
//!    [`GDC2008_CFL_FACTOR`] for the wave-equation scheme and
//!    [`PIPE_CFL_FACTOR`] for the pipe model.

/// Gravity acceleration magnitude (m/s^2)
pub const GRAVITY_MAGNITUDE: f32 = 9.81;

/// Density of water (kg/m³)
pub const WATER_DENSITY: f32 = 1000.0;

/// Frame time the delicate schemes are pinned to (s)
pub const FIXED_DT: f32 = 1.0 / 60.0;

// =============================================================================
// CFL SUBSTEPPING
// =============================================================================

/// Substep safety factor for the Mueller GDC2008 wave equation.
pub const GDC2008_CFL_FACTOR: f32 = 1.5;

/// Substep safety factor for the pipe model.
pub const PIPE_CFL_FACTOR: f32 = 5.0;

/// Horizontal speed the pipe model assumes when deriving its substeps (m/s).
pub const PIPE_MAX_HORIZONTAL_SPEED: f32 = 10.0;

// =============================================================================
// PIPE MODEL
// =============================================================================

/// Lowest water height a pipe-model cell may reach.
///
/// Slightly negative so that dry cells sit just under the terrain surface
/// instead of z-fighting with it.
pub const MIN_WATER_HEIGHT: f32 = -0.03;

/// Water depth under which reconstructed velocities are zeroed (wetting fronts).
pub const MIN_VELOCITY_DEPTH: f32 = 0.2;

// =============================================================================
// iWAVE KERNEL GENERATION
// =============================================================================

/// Wavenumber step of the kernel integral.
pub const IWAVE_DELTA_Q: f64 = 0.001;

/// Gaussian width of the kernel integrand.
pub const IWAVE_SIGMA: f64 = 1.0;

/// Number of integration samples.
pub const IWAVE_SAMPLES: usize = 10_000;
