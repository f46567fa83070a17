//! Physics tests for the pipe-model flood solver
//!
//! These tests verify that the pipe model behaves like water in a closed basin:
//! 1. A flood is conserved to within 1% over many steps
//! 2. Water on a slope gathers at the bottom
//! 3. Sinks never drive the water column below its floor
//! 4. Random sources never break the volume bookkeeping

use floodsim::{HeightField, PipeParams, SchemeConfig, Vec3, WaterConfig, WaterSolver};
use proptest::prelude::*;

const DT: f32 = 1.0 / 60.0;

/// Helper to create a pipe-model solver
fn create_pipe(res: usize, size: f32) -> WaterSolver {
    let config = WaterConfig::new(size, res, 0.995)
        .with_scheme(SchemeConfig::PipeModel(PipeParams::default()));
    WaterSolver::new(&config).expect("valid config")
}

/// Helper to set a terrain ramp falling along +X
fn set_ramp(water: &mut WaterSolver, drop: f32) {
    let grid = *water.grid();
    let res = grid.res();
    let mut terrain = HeightField::new(grid, 0.0);
    for row in 0..res {
        for col in 0..res {
            let t = col as f32 / (res - 1) as f32;
            terrain.set(grid.idx(row, col), drop * (1.0 - t));
        }
    }
    water.set_terrain(&terrain).expect("matching grid");
}

/// Water column heights of the pipe model
fn water_columns(water: &WaterSolver) -> Vec<f32> {
    water
        .scheme()
        .as_pipe()
        .expect("pipe model")
        .water()
        .to_vec()
}

// =============================================================================
// TEST 1: FLOOD CONSERVATION
// A flood over flat ground keeps its volume
// =============================================================================

#[test]
fn flood_volume_is_conserved() {
    let mut water = create_pipe(32, 32.0);
    water.flood(10.0).unwrap();
    water.update(DT);
    let initial = water.total_water_volume().unwrap();
    assert!((initial - 10.0).abs() < 1e-3, "flooded {}", initial);

    for _ in 0..500 {
        water.update(DT);
    }
    let volume = water.total_water_volume().unwrap();
    assert!(
        (volume - initial).abs() < initial * 0.01,
        "volume drifted from {:.4} to {:.4}",
        initial,
        volume
    );
}

#[test]
fn flood_over_ramp_is_conserved_and_settles_downhill() {
    let mut water = create_pipe(32, 32.0);
    set_ramp(&mut water, 2.0);
    water.flood(40.0).unwrap();
    water.update(DT);
    let initial = water.total_water_volume().unwrap();

    for _ in 0..600 {
        water.update(DT);
        assert!(water.check_finite().is_ok());
    }
    let volume = water.total_water_volume().unwrap();
    assert!(
        (volume - initial).abs() < initial * 0.01,
        "volume drifted from {:.4} to {:.4}",
        initial,
        volume
    );

    // Deeper at the low (east) end than at the high (west) end
    let grid = *water.grid();
    let columns = water_columns(&water);
    let west = columns[grid.idx(16, 2)];
    let east = columns[grid.idx(16, 29)];
    assert!(east > west, "east {} should exceed west {}", east, west);
}

// =============================================================================
// TEST 2: SOURCES AND SINKS
// =============================================================================

#[test]
fn source_adds_expected_volume() {
    let mut water = create_pipe(16, 16.0);
    let grid = *water.grid();
    let cells = grid.gather(Vec3::ZERO, 2.0).len() as f32;
    water.source(Vec3::ZERO, 0.5, 2.0).unwrap();
    water.update(DT);
    let expected = cells * 0.5 * grid.cell_area();
    let volume = water.total_water_volume().unwrap();
    assert!((volume - expected).abs() < 1e-4);
}

#[test]
fn sink_is_floored_at_min_water_height() {
    let mut water = create_pipe(16, 16.0);
    water.flood(5.0).unwrap();
    water.update(DT);
    for _ in 0..20 {
        water.source(Vec3::ZERO, -1.0, 3.0).unwrap();
        water.update(DT);
    }
    let floor = PipeParams::default().min_water_height;
    assert!(water_columns(&water).iter().all(|&w| w >= floor));
}

// =============================================================================
// TEST 3: RANDOMISED VOLUME BOOKKEEPING
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_sources_keep_water_above_floor(
        drops in prop::collection::vec((-7.0f32..7.0, -7.0f32..7.0, 0.0f32..2.0), 1..6),
        steps in 1usize..60,
    ) {
        let mut water = create_pipe(16, 16.0);
        for &(x, z, amount) in &drops {
            water.source(Vec3::new(x, 0.0, z), amount, 1.5).unwrap();
        }
        water.update(DT);
        let initial = water.total_water_volume().unwrap();

        for _ in 0..steps {
            water.update(DT);
        }

        let floor = PipeParams::default().min_water_height;
        prop_assert!(water_columns(&water).iter().all(|&w| w >= floor));
        let volume = water.total_water_volume().unwrap();
        prop_assert!((volume - initial).abs() <= initial.max(1.0) * 0.01);
        prop_assert!(water.check_finite().is_ok());
    }
}
