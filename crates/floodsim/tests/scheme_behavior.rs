//! Behaviour tests for the water integration schemes
//!
//! These tests drive the public solver API the way a frame loop would:
//! 1. A single disturbance dies out under damping
//! 2. Every scheme stays bounded and finite
//! 3. The border ring never leaves the mean height
//! 4. Substep counts follow the CFL formula exactly

use floodsim::water::cfl_substeps;
use floodsim::{KernelSource, PipeParams, SchemeConfig, Vec3, WaterConfig, WaterSolver};

const DT: f32 = 1.0 / 60.0;

/// Helper to build a solver for one scheme
fn solver(scheme: SchemeConfig, res: usize, size: f32, mean: f32) -> WaterSolver {
    let config = WaterConfig::new(size, res, 0.99)
        .with_scheme(scheme)
        .with_mean_height(mean);
    WaterSolver::new(&config).expect("valid config")
}

/// Every scheme, with its default parameters
fn all_schemes() -> Vec<SchemeConfig> {
    vec![
        SchemeConfig::MuellerHelloWorld,
        SchemeConfig::MuellerGdc2008 {
            horizontal_speed: 2.0,
            cfl_factor: 1.5,
        },
        SchemeConfig::XWater,
        SchemeConfig::TessendorfIWave {
            kernel: KernelSource::Generated { radius: 2 },
            gravity: 9.81,
        },
        SchemeConfig::PipeModel(PipeParams::default()),
    ]
}

/// Largest deviation from the mean height
fn max_deviation(water: &WaterSolver) -> f32 {
    let mean = water.mean_height();
    water
        .heights()
        .data
        .iter()
        .fold(0.0f32, |m, &h| m.max((h - mean).abs()))
}

// =============================================================================
// TEST 1: DAMPED RIPPLE
// A single disturbance spreads and loses energy
// =============================================================================

#[test]
fn hello_world_ripple_decays() {
    let mut water = solver(SchemeConfig::MuellerHelloWorld, 16, 16.0, 0.0);
    water.disturb(Vec3::ZERO, 1.0);
    water.update(DT);
    let early = water.heights().std_dev();

    for _ in 0..199 {
        water.update(DT);
    }
    let late = water.heights().std_dev();

    assert!(water.check_finite().is_ok());
    assert!(
        late < early,
        "std dev should shrink: {} after 1 step, {} after 200",
        early,
        late
    );
}

#[test]
fn xwater_ripple_decays() {
    let mut water = solver(SchemeConfig::XWater, 16, 16.0, 1.0);
    water.disturb(Vec3::ZERO, 1.0);
    water.update(DT);
    let early = max_deviation(&water);
    for _ in 0..199 {
        water.update(DT);
    }
    let late = max_deviation(&water);
    assert!(late < early, "{} -> {}", early, late);
}

// =============================================================================
// TEST 2: BOUNDEDNESS
// No scheme blows up from a unit disturbance
// =============================================================================

#[test]
fn all_schemes_stay_bounded() {
    for scheme in all_schemes() {
        let name = format!("{:?}", scheme);
        let mut water = solver(scheme, 16, 16.0, 0.5);
        water.disturb(Vec3::ZERO, 1.0);
        for step in 0..300 {
            water.update(DT);
            assert!(
                water.check_finite().is_ok(),
                "{} went non-finite at step {}",
                name,
                step
            );
        }
        let deviation = max_deviation(&water);
        assert!(deviation < 10.0, "{} deviates by {}", name, deviation);
    }
}

#[test]
fn gdc2008_large_dt_uses_substeps() {
    let mut water = solver(
        SchemeConfig::MuellerGdc2008 {
            horizontal_speed: 4.0,
            cfl_factor: 1.5,
        },
        16,
        16.0,
        0.0,
    );
    water.disturb(Vec3::ZERO, 1.0);
    // A quarter second per frame would be unstable without substepping
    for _ in 0..100 {
        water.update(0.25);
    }
    assert!(water.check_finite().is_ok());
    assert!(max_deviation(&water) < 1.0);
}

// =============================================================================
// TEST 3: BORDER PINNING
// The outer ring always reads the mean height
// =============================================================================

#[test]
fn border_is_pinned_for_every_scheme() {
    for scheme in all_schemes() {
        let name = format!("{:?}", scheme);
        let mut water = solver(scheme, 12, 6.0, 0.75);
        let grid = *water.grid();
        for step in 0..50 {
            water.disturb_area(Vec3::new(1.0, 0.0, -0.5), 0.3, 2.0);
            water.update(DT);
            for idx in grid.border() {
                assert_eq!(
                    water.surface(idx),
                    0.75,
                    "{}: border cell {} moved at step {}",
                    name,
                    idx,
                    step
                );
            }
        }
    }
}

// =============================================================================
// TEST 4: MEAN HEIGHT
// Schemes that work relative to the mean return to it
// =============================================================================

#[test]
fn iwave_rest_state_round_trips_mean_height() {
    for mean in [-2.0, 0.0, 3.5] {
        let mut water = solver(
            SchemeConfig::TessendorfIWave {
                kernel: KernelSource::Generated { radius: 2 },
                gravity: 9.81,
            },
            16,
            16.0,
            mean,
        );
        for _ in 0..20 {
            water.update(DT);
        }
        assert!(water
            .heights()
            .data
            .iter()
            .all(|&h| (h - mean).abs() < 1e-5));
    }
}

#[test]
fn pipe_rest_state_round_trips_mean_height() {
    let mut water = solver(SchemeConfig::PipeModel(PipeParams::default()), 8, 8.0, 0.7);
    assert!(water.heights().data.iter().all(|&h| h == 0.7));

    for _ in 0..200 {
        water.update(DT);
    }
    assert!(water.heights().data.iter().all(|&h| h == 0.7));

    water.source(Vec3::ZERO, 0.5, 2.0).unwrap();
    water.update(DT);
    water.reset();
    assert!(water.heights().data.iter().all(|&h| h == 0.7));
}

#[test]
fn iwave_radius_six_kernel_runs() {
    let mut water = solver(
        SchemeConfig::TessendorfIWave {
            kernel: KernelSource::Generated { radius: 6 },
            gravity: 9.81,
        },
        24,
        24.0,
        0.0,
    );
    water.disturb(Vec3::ZERO, 0.5);
    for _ in 0..60 {
        water.update(DT);
    }
    assert!(water.check_finite().is_ok());
}

#[test]
fn unsupported_iwave_radius_is_rejected() {
    let config = WaterConfig::new(16.0, 16, 0.99).with_scheme(SchemeConfig::TessendorfIWave {
        kernel: KernelSource::Generated { radius: 4 },
        gravity: 9.81,
    });
    assert!(matches!(
        WaterSolver::new(&config),
        Err(floodsim::SimError::Configuration(_))
    ));
}

#[test]
fn reset_restores_mean_for_every_scheme() {
    for scheme in all_schemes() {
        let is_pipe = matches!(scheme, SchemeConfig::PipeModel(_));
        let mut water = solver(scheme, 10, 10.0, 0.0);
        water.disturb(Vec3::ZERO, 1.0);
        for _ in 0..10 {
            water.update(DT);
        }
        water.reset();
        assert!(water.heights().data.iter().all(|&h| h == 0.0));
        if is_pipe {
            assert_eq!(water.total_water_volume().unwrap(), 0.0);
        }
    }
}

// =============================================================================
// TEST 5: CFL SUBSTEPS
// =============================================================================

#[test]
fn cfl_substep_formula() {
    // segment 1, speed 2 => max_dt 0.5; k = 1.5
    assert_eq!(cfl_substeps(0.1, 1.0, 2.0, 1.5), (0.5, 1));
    assert_eq!(cfl_substeps(1.0, 1.0, 2.0, 1.5), (0.5, 3));
    // Pipe defaults: k = 5, speed 10
    assert_eq!(cfl_substeps(DT, 1.0, 10.0, 5.0).1, 1);
    assert_eq!(cfl_substeps(0.5, 0.5, 4.0, 5.0), (0.125, 20));
}

// =============================================================================
// TEST 6: MULTISTEPS
// =============================================================================

#[test]
fn multisteps_repeat_the_whole_step() {
    let base = WaterConfig::new(8.0, 8, 0.99).with_scheme(SchemeConfig::MuellerHelloWorld);
    let mut once = WaterSolver::new(&base.clone().with_multisteps(2)).unwrap();
    let mut twice = WaterSolver::new(&base).unwrap();

    once.disturb(Vec3::ZERO, 1.0);
    once.update(DT);

    twice.disturb(Vec3::ZERO, 1.0);
    twice.update(DT);
    twice.update(DT);

    assert_eq!(once.heights().data, twice.heights().data);
}
