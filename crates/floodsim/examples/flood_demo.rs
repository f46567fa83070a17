//! Flood demo: noisy terrain, rain, and a floating crate.
//!
//! Run with: `RUST_LOG=info cargo run --example flood_demo [water_config.json]`

use std::path::Path;

use floodsim::{
    CouplingConfig, CouplingManager, Grid, Mat4, PipeParams, SchemeConfig, SculptConfig,
    SculptEngine, SculptMesh, TriangleMesh, Vec3, WaterConfig, WaterSolver,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DT: f32 = 1.0 / 60.0;
const FRAMES: usize = 600;

fn main() -> floodsim::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => WaterConfig::load_json(Path::new(&path))?,
        None => WaterConfig::new(32.0, 64, 0.995)
            .with_scheme(SchemeConfig::PipeModel(PipeParams::default())),
    };
    let mut water = WaterSolver::new(&config)?;
    let grid: Grid = *water.grid();

    // Terrain: two octaves of simplex noise
    let mut sculpt = SculptEngine::new(SculptConfig::default());
    sculpt.add_mesh("terrain", SculptMesh::new(grid, 0.0).with_noise_seed(7))?;
    sculpt.add_layer("terrain", "hills")?;
    sculpt
        .mesh_mut("terrain")?
        .add_noise(2.0, Vec3::splat(0.08), Vec3::ZERO)?;
    sculpt.add_layer("terrain", "bumps")?;
    sculpt
        .mesh_mut("terrain")?
        .add_noise(0.3, Vec3::splat(0.4), Vec3::splat(10.0))?;

    let terrain = sculpt.mesh("terrain")?.heights().clone();
    let has_ground = water.set_terrain(&terrain).is_ok();
    log::info!(
        "terrain {:.2}..{:.2}, pipe ground: {}",
        terrain.min(),
        terrain.max(),
        has_ground
    );

    let mut coupling = CouplingManager::new(CouplingConfig::default());
    coupling.add_dynamic_obstacle(
        &mut water,
        "crate",
        TriangleMesh::cuboid(Vec3::new(1.0, 0.5, 1.0)),
        400.0,
    )?;
    coupling.add_exert_force_listener(|name, force| {
        log::trace!("{name}: {force}");
    });

    let mut rng = StdRng::seed_from_u64(42);
    let half = grid.size() * 0.5;
    let mut crate_pos = Vec3::new(0.0, 2.0, 0.0);

    for frame in 0..FRAMES {
        let drop = Vec3::new(
            rng.gen_range(-half..half),
            0.0,
            rng.gen_range(-half..half),
        );
        if water.source(drop, 0.2, 1.0).is_err() {
            water.disturb(drop, 0.05);
        }

        water.update(DT);

        coupling.set_transform(&mut water, "crate", Mat4::from_translation(crate_pos))?;
        coupling.update(&mut water, DT)?;

        // Crude integration so the crate bobs on the buoyancy it feels
        let state = coupling.state("crate")?;
        let net = state.force.y - state.mass * 9.81;
        crate_pos.y += (net / state.mass * DT * DT).clamp(-0.05, 0.05);

        if frame % 60 == 0 {
            let volume = water.total_water_volume().unwrap_or(0.0);
            log::info!(
                "frame {frame}: volume {volume:.2} m³, surface {:.3}..{:.3}, crate y {:.2}",
                water.heights().min(),
                water.heights().max(),
                crate_pos.y
            );
        }
    }

    water.check_finite()
}
