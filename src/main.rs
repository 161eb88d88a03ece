//! Headless streaming demo: walks a target across the terrain and reports
//! scheduler and build activity. Useful for profiling and for smoke-testing
//! the pipeline without a renderer attached.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use log::info;
use strata::{VoxelWorld, WorldConfig};
use strata_geom::Vec3;

#[derive(Parser, Debug)]
#[command(name = "strata", about = "Streaming voxel terrain demo")]
struct Args {
    /// World configuration TOML; defaults are used when absent.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Scheduling ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Target speed in cells per tick along the walk path.
    #[arg(long, default_value_t = 1.5)]
    speed: f32,
    /// Override the generator seed from the config.
    #[arg(long)]
    seed: Option<i32>,
    /// Milliseconds to sleep between ticks (0 = free-running).
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match WorldConfig::load_from_path(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("failed to load config {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => WorldConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.terrain.seed = seed;
    }

    info!(
        "strata demo: chunk={:?} window={:?} load_budget={} mesh_budget={} strategy={:?}",
        config.chunk_size,
        config.window_radius,
        config.load_budget,
        config.mesh_budget,
        config.strategy
    );

    let mut world = VoxelWorld::new(config);
    let t_start = Instant::now();
    let mut total_meshes = 0usize;
    let mut total_quads = 0usize;

    for tick in 0..args.ticks {
        // A lazy figure-eight over the terrain, staying near the surface.
        let t = tick as f32 * args.speed;
        let target = Vec3::new(t, 12.0, (t * 0.05).sin() * 64.0);
        let stats = world.tick(target);

        for (_, mesh) in world.take_ready_meshes() {
            total_meshes += 1;
            total_quads += mesh.quad_count();
        }

        if tick % 60 == 0 {
            let (qu, iu, qb, ib) = world.queue_counts();
            info!(
                "tick {tick}: loaded={} pending={} started={} evicted={} queues urgent={qu}+{iu} bg={qb}+{ib}",
                world.loaded_count(),
                stats.pending,
                stats.loads_started,
                stats.evicted
            );
        }
        if args.tick_ms > 0 {
            std::thread::sleep(Duration::from_millis(args.tick_ms));
        }
    }

    info!(
        "done: {} meshes ({} quads) over {} ticks in {:.1}s, {} chunks resident",
        total_meshes,
        total_quads,
        args.ticks,
        t_start.elapsed().as_secs_f32(),
        world.loaded_count()
    );
}
