//! Headless simulator runner.
//!
//! Loads a world snapshot (or builds a small demo world), runs the
//! simulation to completion or a tick limit, and prints a run summary.
//!
//! ```text
//! marga-sim [world.yaml] [--config sim.yaml] [--ticks N] [--seed N] [--dt SECS]
//! ```

use std::path::Path;

use log::info;

use marga_sim::config::SimConfig;
use marga_sim::core::GridCoord;
use marga_sim::error::Result;
use marga_sim::io::Snapshot;
use marga_sim::obstacles::MovementPolicy;
use marga_sim::sim::Simulation;

fn arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// A small built-in world for runs without a snapshot file.
fn demo_world(config: SimConfig) -> Result<Simulation> {
    let mut sim = Simulation::new(config);
    let rows = sim.grid().rows() as i32;
    let far = rows - 1;

    sim.grid_mut().set_start(GridCoord::new(0, 0))?;
    sim.grid_mut().place_goal(GridCoord::new(far, far), 1)?;
    sim.grid_mut().place_goal(GridCoord::new(far, 0), 3)?;
    for row in 2..rows - 2 {
        sim.grid_mut().place_barrier(GridCoord::new(row, rows / 2))?;
    }
    sim.grid_mut()
        .place_traffic_light(GridCoord::new(1, rows / 2), 0.0)?;
    sim.spawn_obstacle(GridCoord::new(rows / 2, 1), MovementPolicy::RandomWalk)?;
    sim.spawn_obstacle(GridCoord::new(rows / 2, rows - 2), MovementPolicy::RandomWalk)?;
    Ok(sim)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config = match arg_value(&args, "--config") {
        Some(path) => SimConfig::load(Path::new(&path))?,
        None => SimConfig::default(),
    };
    if let Some(seed) = arg_value(&args, "--seed") {
        config.obstacles.seed = seed.parse().ok();
    }
    if let Some(dt) = arg_value(&args, "--dt") {
        if let Ok(dt) = dt.parse() {
            config.tick_interval = dt;
        }
    }
    let max_ticks: u64 = arg_value(&args, "--ticks")
        .and_then(|t| t.parse().ok())
        .unwrap_or(100_000);

    let snapshot_path = args.iter().find(|a| !a.starts_with("--")).filter(|a| {
        // Skip values consumed by the flags above.
        !args
            .iter()
            .zip(args.iter().skip(1))
            .any(|(flag, value)| flag.starts_with("--") && value == *a)
    });

    let mut sim = match snapshot_path {
        Some(path) => {
            info!("loading world from {}", path);
            Snapshot::load(Path::new(path))?.into_simulation(config)?
        }
        None => {
            info!("no world file given, using the built-in demo world");
            demo_world(config)?
        }
    };

    sim.start_agent()?;
    let executed = sim.run(max_ticks);

    let agent = match sim.agent() {
        Some(agent) => agent,
        None => return Ok(()),
    };
    let stats = agent.stats();
    println!("ticks:      {}", executed);
    println!("sim time:   {:.1}s", sim.clock());
    println!("final state: {:?}", agent.state());
    println!("position:   ({},{})", agent.position().row, agent.position().col);
    println!("steps:      {}", stats.steps);
    println!("distance:   {:.2}", stats.distance);
    println!("replans:    {}", stats.replans);
    println!("battery:    {:.1}%", agent.battery_fraction() * 100.0);
    println!(
        "goals:      {} completed, {} pending",
        agent.goals().completed_count(),
        agent.goals().remaining()
    );
    Ok(())
}
