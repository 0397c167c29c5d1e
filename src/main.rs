use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use idm_sim::{Scenario, Simulation, Snapshot, UpdateOrder};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser, Debug)]
#[command(name = "idm-sim", version, about = "Simulate a convoy of IDM vehicles")]
struct Opts {
    /// Scenario JSON file (default: two vehicles, 110 m/s following 123 m/s)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Time step in seconds, overriding the scenario
    #[arg(long)]
    dt: Option<f64>,

    /// Simulated duration in seconds, overriding the scenario
    #[arg(long)]
    duration: Option<f64>,

    /// Update order, overriding the scenario
    #[arg(long, value_enum)]
    order: Option<Order>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Standard deviation of the random desired-speed adjustment
    #[arg(long)]
    velocity_stddev: Option<f64>,

    /// Seed for the desired-speed adjustment
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Order {
    Simultaneous,
    LeaderFirst,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Order> for UpdateOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Simultaneous => UpdateOrder::Simultaneous,
            Order::LeaderFirst => UpdateOrder::LeaderFirst,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opt = Opts::parse();

    let mut scenario = match &opt.scenario {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Scenario::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Scenario::default(),
    };
    if let Some(dt) = opt.dt {
        scenario.dt = dt;
    }
    if let Some(duration) = opt.duration {
        scenario.duration = duration;
    }
    if let Some(order) = opt.order {
        scenario.order = order.into();
    }

    let mut sim = scenario.build().context("invalid scenario")?;
    if let Some(stddev) = opt.velocity_stddev {
        sim.randomise_velocity_adjusts(stddev, &mut StdRng::seed_from_u64(opt.seed))?;
    }

    info!(
        "Simulating {} vehicles for {} s ({} steps of {} s, {:?} order)...",
        sim.len(),
        scenario.duration,
        scenario.num_steps(),
        scenario.dt,
        sim.order()
    );
    let mut collisions = 0;
    for _ in 0..scenario.num_steps() {
        sim.step(scenario.dt)?;
        collisions += sim.collisions().len();
        report(&sim, opt.format)?;
    }
    info!("Done: {} collisions", collisions);
    Ok(())
}

/// Prints the state of every vehicle at the end of the current frame.
fn report(sim: &Simulation, format: Format) -> Result<()> {
    let snapshot: Snapshot = sim.snapshot();
    match format {
        Format::Json => println!("{}", serde_json::to_string(&snapshot)?),
        Format::Text => {
            for (idx, state) in snapshot.vehicles.iter().enumerate() {
                let label = if idx == 0 {
                    format!("Time {:.1}s", snapshot.time)
                } else {
                    String::new()
                };
                println!(
                    "{:<10}| Vehicle {} -> Position: {:.2}m, Speed: {:.2}m/s",
                    label,
                    idx + 1,
                    state.position,
                    state.speed
                );
            }
            println!();
        }
    }
    Ok(())
}
