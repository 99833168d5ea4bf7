//! CLI commands for transit-route.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::formats::SnapshotFile;
use crate::parse::load_network;
use crate::transit::TransitRouter;

#[derive(Parser)]
#[command(name = "transit-route")]
#[command(about = "Itinerary routing for static public-transit networks", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the transit graph, precompute all shortest paths, write a snapshot
    Build {
        /// Network definition JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Output snapshot file
        #[arg(short, long)]
        output: PathBuf,

        /// Also persist the graph topology and edge metadata
        #[arg(long)]
        topology: bool,
    },

    /// Answer an itinerary query from a snapshot
    Route {
        /// Network definition JSON (the same one the snapshot was built from)
        #[arg(short, long)]
        input: PathBuf,

        /// Snapshot produced by `build`
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Departure stop name
        #[arg(long)]
        from: String,

        /// Destination stop name
        #[arg(long)]
        to: String,

        /// The snapshot carries a topology section
        #[arg(long)]
        topology: bool,
    },

    /// Print stats for one bus or one stop
    Stat {
        /// Network definition JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Bus name
        #[arg(long, conflicts_with = "stop")]
        bus: Option<String>,

        /// Stop name
        #[arg(long)]
        stop: Option<String>,
    },

    /// Check a snapshot's framing, checksum and table invariants
    Verify {
        /// Snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            input,
            output,
            topology,
        } => build(&input, &output, topology),
        Commands::Route {
            input,
            snapshot,
            from,
            to,
            topology,
        } => route(&input, &snapshot, &from, &to, topology),
        Commands::Stat { input, bus, stop } => stat(&input, bus.as_deref(), stop.as_deref()),
        Commands::Verify { snapshot } => verify(&snapshot),
    }
}

fn build(input: &Path, output: &Path, topology: bool) -> Result<()> {
    let start = Instant::now();
    let (catalogue, settings) = load_network(input)
        .with_context(|| format!("reading network definition {}", input.display()))?;
    println!(
        "Parsed {}: {} stops, {} buses",
        input.display(),
        catalogue.vertex_count(),
        catalogue.buses().len()
    );

    let precompute_start = Instant::now();
    let transit = TransitRouter::build(catalogue, settings).context("building transit graph")?;
    println!(
        "Graph built and precomputed in {:.2}s: {} edges",
        precompute_start.elapsed().as_secs_f64(),
        transit.router().graph().edge_count()
    );

    SnapshotFile::write(output, &transit.to_snapshot(topology))
        .with_context(|| format!("writing snapshot {}", output.display()))?;
    println!(
        "Snapshot written to {} (topology: {}) in {:.2}s total",
        output.display(),
        if topology { "yes" } else { "no" },
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn route(
    input: &Path,
    snapshot_path: &Path,
    from: &str,
    to: &str,
    topology: bool,
) -> Result<()> {
    let (catalogue, _) = load_network(input)
        .with_context(|| format!("reading network definition {}", input.display()))?;
    let snapshot = SnapshotFile::read(snapshot_path, topology)
        .with_context(|| format!("reading snapshot {}", snapshot_path.display()))?;
    let transit =
        TransitRouter::from_snapshot(catalogue, snapshot).context("restoring router state")?;

    let query_start = Instant::now();
    let completed = transit.build_route(from, to)?;
    match completed {
        None => println!("No route from {from} to {to}"),
        Some(route) => {
            println!("Route {from} -> {to}: {:.6} min", route.total_time);
            for line in &route.lines {
                println!(
                    "  wait {:.0} min at {}, ride bus {} for {} stops ({:.6} min)",
                    line.wait_time,
                    transit.catalogue().stop(line.stop).name,
                    transit.catalogue().bus(line.bus).name,
                    line.span_count,
                    line.run_time
                );
            }
        }
    }
    println!("Query took {:.3}ms", query_start.elapsed().as_secs_f64() * 1e3);
    Ok(())
}

fn stat(input: &Path, bus: Option<&str>, stop: Option<&str>) -> Result<()> {
    let (catalogue, _) = load_network(input)
        .with_context(|| format!("reading network definition {}", input.display()))?;

    if let Some(name) = bus {
        let bus = catalogue.bus(catalogue.bus_id(name)?);
        println!(
            "Bus {}: {} stops on route, {} unique, {:.0} m, curvature {:.5}{}",
            bus.name,
            bus.stops.len(),
            bus.unique_stops,
            bus.road_length,
            bus.curvature,
            if bus.is_ring { " (ring)" } else { "" }
        );
        return Ok(());
    }

    if let Some(name) = stop {
        let stop = catalogue.stop(catalogue.stop_id(name)?);
        if stop.buses.is_empty() {
            println!("Stop {}: no buses", stop.name);
        } else {
            let mut names: Vec<&str> = stop
                .buses
                .iter()
                .map(|&id| catalogue.bus(id).name.as_str())
                .collect();
            names.sort_unstable();
            println!("Stop {}: buses {}", stop.name, names.join(" "));
        }
        return Ok(());
    }

    bail!("pass --bus <name> or --stop <name>");
}

fn verify(snapshot_path: &Path) -> Result<()> {
    let snapshot = SnapshotFile::inspect(snapshot_path)
        .with_context(|| format!("reading snapshot {}", snapshot_path.display()))?;

    let n = snapshot.vertex_count as usize;
    for v in 0..n {
        match snapshot.table[v * n + v] {
            Some(cell) if cell.weight == 0.0 && cell.prev_edge.is_none() => {}
            other => bail!("diagonal cell {v} broken: {other:?}"),
        }
    }

    println!(
        "Snapshot OK: {} stops, {} edges, wait {} min, velocity {} km/h, topology: {}",
        snapshot.vertex_count,
        snapshot.edge_count,
        snapshot.settings.bus_wait_time,
        snapshot.settings.bus_velocity,
        if snapshot.topology.is_some() { "yes" } else { "no" }
    );
    Ok(())
}
