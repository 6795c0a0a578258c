// src/main.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use promesh::{process_obj_file, QuadricOptions, ReduceOptions};

#[derive(Parser)]
#[command(name = "promesh")]
#[command(about = "Progressive mesh reduction with an invertible collapse log")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collapse edges until an iteration cap or polygon budget is hit
    Reduce {
        /// Input OBJ file
        input: PathBuf,

        /// Maximum number of collapse iterations
        #[arg(long)]
        iterations: Option<u32>,

        /// Stop once the polygon count drops below this value
        #[arg(long)]
        max_polygons: Option<usize>,

        /// Evaluate candidates at the optimal position instead of the midpoint
        #[arg(long)]
        optimal_position: bool,

        /// Skip embedding the reduction log in the output
        #[arg(long)]
        no_log: bool,

        /// Also write the viewer JSON document to this path
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Replay the embedded log and restore the original mesh
    Reproduce {
        /// Reduced OBJ file carrying a reduction log
        input: PathBuf,
    },
    /// Print mesh statistics
    Info {
        /// OBJ file to inspect
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format_timestamp_millis()
        .format_target(false)
        .parse_default_env()
        .init();

    match Cli::parse().command {
        Command::Reduce {
            input,
            iterations,
            max_polygons,
            optimal_position,
            no_log,
            json,
        } => {
            let mut model = process_obj_file(&input)
                .with_context(|| format!("loading {}", input.display()))?;

            let mut options = ReduceOptions::new()
                .quadric(QuadricOptions::new().optimal_position(optimal_position));
            if let Some(cap) = iterations {
                options = options.iterations(cap);
            }
            if let Some(budget) = max_polygons {
                options = options.stop_when(move |_, polygons| polygons < budget);
            }

            let outcome = model.reduce(options)?;
            println!("Start polygons: {}", outcome.start_polygons);
            println!("End polygons: {}", outcome.end_polygons);
            println!("Reduction percent: {:.2}%", outcome.reduction_percent());

            let written = model.write(!no_log)?;
            println!("Written file to {}", written.display());

            if let Some(json_path) = json {
                model.to_json(Some(&json_path))?;
                println!("Written viewer document to {}", json_path.display());
            }
        }
        Command::Reproduce { input } => {
            let mut model = process_obj_file(&input)
                .with_context(|| format!("loading {}", input.display()))?;
            model.reproduce()?;
            println!("Has {} polygons", model.graph().polygon_count());
            let written = model.write(false)?;
            println!("Written file to {}", written.display());
        }
        Command::Info { input } => {
            let model = process_obj_file(&input)
                .with_context(|| format!("loading {}", input.display()))?;
            println!("Vertices: {}", model.graph().vertex_count());
            println!("Edges: {}", model.graph().edge_count());
            println!("Polygons: {}", model.graph().polygon_count());
            println!("Reduced: {}", model.already_reduced());
        }
    }
    Ok(())
}
