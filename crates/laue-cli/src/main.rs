//! Laue command-line interface.
//!
//! Run multislice simulations from TOML configuration files:
//! ```sh
//! laue run job.toml
//! laue validate job.toml
//! laue reflections job.toml
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use laue_compute::create_backend;
use laue_core::Simulation;

#[derive(Parser)]
#[command(name = "laue")]
#[command(about = "Laue: multislice electron diffraction for cubic crystals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tilt sweep from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running the simulation.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the allowed reflections for a configuration.
    Reflections {
        /// Path to the job configuration file.
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Laue multislice");
            println!("===============");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_simulation(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_intensities {
                let csv_path = out_dir.join("intensities.csv");
                runner::write_intensities_csv(&result, &csv_path, &job)?;
            }
            if job.output.save_json {
                let json_path = out_dir.join("intensities.json");
                runner::write_intensities_json(&result, &json_path)?;
            }
            for (i, eval) in result.evaluations.iter().enumerate() {
                let depth_path = out_dir.join(format!("depth_{:03}.csv", i));
                runner::write_depth_csv(
                    eval,
                    &result,
                    &depth_path,
                    job.simulation.crystal_thickness,
                )?;
                if job.output.save_exit_wave {
                    let wave_path = out_dir.join(format!("exit_wave_{:03}.csv", i));
                    runner::write_exit_wave_csv(eval, &wave_path)?;
                }
            }

            println!("Simulation complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let params = job.to_params()?;
            job.record_mode()?;
            let backend = create_backend(&job.simulation.backend)?;
            Simulation::new(params, backend)?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Reflections { config } => {
            let job = config::load_config(&config)?;
            let params = job.to_params()?;
            let backend = create_backend(&job.simulation.backend)?;
            let sim = Simulation::new(params, backend)?;

            println!(
                "{} reflections within k_max = {} Å⁻¹:",
                sim.reflections().len(),
                sim.grid().k_max
            );
            println!();
            println!("{:>6} {:>6} {:>12}", "h", "k", "|g| (Å⁻¹)");
            for r in sim.reflections() {
                println!("{:>6} {:>6} {:>12.4}", r.h, r.k, r.g);
            }
            Ok(())
        }
    }
}
