//! Simulation runner: ties together configuration, compute backend, and
//! the multislice engine, then writes results for external tooling.

use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;

use laue_compute::create_backend;
use laue_core::{
    IntensityRecord, Reflection, Simulation, Tilt, TiltEvaluation,
};

use crate::config::JobConfig;

/// Results from a tilt sweep.
pub struct SweepOutput {
    pub reflections: Vec<Reflection>,
    pub evaluations: Vec<TiltEvaluation>,
    /// Inter-layer spacing (Å), for depth-axis labelling.
    pub z_spacing: f64,
}

/// Run the full tilt sweep described by a parsed job configuration.
///
/// Tilt evaluations share the immutable `Simulation` read-only and run in
/// parallel; each one owns its evolving wavefunction.
pub fn run_simulation(job: &JobConfig) -> Result<SweepOutput> {
    let params = job.to_params()?;
    let mode = job.record_mode()?;
    let backend = create_backend(&job.simulation.backend)?;
    println!("Backend: {}", backend.device_info().name);

    let sim = Simulation::new(params, backend).context("configuration rejected")?;
    println!(
        "Wavelength: {:.5} Å, {} reflections within k_max, {} slices per run",
        sim.wavelength(),
        sim.reflections().len(),
        sim.num_slices()
    );

    let tilts: Vec<Tilt> = job
        .tilt
        .x
        .values()
        .into_iter()
        .flat_map(|tx| {
            job.tilt.y.values().into_iter().map(move |ty| Tilt {
                angle_x: tx,
                angle_y: ty,
            })
        })
        .collect();
    println!("Tilt evaluations: {}", tilts.len());

    let evaluations = tilts
        .par_iter()
        .map(|&tilt| {
            sim.intensity(tilt, mode).map_err(|e| {
                anyhow::anyhow!(
                    "tilt ({:.3}, {:.3}) mrad failed: {}",
                    tilt.angle_x,
                    tilt.angle_y,
                    e
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SweepOutput {
        reflections: sim.reflections().to_vec(),
        evaluations,
        z_spacing: sim.lattice_model().z_spacing(),
    })
}

/// Write exit-surface intensities for every tilt as one CSV table.
pub fn write_intensities_csv(output: &SweepOutput, path: &Path, job: &JobConfig) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;

    writeln!(file, "# Laue multislice — diffracted intensities")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# beam_energy_v: {}", job.simulation.beam_energy)?;
    writeln!(
        file,
        "# crystal_thickness_angstrom: {}",
        job.simulation.crystal_thickness
    )?;
    writeln!(file, "# k_max_inv_angstrom: {}", job.simulation.k_max)?;
    writeln!(file, "#")?;

    write!(file, "tilt_x_mrad,tilt_y_mrad")?;
    for r in &output.reflections {
        write!(file, ",I({} {})", r.h, r.k)?;
    }
    writeln!(file)?;

    for eval in &output.evaluations {
        write!(file, "{:.4},{:.4}", eval.tilt.angle_x, eval.tilt.angle_y)?;
        for v in eval.intensities.exit_intensities().iter() {
            write!(file, ",{:.6e}", v)?;
        }
        writeln!(file)?;
    }
    Ok(())
}

/// Write the per-slice depth series of one tilt evaluation.
pub fn write_depth_csv(
    eval: &TiltEvaluation,
    output: &SweepOutput,
    path: &Path,
    thickness: f64,
) -> Result<()> {
    use std::io::Write;

    let series = match &eval.intensities {
        IntensityRecord::Depth(series) => series,
        IntensityRecord::Final(_) => return Ok(()),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;

    writeln!(file, "# Laue multislice — depth-resolved intensities")?;
    writeln!(
        file,
        "# tilt_mrad: ({:.4}, {:.4})",
        eval.tilt.angle_x, eval.tilt.angle_y
    )?;
    writeln!(file, "#")?;

    write!(file, "slice,depth_angstrom")?;
    for r in &output.reflections {
        write!(file, ",I({} {})", r.h, r.k)?;
    }
    writeln!(file)?;

    for (i, row) in series.rows().into_iter().enumerate() {
        // The final slice may be partial; its depth is the slab thickness.
        let depth = ((i + 1) as f64 * output.z_spacing).min(thickness);
        write!(file, "{},{:.4}", i, depth)?;
        for v in row.iter() {
            write!(file, ",{:.6e}", v)?;
        }
        writeln!(file)?;
    }
    Ok(())
}

/// Write one tilt's real-space exit wave as |ψ|² and phase per pixel.
pub fn write_exit_wave_csv(eval: &TiltEvaluation, path: &Path) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;

    writeln!(file, "# Laue multislice — real-space exit wavefunction")?;
    writeln!(
        file,
        "# tilt_mrad: ({:.4}, {:.4})",
        eval.tilt.angle_x, eval.tilt.angle_y
    )?;
    writeln!(file, "#")?;
    writeln!(file, "ix,iy,intensity,phase_rad")?;

    for ((i, j), v) in eval.exit_wave.indexed_iter() {
        writeln!(file, "{},{},{:.6e},{:.6}", i, j, v.norm_sqr(), v.arg())?;
    }
    Ok(())
}

/// Write the sweep as JSON for downstream plotting collaborators.
pub fn write_intensities_json(output: &SweepOutput, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let reflections: Vec<_> = output.reflections.iter().map(|r| [r.h, r.k]).collect();
    let evaluations: Vec<_> = output
        .evaluations
        .iter()
        .map(|eval| {
            serde_json::json!({
                "tilt_mrad": [eval.tilt.angle_x, eval.tilt.angle_y],
                "intensities": eval.intensities.exit_intensities().to_vec(),
            })
        })
        .collect();

    let doc = serde_json::json!({
        "reflections": reflections,
        "evaluations": evaluations,
    });
    std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    Ok(())
}
