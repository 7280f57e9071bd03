//! `phenology run`
//!
//! Loads a crop and a schedule, simulates every day and prints one line per
//! day to stdout.

use std::io::Write;

use crate::cli::args::{OutputFormat, RunArgs};
use crate::config::ConfigLoader;
use crate::error::PhenologyError;
use crate::observability::{EventEmitter, init_metrics, render_metrics};
use crate::simulation::{DayReport, Simulation};

/// Runs a simulation.
///
/// # Errors
///
/// Fails on configuration, schedule, engine or output errors.
pub fn run(args: &RunArgs, quiet: bool) -> Result<(), PhenologyError> {
    let loader = ConfigLoader::default();
    let loaded = loader.load(&args.config)?;
    let schedule = loader.load_schedule(&args.schedule)?;
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    if args.metrics_file.is_some() {
        init_metrics()?;
    }
    let emitter = match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };
    let mut simulation = Simulation::new(&loaded.config, emitter)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let print = !quiet;
    if print && args.output == OutputFormat::Human {
        writeln!(out, "{}", header())?;
    }

    let summary = simulation.run(&schedule, |report| {
        if !print {
            return Ok(());
        }
        match args.output {
            OutputFormat::Human => writeln!(out, "{}", human_row(report)),
            OutputFormat::Json => {
                let line = serde_json::to_string(report).map_err(std::io::Error::other)?;
                writeln!(out, "{line}")
            }
        }
    })?;

    if let Some(path) = &args.metrics_file {
        std::fs::write(path, render_metrics().unwrap_or_default())?;
    }

    if print && args.output == OutputFormat::Human {
        writeln!(
            out,
            "{} days, {} transitions, finished in {} at stage {:.2}",
            summary.days, summary.transitions, summary.final_phase, summary.stage
        )?;
    }
    out.flush()?;
    Ok(())
}

fn header() -> String {
    format!(
        "{:<10}  {:>4}  {:<24}  {:>6}  {:>9}  {}",
        "date", "day", "phase", "stage", "tt", "stages reached"
    )
}

fn human_row(report: &DayReport) -> String {
    format!(
        "{:<10}  {:>4}  {:<24}  {:>6.2}  {:>9.1}  {}",
        report.date.to_string(),
        report.day,
        report.state.phase,
        report.state.stage,
        report.state.accumulated_thermal_time,
        report.state.stages_today.join(",")
    )
}
