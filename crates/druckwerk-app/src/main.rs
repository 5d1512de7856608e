// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckwerk command-line printer application.
//
// Creates a single printer backed by the sample PBM driver, prints the given
// documents through the job pipeline and reports the final job states as
// JSON.  Ctrl-C cancels every outstanding job.

mod pbm;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use druckwerk_core::attributes::AttributeSet;
use druckwerk_core::config::SystemConfig;
use druckwerk_core::error::Result;
use druckwerk_core::types::{JobState, format_from_extension};
use druckwerk_print::{Job, System};
use tracing_subscriber::EnvFilter;

use pbm::{PBM_DRIVER, PBM_FORMAT, PbmDriverFactory};

/// How often printers are checked for due job cleanup.
const CLEAN_TICK: std::time::Duration = std::time::Duration::from_secs(1);

/// Print documents through a Druckwerk printer.
#[derive(Parser, Debug)]
#[command(name = "druckwerk", author, version, about, long_about = None)]
struct Cli {
    /// System configuration file (JSON).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Printer name.
    #[arg(long, default_value = "Druckwerk PBM")]
    name: String,

    /// Device URI the printer writes to.
    #[arg(long, default_value = "file://druckwerk-out.pbm")]
    device: String,

    /// Driver name.
    #[arg(long, default_value = PBM_DRIVER)]
    driver: String,

    /// Preset definitions to load into the printer.
    #[arg(long, value_name = "FILE")]
    presets: Option<PathBuf>,

    /// Preset to apply before printing.
    #[arg(long)]
    preset: Option<String>,

    /// Number of copies per document.
    #[arg(long)]
    copies: Option<i32>,

    /// Documents to print (PWG raster, Apple raster, JPEG, PNG or PBM).
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match SystemConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("druckwerk: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => SystemConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .init();

    tracing::info!(system = %config.name, "Druckwerk starting");

    match run(cli, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!(error = %e, "druckwerk failed");
            ExitCode::FAILURE
        }
    }
}

/// Print every document; returns whether all jobs completed.
async fn run(cli: Cli, config: SystemConfig) -> Result<bool> {
    let system = Arc::new(System::new(config, Arc::new(PbmDriverFactory)));
    let printer = system.create_printer(&cli.name, Some(&cli.driver), &cli.device, None)?;

    if let Some(path) = &cli.presets {
        let file = std::fs::File::open(path)?;
        let count = printer.load_presets(std::io::BufReader::new(file))?;
        tracing::info!(count, path = %path.display(), "presets loaded");
    }
    if let Some(name) = &cli.preset {
        printer.apply_preset(name)?;
    }

    let mut jobs: Vec<Arc<Job>> = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let mut attrs = AttributeSet::new();
        if let Some(copies) = cli.copies {
            attrs.add_integers("copies", &[copies]);
        }
        match printer.submit_file(path, document_format(path), attrs) {
            Ok(job) => {
                tracing::info!(job_id = %job.id(), file = %path.display(), format = %job.format(), "job queued");
                jobs.push(job);
            }
            Err(e) => tracing::warn!(file = %path.display(), error = %e, "unable to queue document"),
        }
    }

    let cleaner = {
        let system = Arc::clone(&system);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEAN_TICK);
            loop {
                ticker.tick().await;
                system.clean_jobs();
            }
        })
    };

    let waiter = {
        let system = Arc::clone(&system);
        tokio::task::spawn_blocking(move || system.wait_for_jobs())
    };
    tokio::select! {
        waited = waiter => log_join_failure("wait for jobs", waited),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, canceling jobs");
            printer.cancel_all_jobs();
            let system = Arc::clone(&system);
            log_join_failure("wait for jobs", tokio::task::spawn_blocking(move || system.wait_for_jobs()).await);
        }
    }
    cleaner.abort();

    let summaries: Vec<_> = jobs.iter().map(|job| job.summary()).collect();
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    let all_completed = jobs.iter().all(|job| job.state() == JobState::Completed);

    let shutdown = Arc::clone(&system);
    log_join_failure("shutdown", tokio::task::spawn_blocking(move || shutdown.shutdown()).await);
    Ok(all_completed)
}

fn log_join_failure(task: &str, result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::warn!(task, error = %e, "blocking task failed");
    }
}

/// Known document formats by extension; anything else is left to the printer.
fn document_format(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("pbm") {
        return Some(PBM_FORMAT);
    }
    format_from_extension(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["druckwerk", "a.pwg", "b.pbm"]).expect("parse");
        assert_eq!(cli.driver, PBM_DRIVER);
        assert_eq!(cli.device, "file://druckwerk-out.pbm");
        assert_eq!(cli.files.len(), 2);
        assert!(cli.copies.is_none());
    }

    #[tokio::test]
    async fn panicked_blocking_task_is_survivable() {
        let result: std::result::Result<(), tokio::task::JoinError> =
            tokio::task::spawn_blocking(|| panic!("worker died")).await;
        assert!(result.as_ref().is_err_and(|e| e.is_panic()));
        log_join_failure("test", result);
    }

    #[test]
    fn document_format_by_extension() {
        assert_eq!(document_format(Path::new("x.PBM")), Some(PBM_FORMAT));
        assert_eq!(document_format(Path::new("x.pwg")), Some("image/pwg-raster"));
        assert_eq!(document_format(Path::new("x.txt")), None);
        assert_eq!(document_format(Path::new("noext")), None);
    }
}
