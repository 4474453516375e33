//! Incident Charts - Fatal police encounter report generator
//!
//! Loads the incident dataset and its reference tables, then writes fifteen
//! descriptive charts as PNG images.

mod aggregate;
mod charts;
mod config;
mod data;
mod report;

use anyhow::{Context, Result};
use config::{ReportConfig, CONFIG_FILE};
use log::info;
use report::ReportGenerator;
use std::path::Path;

fn main() -> Result<()> {
    init_logging();

    let config = ReportConfig::load_or_default(Path::new(CONFIG_FILE))
        .with_context(|| format!("Failed to load configuration from {}", CONFIG_FILE))?;

    let summary = ReportGenerator::new(config)
        .run()
        .context("Report generation failed")?;

    let rule = "=".repeat(70);
    info!("{}", rule);
    info!("Chart generation completed successfully!");
    info!("Incidents analyzed: {}", summary.incidents);
    info!("Total charts created: {}", summary.charts.len());
    info!("Output directory: {}", summary.output_dir.display());
    info!("{}", rule);

    Ok(())
}

fn init_logging() {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
