use crate::cli::args::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::processors::{FailurePolicy, PipelineDriver};
use crate::readers::CsvRowSource;
use crate::utils::filename::generate_default_summary_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::{month_label, write_report_json, CsvTableWriter};
use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Process {
            config,
            data_dir,
            output_dir,
            cities,
            max_workers,
            continue_on_error,
            summary_json,
            summary,
            quiet,
        } => {
            let config = load_config(config.as_deref(), data_dir, output_dir)?
                .select_cities(&cities)
                .context("Invalid --city selection")?;

            println!("Processing PM2.5 data for {} cities...", config.cities.len());
            println!("Data directory: {}", config.data_dir.display());
            println!("Output directory: {}", config.output_dir.display());
            println!("Workers: {}", max_workers);

            let source = CsvRowSource::new(&config.data_dir);
            let mut sink = CsvTableWriter::new(&config.output_dir).with_context(|| {
                format!(
                    "Failed to create output directory {}",
                    config.output_dir.display()
                )
            })?;

            let policy = if continue_on_error {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            };

            let output_dir = config.output_dir.clone();
            let progress =
                ProgressReporter::new(config.cities.len() as u64, "Processing cities...", quiet);
            let driver = PipelineDriver::new(config)
                .with_max_workers(max_workers)
                .with_failure_policy(policy);

            let report = driver.run(&source, &mut sink, Some(&progress))?;
            progress.finish_with_message(&format!("Processed {} cities", report.cities.len()));

            println!("\n{}", report.summary());
            for path in sink.written_files() {
                println!("Saved {}", path.display());
            }

            let summary_path: Option<PathBuf> = match (summary_json, summary) {
                (Some(path), _) => Some(path),
                (None, true) => Some(generate_default_summary_filename(&output_dir)),
                (None, false) => None,
            };
            if let Some(path) = summary_path {
                write_report_json(&report, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Saved {}", path.display());
            }

            if !report.is_complete() {
                println!(
                    "⚠️  {} cities failed; their tables were not written",
                    report.failures.len()
                );
            }

            println!("Processing complete!");
        }

        Commands::Validate {
            config,
            data_dir,
            cities,
            preview,
        } => {
            let config = load_config(config.as_deref(), data_dir, None)?
                .select_cities(&cities)
                .context("Invalid --city selection")?;
            println!("Validating PM2.5 data...");
            println!("Data directory: {}", config.data_dir.display());

            let source = CsvRowSource::new(&config.data_dir);
            let driver = PipelineDriver::new(config);
            let mut failed = 0;

            for city in &driver.config().cities {
                match driver.clean_city(city, &source) {
                    Ok(dataset) => {
                        let stats = dataset.stats();
                        println!(
                            "\n{}: {} valid rows of {} ({:.1}%), {} with missing values, {} malformed",
                            city.name,
                            stats.valid_rows,
                            stats.total_rows,
                            stats.valid_percentage(),
                            stats.missing_value_rows,
                            stats.malformed_rows
                        );

                        if preview > 0 {
                            println!("  {:<8} {}", "month", city.stations.join(", "));
                            for record in dataset.records().iter().take(preview) {
                                let values: Vec<String> =
                                    record.stations().iter().map(|v| v.to_string()).collect();
                                println!(
                                    "  {:<8} {}",
                                    month_label(record.month_key()),
                                    values.join(", ")
                                );
                            }
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        println!("\n❌ {}", e);
                    }
                }
            }

            if failed > 0 {
                bail!("{} cities failed validation", failed);
            }
            println!("\n✅ All cities have valid data");
        }

        Commands::ShowConfig { config } => {
            let config = load_config(config.as_deref(), None, None)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(
    path: Option<&Path>,
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path).with_context(|| match path {
        Some(p) => format!("Failed to load configuration from {}", p.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    if let Some(dir) = data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(dir) = output_dir {
        config = config.with_output_dir(dir);
    }

    Ok(config)
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| anyhow!("Failed to initialise logging: {}", e))
}
