use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::constants::DEFAULT_PREVIEW_ROWS;

#[derive(Parser)]
#[command(name = "pm25-processor")]
#[command(about = "Clean hourly PM2.5 records and summarise pollution severity per city")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean every city, then write severity and monthly summaries
    Process {
        #[arg(short, long, help = "Configuration file (TOML, YAML or JSON)")]
        config: Option<PathBuf>,

        #[arg(short, long, help = "Directory holding the city CSV files")]
        data_dir: Option<PathBuf>,

        #[arg(short, long, help = "Directory for the output tables")]
        output_dir: Option<PathBuf>,

        #[arg(long = "city", value_name = "NAME", help = "Only process this city (repeatable)")]
        cities: Vec<String>,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,

        #[arg(long, help = "Skip failing cities instead of aborting the run")]
        continue_on_error: bool,

        #[arg(long, help = "Also write a JSON summary to this path")]
        summary_json: Option<PathBuf>,

        #[arg(
            long,
            help = "Write a JSON summary to the output directory [pm25-summary-{YYMMDD}.json]"
        )]
        summary: bool,

        #[arg(short, long, help = "Hide the progress bar")]
        quiet: bool,
    },

    /// Clean every city and report row counts without writing anything
    Validate {
        #[arg(short, long, help = "Configuration file (TOML, YAML or JSON)")]
        config: Option<PathBuf>,

        #[arg(short, long, help = "Directory holding the city CSV files")]
        data_dir: Option<PathBuf>,

        #[arg(long = "city", value_name = "NAME", help = "Only validate this city (repeatable)")]
        cities: Vec<String>,

        #[arg(short, long, default_value_t = DEFAULT_PREVIEW_ROWS, help = "Cleaned records to preview per city")]
        preview: usize,
    },

    /// Print the effective configuration as JSON
    ShowConfig {
        #[arg(short, long, help = "Configuration file (TOML, YAML or JSON)")]
        config: Option<PathBuf>,
    },
}
