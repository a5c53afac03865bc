use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

use crate::utils::constants::{MONTHLY_STATS_SUFFIX, SEVERITY_REPORT_FILE};

/// Monthly statistics file for a city: `<city>_month_stats.csv`
pub fn monthly_stats_filename(city: &str) -> String {
    format!("{}{}", city, MONTHLY_STATS_SUFFIX)
}

pub fn monthly_stats_path(output_dir: &Path, city: &str) -> PathBuf {
    output_dir.join(monthly_stats_filename(city))
}

pub fn severity_report_path(output_dir: &Path) -> PathBuf {
    output_dir.join(SEVERITY_REPORT_FILE)
}

/// Generate default JSON summary filename with format: pm25-summary-{YYMMDD}.json
pub fn generate_default_summary_filename(output_dir: &Path) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let filename = format!("pm25-summary-{:02}{:02}{:02}.json", year, month, day);
    output_dir.join(filename)
}
