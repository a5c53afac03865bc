pub mod constants;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use filename::{
    generate_default_summary_filename, monthly_stats_filename, monthly_stats_path,
    severity_report_path,
};
pub use progress::ProgressReporter;
