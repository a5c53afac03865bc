/// Literal text marking an absent measurement
pub const MISSING_VALUE_TOKEN: &str = "NA";

/// Pollutant columns are named `<prefix><station>` in the source files
pub const DEFAULT_COLUMN_PREFIX: &str = "PM_";

/// Columns preceding the station readings; year and month must come first
pub const YEAR_COLUMN: &str = "year";
pub const MONTH_COLUMN: &str = "month";

/// Severity band thresholds on the hourly station-average (µg/m³)
pub const HEAVY_THRESHOLD: f64 = 150.0;
pub const MEDIUM_THRESHOLD: f64 = 75.0;
pub const LIGHT_THRESHOLD: f64 = 35.0;

/// Directory defaults
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Output file names
pub const SEVERITY_REPORT_FILE: &str = "polluted_percentage.csv";
pub const MONTHLY_STATS_SUFFIX: &str = "_month_stats.csv";

/// Environment variable prefix for configuration overrides
pub const CONFIG_ENV_PREFIX: &str = "PM25";

/// Records shown by the validate command's preview
pub const DEFAULT_PREVIEW_ROWS: usize = 10;
