use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    CONFIG_ENV_PREFIX, DEFAULT_COLUMN_PREFIX, DEFAULT_DATA_DIR, DEFAULT_OUTPUT_DIR,
    MISSING_VALUE_TOKEN, MONTH_COLUMN, YEAR_COLUMN,
};

/// One city: where its hourly records live and which stations to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CityConfig {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(length(min = 1))]
    pub file: String,

    #[validate(length(min = 1))]
    pub stations: Vec<String>,
}

impl CityConfig {
    pub fn new(name: &str, file: &str, stations: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            file: file.to_string(),
            stations: stations.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Source column names for this city's stations, e.g. `PM_Dongsi`.
    pub fn station_columns(&self, prefix: &str) -> Vec<String> {
        self.stations
            .iter()
            .map(|station| format!("{}{}", prefix, station))
            .collect()
    }

    /// Common columns followed by the prefixed station columns.
    pub fn requested_columns(&self, common_columns: &[String], prefix: &str) -> Vec<String> {
        common_columns
            .iter()
            .cloned()
            .chain(self.station_columns(prefix))
            .collect()
    }

    pub fn source_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,

    pub output_dir: PathBuf,

    /// Non-station columns read from every row; the first two are year and month.
    #[validate(length(min = 2))]
    pub common_columns: Vec<String>,

    pub column_prefix: String,

    #[validate(length(min = 1))]
    pub missing_token: String,

    #[validate(length(min = 1))]
    #[validate(nested)]
    pub cities: Vec<CityConfig>,
}

impl PipelineConfig {
    /// Load configuration from an optional file, then apply `PM25_*`
    /// environment overrides (e.g. `PM25_DATA_DIR`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_cities(mut self, cities: Vec<CityConfig>) -> Self {
        self.cities = cities;
        self
    }

    /// Field validation plus the cross-field rules derive can't express.
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        let mut seen = HashSet::new();
        for city in &self.cities {
            if !seen.insert(city.name.as_str()) {
                return Err(ProcessingError::InvalidConfig(format!(
                    "city '{}' is configured more than once",
                    city.name
                )));
            }

            if city.stations.iter().any(|s| s.trim().is_empty()) {
                return Err(ProcessingError::InvalidConfig(format!(
                    "city '{}' has an empty station name",
                    city.name
                )));
            }
        }

        if self.common_columns.iter().any(|c| c.trim().is_empty()) {
            return Err(ProcessingError::InvalidConfig(
                "common column names must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn city(&self, name: &str) -> Option<&CityConfig> {
        self.cities.iter().find(|c| c.name == name)
    }

    /// Keep only the named cities, in the order given. An empty selection
    /// keeps every city.
    pub fn select_cities(self, names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self);
        }

        let cities = names
            .iter()
            .map(|name| {
                self.city(name).cloned().ok_or_else(|| {
                    ProcessingError::InvalidConfig(format!("unknown city '{}'", name))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let selected = self.with_cities(cities);
        selected.check()?;
        Ok(selected)
    }

    pub fn requested_columns(&self, city: &CityConfig) -> Vec<String> {
        city.requested_columns(&self.common_columns, &self.column_prefix)
    }
}

impl Default for PipelineConfig {
    /// The five-city PM2.5 dataset (hourly records, 2010-2015).
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            common_columns: vec![YEAR_COLUMN.to_string(), MONTH_COLUMN.to_string()],
            column_prefix: DEFAULT_COLUMN_PREFIX.to_string(),
            missing_token: MISSING_VALUE_TOKEN.to_string(),
            cities: vec![
                CityConfig::new(
                    "beijing",
                    "BeijingPM20100101_20151231.csv",
                    &["Dongsi", "Dongsihuan", "Nongzhanguan"],
                ),
                CityConfig::new(
                    "chengdu",
                    "ChengduPM20100101_20151231.csv",
                    &["Caotangsi", "Shahepu"],
                ),
                CityConfig::new(
                    "guangzhou",
                    "GuangzhouPM20100101_20151231.csv",
                    &["City Station", "5th Middle School"],
                ),
                CityConfig::new(
                    "shanghai",
                    "ShanghaiPM20100101_20151231.csv",
                    &["Jingan", "Xuhui"],
                ),
                CityConfig::new(
                    "shenyang",
                    "ShenyangPM20100101_20151231.csv",
                    &["Taiyuanjie", "Xiaoheyan"],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();

        assert!(config.check().is_ok());
        assert_eq!(config.cities.len(), 5);
        assert_eq!(config.common_columns, vec!["year", "month"]);
    }

    #[test]
    fn test_requested_columns() {
        let config = PipelineConfig::default();
        let beijing = config.city("beijing").unwrap();

        assert_eq!(
            config.requested_columns(beijing),
            vec![
                "year",
                "month",
                "PM_Dongsi",
                "PM_Dongsihuan",
                "PM_Nongzhanguan"
            ]
        );
    }

    #[test]
    fn test_source_path() {
        let city = CityConfig::new("chengdu", "chengdu.csv", &["Shahepu"]);
        assert_eq!(
            city.source_path(Path::new("data")),
            PathBuf::from("data/chengdu.csv")
        );
    }

    #[test]
    fn test_city_without_stations_is_invalid() {
        let config =
            PipelineConfig::default().with_cities(vec![CityConfig::new("x", "x.csv", &[])]);
        assert!(matches!(config.check(), Err(ProcessingError::Validation(_))));
    }

    #[test]
    fn test_duplicate_city_is_invalid() {
        let config = PipelineConfig::default().with_cities(vec![
            CityConfig::new("x", "x.csv", &["A"]),
            CityConfig::new("x", "y.csv", &["B"]),
        ]);
        assert!(matches!(
            config.check(),
            Err(ProcessingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_single_common_column_is_invalid() {
        let mut config = PipelineConfig::default();
        config.common_columns = vec!["year".to_string()];
        assert!(config.check().is_err());
    }

    #[test]
    fn test_select_cities_keeps_given_order() {
        let config = PipelineConfig::default()
            .select_cities(&["shenyang".to_string(), "beijing".to_string()])
            .unwrap();

        let names: Vec<&str> = config.cities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["shenyang", "beijing"]);
    }

    #[test]
    fn test_select_cities_rejects_unknown_and_duplicates() {
        assert!(matches!(
            PipelineConfig::default().select_cities(&["atlantis".to_string()]),
            Err(ProcessingError::InvalidConfig(_))
        ));
        assert!(PipelineConfig::default()
            .select_cities(&["chengdu".to_string(), "chengdu".to_string()])
            .is_err());
        assert_eq!(
            PipelineConfig::default().select_cities(&[]).unwrap().cities.len(),
            5
        );
    }

    #[test]
    fn test_load_from_toml_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "data_dir = \"fixtures\"")?;
        writeln!(file, "[[cities]]")?;
        writeln!(file, "name = \"testcity\"")?;
        writeln!(file, "file = \"testcity.csv\"")?;
        writeln!(file, "stations = [\"A\", \"B\"]")?;

        let config = PipelineConfig::load(Some(file.path()))?;

        assert_eq!(config.data_dir, PathBuf::from("fixtures"));
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(config.missing_token, "NA");
        assert_eq!(config.cities.len(), 1);
        assert_eq!(config.cities[0].stations, vec!["A", "B"]);
        Ok(())
    }
}
