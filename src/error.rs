use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed value '{value}' in column '{column}'")]
    MalformedValue { column: String, value: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("No valid records to summarise")]
    EmptyDataset,

    #[error("Column '{column}' is not present in the source header")]
    Schema { column: String },

    #[error("Processing failed for city '{city}': {source}")]
    CityProcessing {
        city: String,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl ProcessingError {
    /// Wrap an error with the city it occurred in.
    pub fn for_city(city: impl Into<String>, source: ProcessingError) -> Self {
        ProcessingError::CityProcessing {
            city: city.into(),
            source: Box::new(source),
        }
    }

    /// City identifier carried by a `CityProcessing` error.
    pub fn city(&self) -> Option<&str> {
        match self {
            ProcessingError::CityProcessing { city, .. } => Some(city),
            _ => None,
        }
    }

    /// Configuration bugs abort the run whatever the failure policy.
    pub fn is_schema_error(&self) -> bool {
        match self {
            ProcessingError::Schema { .. } => true,
            ProcessingError::CityProcessing { source, .. } => source.is_schema_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_processing_carries_city() {
        let err = ProcessingError::for_city("beijing", ProcessingError::EmptyDataset);

        assert_eq!(err.city(), Some("beijing"));
        assert!(!err.is_schema_error());
        assert_eq!(
            err.to_string(),
            "Processing failed for city 'beijing': No valid records to summarise"
        );
    }

    #[test]
    fn test_schema_error_detected_through_wrapper() {
        let err = ProcessingError::for_city(
            "chengdu",
            ProcessingError::Schema {
                column: "PM_Shahepu".to_string(),
            },
        );

        assert!(err.is_schema_error());
    }
}
