pub mod record;
pub mod summary;

pub use record::{CleaningStats, Dataset, NumericRecord, RawRow};
pub use summary::{
    BandCounts, CityFailure, CityResult, CitySummary, MonthKey, MonthlyBucket, RunReport,
    SeverityBand, SeveritySummary,
};
