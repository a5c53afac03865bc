pub mod monthly_aggregator;
pub mod pipeline_driver;
pub mod severity_classifier;

pub use monthly_aggregator::MonthlyAggregator;
pub use pipeline_driver::{FailurePolicy, PipelineDriver};
pub use severity_classifier::SeverityClassifier;
