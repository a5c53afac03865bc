use crate::config::{CityConfig, PipelineConfig};
use crate::error::{ProcessingError, Result};
use crate::models::{CityResult, Dataset, RunReport};
use crate::processors::{MonthlyAggregator, SeverityClassifier};
use crate::readers::{RecordParser, RowSource};
use crate::utils::progress::ProgressReporter;
use crate::writers::ResultSink;
use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

/// What to do when a city fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run at the first failing city.
    #[default]
    Abort,
    /// Record the failure and carry on with the remaining cities.
    /// Schema errors still abort.
    Continue,
}

/// Runs load, clean, classify, aggregate and emit for every configured city.
pub struct PipelineDriver {
    config: PipelineConfig,
    max_workers: usize,
    failure_policy: FailurePolicy,
    classifier: SeverityClassifier,
    aggregator: MonthlyAggregator,
}

impl PipelineDriver {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            max_workers: 1,
            failure_policy: FailurePolicy::default(),
            classifier: SeverityClassifier::new(),
            aggregator: MonthlyAggregator::new(),
        }
    }

    /// More than one worker processes cities on a thread pool; results are
    /// still emitted in configuration order.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process all cities, hand each result to the sink, then write the
    /// cross-city severity report.
    pub fn run(
        &self,
        source: &dyn RowSource,
        sink: &mut dyn ResultSink,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunReport> {
        let mut report = RunReport::new();
        info!(
            cities = self.config.cities.len(),
            workers = self.max_workers,
            policy = ?self.failure_policy,
            "Starting pipeline run"
        );

        if self.max_workers == 1 {
            for city in &self.config.cities {
                let outcome = self.process_city(city, source);
                if let Some(p) = progress {
                    p.increment(1);
                }
                self.emit(outcome, sink, &mut report)?;
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.max_workers)
                .build()
                .map_err(|e| ProcessingError::ThreadPool(e.to_string()))?;

            // Indexed collect keeps configuration order.
            let outcomes: Vec<Result<CityResult>> = pool.install(|| {
                self.config
                    .cities
                    .par_iter()
                    .map(|city| {
                        let outcome = self.process_city(city, source);
                        if let Some(p) = progress {
                            p.increment(1);
                        }
                        outcome
                    })
                    .collect()
            });

            for outcome in outcomes {
                self.emit(outcome, sink, &mut report)?;
            }
        }

        sink.write_severity_report(&report)?;

        info!(
            succeeded = report.cities.len(),
            failed = report.failures.len(),
            "Pipeline run finished"
        );
        Ok(report)
    }

    /// Run one city end to end. Errors come back wrapped with the city name.
    pub fn process_city(&self, city: &CityConfig, source: &dyn RowSource) -> Result<CityResult> {
        let span = info_span!("city", city = %city.name);
        let _enter = span.enter();

        self.run_city(city, source)
            .map_err(|e| ProcessingError::for_city(&city.name, e))
    }

    /// Load and clean one city without summarising it.
    pub fn clean_city(&self, city: &CityConfig, source: &dyn RowSource) -> Result<Dataset> {
        self.load_and_clean(city, source)
            .map_err(|e| ProcessingError::for_city(&city.name, e))
    }

    fn run_city(&self, city: &CityConfig, source: &dyn RowSource) -> Result<CityResult> {
        let dataset = self.load_and_clean(city, source)?;

        let severity = self.classifier.classify(&dataset)?;
        debug!(?severity, "Classified hours");

        let monthly = self.aggregator.aggregate(&dataset)?;
        debug!(buckets = monthly.len(), "Aggregated months");

        Ok(CityResult {
            city: city.name.clone(),
            station_names: dataset.station_names().to_vec(),
            stats: dataset.stats(),
            severity,
            monthly,
        })
    }

    fn load_and_clean(&self, city: &CityConfig, source: &dyn RowSource) -> Result<Dataset> {
        let parser = RecordParser::for_city(&self.config, city)?;
        let rows = source.rows(city, parser.columns())?;
        let dataset = parser.parse_all(city.stations.clone(), rows)?;

        let stats = dataset.stats();
        info!(
            valid = stats.valid_rows,
            total = stats.total_rows,
            missing = stats.missing_value_rows,
            malformed = stats.malformed_rows,
            "Cleaned rows"
        );

        if dataset.is_empty() {
            return Err(ProcessingError::EmptyDataset);
        }

        Ok(dataset)
    }

    fn emit(
        &self,
        outcome: Result<CityResult>,
        sink: &mut dyn ResultSink,
        report: &mut RunReport,
    ) -> Result<()> {
        match outcome {
            Ok(result) => {
                sink.write_city(&result)
                    .map_err(|e| ProcessingError::for_city(&result.city, e))?;
                report.push_city(&result);
                Ok(())
            }
            Err(err)
                if self.failure_policy == FailurePolicy::Continue && !err.is_schema_error() =>
            {
                warn!(error = %err, "Skipping failed city");
                report.push_failure(err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
