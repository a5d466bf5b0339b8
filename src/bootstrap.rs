//! Bootstrap orchestration across configured rule sources.
//!
//! A run walks `idle → loading (per source) → aggregated`: every configured
//! source is attempted in ascending index order, a failing source is recorded
//! in its [`LoadResult`] and never aborts the remaining sources, and the
//! accumulated repository plus aggregate statistics are handed back to the
//! caller.

use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::{Serialize, Serializer};

use crate::config::{BootstrapConfiguration, ConfigError, EnvConfigParser};
use crate::loader::LoaderFactory;
use crate::repository::RuleRepository;
use crate::source::SourceConfig;

/// Outcome status of one source load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// The source has not been attempted yet.
    Pending,
    /// The source loaded without a source-level error.
    Success,
    /// Source validation or loading failed.
    Failed,
}

/// Per-source outcome of a bootstrap run.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    /// Position of the source in the configured order.
    pub source_index: usize,
    /// Kind tag of the source.
    pub source_kind: String,
    /// Filesystem path of the source, when the kind has one.
    pub source_path: Option<String>,
    /// Final status of the attempt.
    pub status: LoadStatus,
    /// Number of rules the source contributed.
    pub rules_loaded: usize,
    /// Source-level error message, when failed.
    pub error: Option<String>,
    /// Wall-clock time spent on the source, in seconds.
    #[serde(serialize_with = "duration_secs")]
    #[schemars(with = "f64")]
    pub elapsed: Duration,
}

impl LoadResult {
    fn pending(source_index: usize, source: &dyn SourceConfig) -> Self {
        Self {
            source_index,
            source_kind: source.kind().to_string(),
            source_path: source.path().map(str::to_string),
            status: LoadStatus::Pending,
            rules_loaded: 0,
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Whether the source loaded successfully.
    pub fn is_success(&self) -> bool {
        self.status == LoadStatus::Success
    }

    /// Whether the source failed.
    pub fn is_failed(&self) -> bool {
        self.status == LoadStatus::Failed
    }
}

/// Aggregate statistics over one bootstrap run.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapStats {
    /// Number of configured sources.
    pub total_sources: usize,
    /// Sources that loaded.
    pub successful_sources: usize,
    /// Sources that failed.
    pub failed_sources: usize,
    /// Rules contributed across all successful sources.
    pub total_rules_loaded: usize,
    /// Wall-clock time of the whole run, in seconds.
    #[serde(serialize_with = "duration_secs")]
    #[schemars(with = "f64")]
    pub total_elapsed: Duration,
    /// Per-source results, in source order.
    pub source_results: Vec<LoadResult>,
}

impl BootstrapStats {
    /// Success rate over configured sources, as a percentage.
    ///
    /// Zero when no sources were configured.
    pub fn success_rate(&self) -> f64 {
        if self.total_sources == 0 {
            return 0.0;
        }
        self.successful_sources as f64 / self.total_sources as f64 * 100.0
    }

    /// Results for sources that loaded.
    pub fn successful(&self) -> impl Iterator<Item = &LoadResult> {
        self.source_results.iter().filter(|result| result.is_success())
    }

    /// Results for sources that failed.
    pub fn failed(&self) -> impl Iterator<Item = &LoadResult> {
        self.source_results.iter().filter(|result| result.is_failed())
    }
}

/// Product of a bootstrap run.
#[derive(Debug)]
pub struct BootstrapOutcome {
    /// Repository holding every successfully loaded rule.
    pub repository: RuleRepository,
    /// Aggregate statistics for the run.
    pub stats: BootstrapStats,
}

/// Pre-flight validation report across all configured sources.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceValidationReport {
    /// Whether every source validated and produced a loader.
    pub valid: bool,
    /// Aggregated error strings across failing sources.
    pub errors: Vec<String>,
    /// Per-source outcomes, in source order.
    pub sources: Vec<SourceCheck>,
}

/// Pre-flight outcome for a single source.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceCheck {
    /// Position of the source in the configured order.
    pub index: usize,
    /// Kind tag of the source.
    pub kind: String,
    /// Filesystem path of the source, when the kind has one.
    pub path: Option<String>,
    /// Whether the source validated and produced a loader.
    pub valid: bool,
    /// Problems found; empty when valid.
    pub errors: Vec<String>,
}

/// Orchestrates configuration discovery, per-source loading, and statistics.
pub struct Bootstrapper {
    config: BootstrapConfiguration,
    factory: LoaderFactory,
}

impl Bootstrapper {
    /// Bootstrapper over `config` with the built-in loader kinds.
    pub fn new(config: BootstrapConfiguration) -> Self {
        Self::with_factory(config, LoaderFactory::new())
    }

    /// Bootstrapper with a caller-supplied loader factory.
    pub fn with_factory(config: BootstrapConfiguration, factory: LoaderFactory) -> Self {
        Self { config, factory }
    }

    /// Bootstrapper configured from the process environment.
    pub fn from_environment() -> Result<Self, ConfigError> {
        let parser = EnvConfigParser::from_process_env();
        let config = parser.parse_bootstrap_configuration()?;
        Ok(Self::new(config))
    }

    /// The active configuration.
    pub fn config(&self) -> &BootstrapConfiguration {
        &self.config
    }

    /// Load every configured source into a fresh repository.
    ///
    /// The same repository accumulates rules across all sources, so an id
    /// collision across two sources surfaces as a skipped document inside
    /// whichever source loads second.
    pub fn bootstrap(&self) -> BootstrapOutcome {
        let started = Instant::now();
        let mut repository = RuleRepository::new();
        tracing::info!(sources = self.config.sources().len(), "Starting bootstrap");

        let mut source_results = Vec::with_capacity(self.config.sources().len());
        for (index, source) in self.config.sources().iter().enumerate() {
            source_results.push(self.load_source(index, source.as_ref(), &mut repository));
        }

        let stats = aggregate(source_results, started.elapsed());
        log_summary(&stats);
        BootstrapOutcome { repository, stats }
    }

    /// Validate every configured source and its loader without loading rules.
    pub fn validate_sources(&self) -> SourceValidationReport {
        let mut report = SourceValidationReport {
            valid: true,
            errors: Vec::new(),
            sources: Vec::new(),
        };
        for (index, source) in self.config.sources().iter().enumerate() {
            let mut check = SourceCheck {
                index,
                kind: source.kind().to_string(),
                path: source.path().map(str::to_string),
                valid: true,
                errors: Vec::new(),
            };
            let outcome = source
                .validate()
                .map_err(ConfigError::from)
                .and_then(|()| self.factory.create_loader(source.as_ref()).map(|_| ()));
            if let Err(error) = outcome {
                check.valid = false;
                check.errors.push(error.to_string());
                report.valid = false;
                report.errors.push(format!("source {index}: {error}"));
            }
            report.sources.push(check);
        }
        report
    }

    fn load_source(
        &self,
        index: usize,
        source: &dyn SourceConfig,
        repository: &mut RuleRepository,
    ) -> LoadResult {
        let mut result = LoadResult::pending(index, source);
        let started = Instant::now();
        tracing::info!(index, kind = source.kind(), "Loading source");

        let attempt = self.try_load(source, repository);
        result.elapsed = started.elapsed();
        match attempt {
            Ok(rules_loaded) => {
                result.status = LoadStatus::Success;
                result.rules_loaded = rules_loaded;
                tracing::info!(index, rules_loaded, "Source loaded");
            }
            Err(error) => {
                result.status = LoadStatus::Failed;
                tracing::error!(index, %error, "Source failed");
                result.error = Some(error);
            }
        }
        result
    }

    fn try_load(
        &self,
        source: &dyn SourceConfig,
        repository: &mut RuleRepository,
    ) -> Result<usize, String> {
        if self.config.validation_enabled() {
            source.validate().map_err(|error| error.to_string())?;
        }
        let loader = self
            .factory
            .create_loader(source)
            .map_err(|error| error.to_string())?;
        loader.load_into(repository).map_err(|error| error.to_string())
    }
}

fn aggregate(source_results: Vec<LoadResult>, total_elapsed: Duration) -> BootstrapStats {
    let successful_sources = source_results.iter().filter(|r| r.is_success()).count();
    let failed_sources = source_results.iter().filter(|r| r.is_failed()).count();
    let total_rules_loaded = source_results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| r.rules_loaded)
        .sum();
    BootstrapStats {
        total_sources: source_results.len(),
        successful_sources,
        failed_sources,
        total_rules_loaded,
        total_elapsed,
        source_results,
    }
}

fn log_summary(stats: &BootstrapStats) {
    tracing::info!(
        elapsed = ?stats.total_elapsed,
        successful = stats.successful_sources,
        total = stats.total_sources,
        rules = stats.total_rules_loaded,
        "Bootstrap complete"
    );
    for failed in stats.failed() {
        tracing::warn!(
            index = failed.source_index,
            error = failed.error.as_deref().unwrap_or_default(),
            "Source failed to load"
        );
    }
}

fn duration_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapEnvironment;
    use std::path::Path;

    fn write_rule(dir: &Path, file: &str, id: &str) {
        std::fs::write(
            dir.join(file),
            format!("id: {id}\ndescription: rule {id}\nrule: body of {id}\n"),
        )
        .unwrap();
    }

    fn env_for(paths: &[&str]) -> MapEnvironment {
        let mut env = MapEnvironment::default();
        for (index, path) in paths.iter().enumerate() {
            env.set(format!("RulesLoaderOptions:{index}:SourceType"), "YamlFile");
            env.set(format!("RulesLoaderOptions:{index}:Path"), *path);
        }
        env
    }

    fn bootstrapper_for(paths: &[&str]) -> Bootstrapper {
        let parser = EnvConfigParser::new(env_for(paths));
        Bootstrapper::new(parser.parse_bootstrap_configuration().unwrap())
    }

    #[test]
    fn failed_source_never_aborts_the_run() {
        let good = tempfile::tempdir().unwrap();
        write_rule(good.path(), "a.yaml", "a");
        write_rule(good.path(), "b.yaml", "b");

        let bootstrapper =
            bootstrapper_for(&["/definitely/not/here", good.path().to_str().unwrap()]);
        let outcome = bootstrapper.bootstrap();

        assert_eq!(outcome.repository.len(), 2);
        assert_eq!(outcome.stats.total_sources, 2);
        assert_eq!(outcome.stats.failed_sources, 1);
        assert_eq!(outcome.stats.successful_sources, 1);
        assert_eq!(outcome.stats.total_rules_loaded, 2);

        let failed: Vec<_> = outcome.stats.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].source_index, 0);
        assert!(failed[0].error.is_some());
    }

    #[test]
    fn cross_source_duplicates_keep_the_first_source() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(
            first.path().join("dup.yaml"),
            "id: dup\ndescription: from first\nrule: body\n",
        )
        .unwrap();
        std::fs::write(
            second.path().join("dup.yaml"),
            "id: dup\ndescription: from second\nrule: body\n",
        )
        .unwrap();
        write_rule(second.path(), "extra.yaml", "extra");

        let bootstrapper = bootstrapper_for(&[
            first.path().to_str().unwrap(),
            second.path().to_str().unwrap(),
        ]);
        let outcome = bootstrapper.bootstrap();

        // The collision is a skipped document, not a source failure.
        assert_eq!(outcome.stats.failed_sources, 0);
        assert_eq!(outcome.stats.total_rules_loaded, 2);
        assert_eq!(
            outcome.repository.get("dup").unwrap().description(),
            "from first"
        );
    }

    #[test]
    fn success_rate_tracks_successful_over_total() {
        let good_a = tempfile::tempdir().unwrap();
        let good_b = tempfile::tempdir().unwrap();
        write_rule(good_a.path(), "a.yaml", "a");
        write_rule(good_b.path(), "b.yaml", "b");

        let bootstrapper = bootstrapper_for(&[
            good_a.path().to_str().unwrap(),
            good_b.path().to_str().unwrap(),
            "/definitely/not/here",
        ]);
        let outcome = bootstrapper.bootstrap();
        let rate = outcome.stats.success_rate();
        assert!((rate - 200.0 / 3.0).abs() < 1e-9, "rate was {rate}");
    }

    #[test]
    fn success_rate_is_zero_without_sources() {
        let stats = aggregate(Vec::new(), Duration::ZERO);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn disabled_validation_still_fails_inside_the_loader() {
        let mut env = env_for(&["/definitely/not/here"]);
        env.set(crate::config::VALIDATION_ENV, "false");
        let parser = EnvConfigParser::new(env);
        let bootstrapper = Bootstrapper::new(parser.parse_bootstrap_configuration().unwrap());

        let outcome = bootstrapper.bootstrap();
        assert_eq!(outcome.stats.failed_sources, 1);
        assert!(outcome.repository.is_empty());
    }

    #[test]
    fn validate_sources_reports_each_source() {
        let good = tempfile::tempdir().unwrap();
        let bootstrapper =
            bootstrapper_for(&[good.path().to_str().unwrap(), "/definitely/not/here"]);
        let report = bootstrapper.validate_sources();

        assert!(!report.valid);
        assert_eq!(report.sources.len(), 2);
        assert!(report.sources[0].valid);
        assert!(!report.sources[1].valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("source 1:"));
    }
}
