//! Environment-driven configuration discovery and parsing.
//!
//! Rule sources are configured through indexed environment bindings:
//!
//! ```text
//! RulesLoaderOptions:0:SourceType=YamlFile
//! RulesLoaderOptions:0:Path=./rules
//! RulesLoaderOptions:1:SourceType=YamlFile
//! RulesLoaderOptions:1:Path=/srv/shared-rules
//! AGENT_RULES_VALIDATION=true
//! AGENT_RULES_LOG_LEVEL=INFO
//! ```
//!
//! Keys containing `:` cannot be enumerated reliably on every platform, so
//! discovery probes a bounded range of candidate keys instead of iterating
//! the environment. The bound is [`MAX_PROBE`].

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

use crate::source::{
    SOURCE_TYPE_PROPERTY, SourceConfig, SourceConfigConstructor, SourceRegistry, ValidationError,
};

/// Prefix shared by all indexed source bindings.
pub const ENV_PREFIX: &str = "RulesLoaderOptions";

/// Upper bound (exclusive) on probed source indices.
///
/// Discovery tests `RulesLoaderOptions:<i>:SourceType` for every `i` below
/// this bound, so sources configured at higher indices are invisible. Raise
/// the bound if a deployment ever needs that many sources.
pub const MAX_PROBE: usize = 100;

/// Environment variable toggling source validation during bootstrap.
pub const VALIDATION_ENV: &str = "AGENT_RULES_VALIDATION";

/// Environment variable selecting the default log level.
pub const LOG_LEVEL_ENV: &str = "AGENT_RULES_LOG_LEVEL";

/// Property suffixes recognized when probing an index.
///
/// Probing replaces key iteration, so only whitelisted suffixes are visible
/// to the parser; kinds carrying new properties extend this list.
const KNOWN_PROPERTIES: [&str; 7] = [
    SOURCE_TYPE_PROPERTY,
    "Path",
    "ConnectionString",
    "TableName",
    "RepoUrl",
    "Branch",
    "RulesPath",
];

const LOG_LEVELS: [&str; 4] = ["DEBUG", "INFO", "WARNING", "ERROR"];

/// Errors encountered while decoding configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No parsable source bindings were found.
    #[error("no valid rule sources found in environment variables")]
    NoSources,
    /// An index was probed but carried no recognized properties.
    #[error("no properties found for source index {index}")]
    NoProperties {
        /// Probed source index.
        index: usize,
    },
    /// An index carries properties but no `SourceType`.
    #[error("missing SourceType for index {index}")]
    MissingSourceType {
        /// Probed source index.
        index: usize,
    },
    /// The configured kind has no registered constructor.
    #[error("unsupported source type '{kind}', supported types: {supported:?}")]
    UnknownKind {
        /// Kind tag found in the environment.
        kind: String,
        /// Kinds currently registered.
        supported: Vec<String>,
    },
    /// The configured log level is not recognized.
    #[error("invalid log level: {value}")]
    InvalidLogLevel {
        /// Offending value.
        value: String,
    },
    /// A source configuration failed its own invariants.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Read access to a flat, string-keyed environment.
///
/// The production implementation reads the process environment; tests use a
/// map-backed implementation so probing can be exercised hermetically.
pub trait Environment: Send + Sync {
    /// Value of `key`, when set.
    fn var(&self, key: &str) -> Option<String>;

    /// Whether `key` is set.
    fn contains(&self, key: &str) -> bool {
        self.var(key).is_some()
    }
}

/// Process-backed [`Environment`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Map-backed [`Environment`] for tests and hermetic callers.
#[derive(Debug, Default, Clone)]
pub struct MapEnvironment {
    vars: BTreeMap<String, String>,
}

impl MapEnvironment {
    /// Environment holding the given `(key, value)` pairs.
    pub fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Set `key` to `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }
}

impl Environment for MapEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Validated bootstrap configuration decoded from the environment.
#[derive(Debug)]
pub struct BootstrapConfiguration {
    sources: Vec<Box<dyn SourceConfig>>,
    validation_enabled: bool,
    log_level: String,
}

impl BootstrapConfiguration {
    /// Build a configuration, enforcing the non-empty sources invariant.
    pub fn new(
        sources: Vec<Box<dyn SourceConfig>>,
        validation_enabled: bool,
        log_level: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let log_level = log_level.into().to_uppercase();
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(ConfigError::InvalidLogLevel { value: log_level });
        }
        Ok(Self {
            sources,
            validation_enabled,
            log_level,
        })
    }

    /// Configured sources in ascending index order.
    pub fn sources(&self) -> &[Box<dyn SourceConfig>] {
        &self.sources
    }

    /// Whether sources are validated before loading.
    pub fn validation_enabled(&self) -> bool {
        self.validation_enabled
    }

    /// Default log level for the process.
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Outcome of a non-mutating environment validation pass.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentReport {
    /// Whether the environment can produce at least one source.
    pub valid: bool,
    /// Fatal problems preventing bootstrap.
    pub errors: Vec<String>,
    /// Per-index problems that bootstrap would skip over.
    pub warnings: Vec<String>,
    /// Number of indices discovered.
    pub sources_found: usize,
    /// Discovered indices, ascending.
    pub indices: Vec<usize>,
}

/// Parser decoding indexed source bindings into a [`BootstrapConfiguration`].
#[derive(Debug)]
pub struct EnvConfigParser<E = ProcessEnvironment> {
    env: E,
    registry: SourceRegistry,
}

impl EnvConfigParser<ProcessEnvironment> {
    /// Parser over the process environment with the built-in kinds.
    pub fn from_process_env() -> Self {
        Self::new(ProcessEnvironment)
    }
}

impl<E: Environment> EnvConfigParser<E> {
    /// Parser over `env` with the built-in kinds registered.
    pub fn new(env: E) -> Self {
        Self::with_registry(env, SourceRegistry::default())
    }

    /// Parser over `env` using a caller-supplied kind registry.
    pub fn with_registry(env: E, registry: SourceRegistry) -> Self {
        Self { env, registry }
    }

    /// Register an additional source kind at runtime.
    pub fn register_kind(&mut self, kind: impl Into<String>, constructor: SourceConfigConstructor) {
        self.registry.register(kind, constructor);
    }

    /// Kind names the parser currently accepts.
    pub fn supported_kinds(&self) -> Vec<String> {
        self.registry.kinds()
    }

    /// Discover configured source indices by bounded probing.
    ///
    /// Probes `RulesLoaderOptions:<i>:SourceType` for `i` in `0..MAX_PROBE`
    /// and returns the indices present, ascending.
    pub fn discover_indices(&self) -> Vec<usize> {
        (0..MAX_PROBE)
            .filter(|index| {
                self.env
                    .contains(&format!("{ENV_PREFIX}:{index}:{SOURCE_TYPE_PROPERTY}"))
            })
            .collect()
    }

    /// Parse the source configured at `index`.
    pub fn parse_source(&self, index: usize) -> Result<Box<dyn SourceConfig>, ConfigError> {
        let mut properties = BTreeMap::new();
        for suffix in KNOWN_PROPERTIES {
            let key = format!("{ENV_PREFIX}:{index}:{suffix}");
            if let Some(value) = self.env.var(&key) {
                properties.insert(suffix.to_string(), value);
            }
        }
        if properties.is_empty() {
            return Err(ConfigError::NoProperties { index });
        }
        let Some(kind) = properties.get(SOURCE_TYPE_PROPERTY).cloned() else {
            return Err(ConfigError::MissingSourceType { index });
        };
        self.registry.create(&kind, properties)
    }

    /// Parse every discovered source, skipping unparseable indices with a warning.
    pub fn parse_sources(&self) -> Vec<Box<dyn SourceConfig>> {
        let indices = self.discover_indices();
        tracing::info!(count = indices.len(), ?indices, "Discovered source indices");
        let mut sources = Vec::new();
        for index in indices {
            match self.parse_source(index) {
                Ok(source) => {
                    tracing::info!(index, kind = source.kind(), "Parsed source");
                    sources.push(source);
                }
                Err(error) => tracing::warn!(index, %error, "Failed to parse source"),
            }
        }
        sources
    }

    /// Parse the complete bootstrap configuration, including global settings.
    ///
    /// Fails with [`ConfigError::NoSources`] when no index yields a valid
    /// source configuration.
    pub fn parse_bootstrap_configuration(&self) -> Result<BootstrapConfiguration, ConfigError> {
        let sources = self.parse_sources();
        let validation_enabled = self.parse_bool(VALIDATION_ENV, true);
        let log_level = self
            .env
            .var(LOG_LEVEL_ENV)
            .unwrap_or_else(|| "INFO".to_string());
        BootstrapConfiguration::new(sources, validation_enabled, log_level)
    }

    /// Validate the environment without constructing a configuration.
    ///
    /// Unparseable individual sources become warnings; only the complete
    /// absence of bindings is an error.
    pub fn validate_environment(&self) -> EnvironmentReport {
        let indices = self.discover_indices();
        let mut report = EnvironmentReport {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            sources_found: indices.len(),
            indices: indices.clone(),
        };

        if indices.is_empty() {
            report.valid = false;
            report
                .errors
                .push(format!("no {ENV_PREFIX} bindings found in environment"));
            return report;
        }

        for index in indices {
            if let Err(error) = self.parse_source(index) {
                report.warnings.push(format!("source {index}: {error}"));
            }
        }

        report
    }

    fn parse_bool(&self, key: &str, default: bool) -> bool {
        match self.env.var(key) {
            Some(value) => matches!(
                value.to_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ),
            None => default,
        }
    }
}
