//! Rule loaders and the loader factory.
//!
//! A loader populates the repository from one configured source. The
//! [`LoaderFactory`] mirrors the source kind registry: kind names map to
//! loader constructors registered at runtime, with the file-backed
//! [`YamlRuleLoader`] shipped by default.

mod yaml;

pub use yaml::{DirectoryValidation, FileValidation, YamlRuleLoader};

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::repository::RuleRepository;
use crate::source::{PATH_PROPERTY, SourceConfig, ValidationError, YAML_FILE_KIND};

/// Errors raised while loading rules from a source.
///
/// Individual document failures never surface here; they are logged and
/// skipped inside the loader.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Configured rules directory does not exist.
    #[error("rules directory not found: {path}")]
    DirectoryNotFound {
        /// Configured directory.
        path: PathBuf,
    },
    /// Configured rules path exists but is not a directory.
    #[error("rules path is not a directory: {path}")]
    NotADirectory {
        /// Configured path.
        path: PathBuf,
    },
    /// Failure specific to a runtime-registered loader kind.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Capability to populate a repository with rules from one source.
pub trait RuleLoader: std::fmt::Debug {
    /// Load every readable rule into `repository`, returning the count added.
    ///
    /// Loaders are partial-failure tolerant at document granularity: a bad
    /// document is skipped with a warning and never aborts the source.
    fn load_into(&self, repository: &mut RuleRepository) -> Result<usize, LoadError>;
}

/// Constructor registered for a loader kind.
pub type LoaderConstructor = fn(&dyn SourceConfig) -> Result<Box<dyn RuleLoader>, ConfigError>;

/// Factory mapping source configurations to concrete loaders.
pub struct LoaderFactory {
    constructors: BTreeMap<String, LoaderConstructor>,
}

impl LoaderFactory {
    /// Factory with the built-in loader kinds registered.
    pub fn new() -> Self {
        let mut factory = Self {
            constructors: BTreeMap::new(),
        };
        factory.register_loader(YAML_FILE_KIND, new_yaml_loader);
        factory
    }

    /// Register a loader constructor for `kind`, replacing any previous one.
    pub fn register_loader(&mut self, kind: impl Into<String>, constructor: LoaderConstructor) {
        let kind = kind.into();
        tracing::info!(kind = %kind, "Registered loader kind");
        self.constructors.insert(kind, constructor);
    }

    /// Whether `kind` has a registered loader.
    pub fn is_supported(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Loader kind names, sorted.
    pub fn supported_kinds(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// Create the loader matching `config`'s kind.
    pub fn create_loader(
        &self,
        config: &dyn SourceConfig,
    ) -> Result<Box<dyn RuleLoader>, ConfigError> {
        let Some(constructor) = self.constructors.get(config.kind()) else {
            return Err(ConfigError::UnknownKind {
                kind: config.kind().to_string(),
                supported: self.supported_kinds(),
            });
        };
        constructor(config)
    }
}

impl Default for LoaderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoaderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderFactory")
            .field("kinds", &self.supported_kinds())
            .finish()
    }
}

/// Constructor for the file-backed kind.
///
/// Re-validates the configuration so a loader is never built over one that
/// stopped holding its invariants.
fn new_yaml_loader(config: &dyn SourceConfig) -> Result<Box<dyn RuleLoader>, ConfigError> {
    config.validate()?;
    let path = config.path().ok_or_else(|| {
        ConfigError::Validation(ValidationError::MissingProperty {
            kind: config.kind().to_string(),
            property: PATH_PROPERTY.to_string(),
        })
    })?;
    tracing::debug!(path, "Created YamlRuleLoader");
    Ok(Box::new(YamlRuleLoader::new(path)))
}
