//! Source configurations and the kind registry.
//!
//! A source describes one origin rules can be loaded from. Kinds are open for
//! extension: the [`SourceRegistry`] maps kind names to configuration
//! constructors at runtime, so new kinds can be added without touching the
//! parser. One kind ships: the file-backed [`YamlFileSourceConfig`].

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConfigError;

/// Property key carrying the source kind tag.
pub const SOURCE_TYPE_PROPERTY: &str = "SourceType";

/// Property key carrying the filesystem path of file-backed kinds.
pub const PATH_PROPERTY: &str = "Path";

/// Kind tag of the file-backed YAML source.
pub const YAML_FILE_KIND: &str = "YamlFile";

/// Errors raised when a source configuration violates its own invariants.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A property the kind requires was not configured.
    #[error("{kind} source requires `{property}` property")]
    MissingProperty {
        /// Kind tag of the offending source.
        kind: String,
        /// Name of the missing property.
        property: String,
    },
    /// The configured path does not exist.
    #[error("path does not exist: {path}")]
    PathNotFound {
        /// Configured path.
        path: PathBuf,
    },
    /// The configured path exists but is not a directory.
    #[error("path is not a directory: {path}")]
    NotADirectory {
        /// Configured path.
        path: PathBuf,
    },
    /// The configured directory cannot be read.
    #[error("directory is not readable: {path}: {source}")]
    NotReadable {
        /// Configured path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Self-validating description of one configured rule source.
///
/// Implementations are immutable after construction; [`validate`] must
/// succeed before a loader may be created from the configuration.
///
/// [`validate`]: SourceConfig::validate
pub trait SourceConfig: fmt::Debug + Send + Sync {
    /// Kind tag the source was registered under.
    fn kind(&self) -> &str;

    /// Raw properties decoded from the environment.
    fn properties(&self) -> &BTreeMap<String, String>;

    /// Check the configuration invariants for this kind.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Filesystem path of the source, when the kind has one.
    fn path(&self) -> Option<&str> {
        self.properties().get(PATH_PROPERTY).map(String::as_str)
    }
}

/// Configuration for a directory of YAML rule documents.
#[derive(Debug)]
pub struct YamlFileSourceConfig {
    properties: BTreeMap<String, String>,
}

impl YamlFileSourceConfig {
    /// Build from raw properties; invariants are checked by [`SourceConfig::validate`].
    pub fn new(properties: BTreeMap<String, String>) -> Self {
        Self { properties }
    }

    /// Configured rules directory, when present.
    pub fn directory(&self) -> Option<&Path> {
        self.properties.get(PATH_PROPERTY).map(Path::new)
    }
}

impl SourceConfig for YamlFileSourceConfig {
    fn kind(&self) -> &str {
        YAML_FILE_KIND
    }

    fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let Some(directory) = self.directory() else {
            return Err(ValidationError::MissingProperty {
                kind: YAML_FILE_KIND.into(),
                property: PATH_PROPERTY.into(),
            });
        };
        if !directory.exists() {
            return Err(ValidationError::PathNotFound {
                path: directory.to_path_buf(),
            });
        }
        if !directory.is_dir() {
            return Err(ValidationError::NotADirectory {
                path: directory.to_path_buf(),
            });
        }
        fs::read_dir(directory).map_err(|source| ValidationError::NotReadable {
            path: directory.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

/// Constructor registered for a source kind.
pub type SourceConfigConstructor =
    fn(BTreeMap<String, String>) -> Result<Box<dyn SourceConfig>, ConfigError>;

/// Registry mapping source kind names to configuration constructors.
///
/// The registry is an explicit object owned by its consumers; registering a
/// kind at runtime never affects configurations that were already parsed.
#[derive(Clone)]
pub struct SourceRegistry {
    constructors: BTreeMap<String, SourceConfigConstructor>,
}

impl SourceRegistry {
    /// Registry with no kinds registered.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry with the built-in kinds registered.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::empty();
        registry.register(YAML_FILE_KIND, |properties| {
            Ok(Box::new(YamlFileSourceConfig::new(properties)))
        });
        registry
    }

    /// Register `kind`, replacing any previous constructor under that name.
    pub fn register(&mut self, kind: impl Into<String>, constructor: SourceConfigConstructor) {
        let kind = kind.into();
        tracing::info!(kind = %kind, "Registered source kind");
        self.constructors.insert(kind, constructor);
    }

    /// Whether `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// Construct a configuration for `kind` from raw properties.
    pub fn create(
        &self,
        kind: &str,
        properties: BTreeMap<String, String>,
    ) -> Result<Box<dyn SourceConfig>, ConfigError> {
        let Some(constructor) = self.constructors.get(kind) else {
            return Err(ConfigError::UnknownKind {
                kind: kind.to_string(),
                supported: self.kinds(),
            });
        };
        constructor(properties)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_builtin_kinds()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
