//! Rule entity and on-demand content loading.
//!
//! A [`Rule`] carries identity and metadata only; its body text lives in the
//! backing resource and is fetched through a [`ContentSource`] on every
//! request. Nothing is cached, so callers always observe the current state of
//! the resource.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use thiserror::Error;

/// Errors raised when a rule's backing content cannot be produced.
#[derive(Debug, Error)]
pub enum ContentLoadError {
    /// The backing file disappeared between indexing and the content fetch.
    #[error("rule file not found: {path}")]
    FileNotFound {
        /// Path probed for the rule document.
        path: PathBuf,
    },
    /// Reading the backing file failed.
    #[error("file read error for {path}: {source}")]
    Io {
        /// Path of the rule document.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The backing file is not a well-formed YAML document.
    #[error("YAML parsing error in {path}: {source}")]
    Parse {
        /// Path of the rule document.
        path: PathBuf,
        /// Underlying parser error.
        #[source]
        source: serde_yaml::Error,
    },
    /// The document carries no `rule` body field.
    #[error("no `rule` field found in {path}")]
    MissingBody {
        /// Path of the rule document.
        path: PathBuf,
    },
}

/// Validation failures raised while constructing a [`Rule`].
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule id is empty or whitespace.
    #[error("rule ID cannot be empty")]
    EmptyId,
    /// The rule description is empty or whitespace.
    #[error("rule description cannot be empty")]
    EmptyDescription,
}

/// Descriptive snapshot of a content source.
#[derive(Debug, Clone, serde::Serialize, schemars::JsonSchema)]
pub struct SourceInfo {
    /// Source kind label (e.g. `YamlFile`).
    pub kind: String,
    /// Location of the backing resource.
    pub location: String,
    /// Whether the backing resource currently exists.
    pub exists: bool,
}

/// Capability for loading one rule's body text on demand.
pub trait ContentSource: fmt::Debug + Send + Sync {
    /// Load the rule body from the backing resource.
    fn load(&self) -> Result<String, ContentLoadError>;

    /// Describe the backing resource.
    fn describe(&self) -> SourceInfo;
}

/// Content source reading the `rule` field of a YAML document on disk.
///
/// Each [`load`](ContentSource::load) call re-reads and re-parses the file.
#[derive(Debug, Clone)]
pub struct YamlFileContentSource {
    file_path: PathBuf,
}

impl YamlFileContentSource {
    /// Content source bound to the document at `file_path`.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Path of the backing YAML document.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl ContentSource for YamlFileContentSource {
    fn load(&self) -> Result<String, ContentLoadError> {
        if !self.file_path.exists() {
            return Err(ContentLoadError::FileNotFound {
                path: self.file_path.clone(),
            });
        }
        let raw = std::fs::read_to_string(&self.file_path).map_err(|source| ContentLoadError::Io {
            path: self.file_path.clone(),
            source,
        })?;
        let document: Value = serde_yaml::from_str(&raw).map_err(|source| ContentLoadError::Parse {
            path: self.file_path.clone(),
            source,
        })?;
        let body = document
            .get("rule")
            .ok_or_else(|| ContentLoadError::MissingBody {
                path: self.file_path.clone(),
            })?;
        match body {
            Value::Null => Err(ContentLoadError::MissingBody {
                path: self.file_path.clone(),
            }),
            Value::String(text) => Ok(text.clone()),
            other => serde_yaml::to_string(other).map_err(|source| ContentLoadError::Parse {
                path: self.file_path.clone(),
                source,
            }),
        }
    }

    fn describe(&self) -> SourceInfo {
        SourceInfo {
            kind: "YamlFile".into(),
            location: self.file_path.display().to_string(),
            exists: self.file_path.exists(),
        }
    }
}

/// A named, described rule document with lazily loaded body text.
///
/// Identity and description are validated at construction. Tags are stored
/// trimmed with empty entries dropped; matching against them is
/// case-insensitive while the stored casing is preserved.
#[derive(Debug)]
pub struct Rule {
    rule_id: String,
    description: String,
    language: Option<String>,
    tags: Vec<String>,
    context: Option<String>,
    is_core: bool,
    content_source: Box<dyn ContentSource>,
}

impl Rule {
    /// Create a rule, rejecting empty identity or description.
    pub fn new(
        rule_id: impl Into<String>,
        description: impl Into<String>,
        content_source: Box<dyn ContentSource>,
    ) -> Result<Self, RuleError> {
        let rule_id = rule_id.into();
        if rule_id.trim().is_empty() {
            return Err(RuleError::EmptyId);
        }
        let description = description.into();
        if description.trim().is_empty() {
            return Err(RuleError::EmptyDescription);
        }
        Ok(Self {
            rule_id,
            description,
            language: None,
            tags: Vec::new(),
            context: None,
            is_core: false,
            content_source,
        })
    }

    /// Set the language the rule applies to.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Replace the tag set, trimming entries and dropping empty ones.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .filter_map(|tag| {
                let trimmed = tag.as_ref().trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect();
        self
    }

    /// Set the context scoping label.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Mark or unmark the rule as a core rule.
    #[must_use]
    pub fn with_core(mut self, is_core: bool) -> Self {
        self.is_core = is_core;
        self
    }

    /// Unique rule identifier.
    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Language the rule applies to, when scoped.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Normalized tag set in stored casing.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Context scoping label, when scoped.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Whether this is a core rule.
    pub fn is_core(&self) -> bool {
        self.is_core
    }

    /// Load the rule body from its content source.
    pub fn load_content(&self) -> Result<String, ContentLoadError> {
        self.content_source.load()
    }

    /// Describe the rule's content source.
    pub fn source_info(&self) -> SourceInfo {
        self.content_source.describe()
    }

    /// Whether the rule's language equals `language`, case-insensitively.
    ///
    /// A rule without a language matches nothing.
    pub fn matches_language(&self, language: &str) -> bool {
        self.language
            .as_deref()
            .is_some_and(|own| own.to_lowercase() == language.to_lowercase())
    }

    /// Whether the rule carries `tag`, case-insensitively.
    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.to_lowercase();
        self.tags.iter().any(|own| own.to_lowercase() == needle)
    }

    /// Whether the rule carries at least one of `tags`.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.has_tag(tag))
    }

    /// Whether the rule carries every one of `tags`.
    pub fn has_all_tags(&self, tags: &[String]) -> bool {
        tags.iter().all(|tag| self.has_tag(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug)]
    struct StaticContent(&'static str);

    impl ContentSource for StaticContent {
        fn load(&self) -> Result<String, ContentLoadError> {
            Ok(self.0.to_string())
        }

        fn describe(&self) -> SourceInfo {
            SourceInfo {
                kind: "Static".into(),
                location: "memory".into(),
                exists: true,
            }
        }
    }

    fn rule(id: &str, description: &str) -> Result<Rule, RuleError> {
        Rule::new(id, description, Box::new(StaticContent("body")))
    }

    #[test]
    fn new_rejects_empty_identity_and_description() {
        assert!(matches!(rule("", "d"), Err(RuleError::EmptyId)));
        assert!(matches!(rule("  ", "d"), Err(RuleError::EmptyId)));
        assert!(matches!(rule("r1", ""), Err(RuleError::EmptyDescription)));
        assert!(matches!(rule("r1", " \t"), Err(RuleError::EmptyDescription)));
    }

    #[test]
    fn with_tags_trims_and_drops_empty_entries() {
        let rule = rule("r1", "d").unwrap().with_tags(["  A ", "b", "  ", ""]);
        assert_eq!(rule.tags(), ["A", "b"]);
    }

    #[test]
    fn tag_matching_is_case_insensitive() {
        let rule = rule("r1", "d").unwrap().with_tags(["x", "Y"]);
        assert!(rule.has_tag("X"));
        assert!(rule.has_any_tag(&["x".into(), "z".into()]));
        assert!(!rule.has_all_tags(&["x".into(), "z".into()]));
        assert!(rule.has_all_tags(&["X".into(), "y".into()]));
    }

    #[test]
    fn language_matching_is_case_insensitive_and_requires_language() {
        let tagged = rule("r1", "d").unwrap().with_language("Rust");
        assert!(tagged.matches_language("rust"));
        assert!(!tagged.matches_language("python"));
        let bare = rule("r2", "d").unwrap();
        assert!(!bare.matches_language("rust"));
    }

    #[test]
    fn yaml_content_source_loads_rule_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "id: r1\ndescription: d\nrule: |\n  Always do the thing.").unwrap();

        let source = YamlFileContentSource::new(&path);
        assert_eq!(source.load().unwrap(), "Always do the thing.\n");

        let info = source.describe();
        assert_eq!(info.kind, "YamlFile");
        assert!(info.exists);
    }

    #[test]
    fn yaml_content_source_reports_missing_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.yaml");
        std::fs::write(&path, "id: r1\ndescription: d\n").unwrap();

        let source = YamlFileContentSource::new(&path);
        assert!(matches!(
            source.load(),
            Err(ContentLoadError::MissingBody { .. })
        ));
    }

    #[test]
    fn yaml_content_source_reports_vanished_file() {
        let source = YamlFileContentSource::new("/nonexistent/r1.yaml");
        assert!(matches!(
            source.load(),
            Err(ContentLoadError::FileNotFound { .. })
        ));
        assert!(!source.describe().exists);
    }
}
