//! Loader for YAML rule documents stored in a directory.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::model::{Rule, RuleError, YamlFileContentSource};
use crate::repository::RuleRepository;

use super::{LoadError, RuleLoader};

/// On-disk shape of one rule document.
///
/// The `rule` body is captured only to assert its presence; content is read
/// lazily through [`YamlFileContentSource`].
#[derive(Debug, Deserialize)]
struct RuleDocument {
    id: String,
    description: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    is_core: bool,
    #[allow(dead_code)]
    rule: serde_yaml::Value,
}

#[derive(Debug, Error)]
enum DocumentError {
    #[error("file read error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML structure in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid rule in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: RuleError,
    },
}

/// Validation outcome for a single rule document.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileValidation {
    /// Path of the checked document.
    pub file: String,
    /// Whether the document parses into a valid rule.
    pub valid: bool,
    /// Problems found; empty when valid.
    pub errors: Vec<String>,
    /// Parsed rule id, when valid.
    pub rule_id: Option<String>,
}

/// Validation outcome for a whole rules directory.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryValidation {
    /// Whether the configured directory exists.
    pub directory_exists: bool,
    /// Number of documents found.
    pub total_files: usize,
    /// Documents that parse into valid rules.
    pub valid_files: usize,
    /// Documents that do not.
    pub invalid_files: usize,
    /// Per-document outcomes, in file-name order.
    pub files: Vec<FileValidation>,
}

/// Loads rule documents from `*.yaml`/`*.yml` files directly under one directory.
///
/// Enumeration is non-recursive and sorted by file name for determinism.
#[derive(Debug, Clone)]
pub struct YamlRuleLoader {
    directory: PathBuf,
}

impl YamlRuleLoader {
    /// Loader over `directory`; the path is checked at load time.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Directory the loader reads from.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn yaml_files(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.into_path()),
                Err(error) => {
                    tracing::warn!(%error, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|path| path.is_file() && has_yaml_extension(path))
            .collect()
    }

    fn load_rule_from_file(&self, path: &Path) -> Result<Rule, DocumentError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: RuleDocument =
            serde_yaml::from_str(&raw).map_err(|source| DocumentError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        // The original format spells "no language" both as YAML null and as
        // the literal string "null".
        let language = document.language.filter(|value| value != "null");

        let mut rule = Rule::new(
            document.id,
            document.description,
            Box::new(YamlFileContentSource::new(path)),
        )
        .map_err(|source| DocumentError::Invalid {
            path: path.to_path_buf(),
            source,
        })?
        .with_tags(document.tags)
        .with_core(document.is_core);
        if let Some(language) = language {
            rule = rule.with_language(language);
        }
        if let Some(context) = document.context {
            rule = rule.with_context(context);
        }
        Ok(rule)
    }

    /// Check a single document without touching a repository.
    pub fn validate_file(&self, path: &Path) -> FileValidation {
        match self.load_rule_from_file(path) {
            Ok(rule) => FileValidation {
                file: path.display().to_string(),
                valid: true,
                errors: Vec::new(),
                rule_id: Some(rule.rule_id().to_string()),
            },
            Err(error) => FileValidation {
                file: path.display().to_string(),
                valid: false,
                errors: vec![error.to_string()],
                rule_id: None,
            },
        }
    }

    /// Check every document under the directory without touching a repository.
    pub fn validate_all(&self) -> DirectoryValidation {
        if !self.directory.exists() {
            return DirectoryValidation {
                directory_exists: false,
                total_files: 0,
                valid_files: 0,
                invalid_files: 0,
                files: Vec::new(),
            };
        }

        let files: Vec<FileValidation> = self
            .yaml_files()
            .iter()
            .map(|path| self.validate_file(path))
            .collect();
        let valid_files = files.iter().filter(|file| file.valid).count();
        DirectoryValidation {
            directory_exists: true,
            total_files: files.len(),
            valid_files,
            invalid_files: files.len() - valid_files,
            files,
        }
    }
}

impl RuleLoader for YamlRuleLoader {
    fn load_into(&self, repository: &mut RuleRepository) -> Result<usize, LoadError> {
        if !self.directory.exists() {
            return Err(LoadError::DirectoryNotFound {
                path: self.directory.clone(),
            });
        }
        if !self.directory.is_dir() {
            return Err(LoadError::NotADirectory {
                path: self.directory.clone(),
            });
        }

        let mut loaded = 0;
        for path in self.yaml_files() {
            let rule = match self.load_rule_from_file(&path) {
                Ok(rule) => rule,
                Err(error) => {
                    tracing::warn!(file = %path.display(), %error, "Skipping rule file");
                    continue;
                }
            };
            let rule_id = rule.rule_id().to_string();
            match repository.add(rule) {
                Ok(()) => {
                    loaded += 1;
                    tracing::debug!(rule_id = %rule_id, file = %path.display(), "Loaded rule");
                }
                Err(error) => {
                    tracing::warn!(file = %path.display(), %error, "Skipping rule file");
                }
            }
        }
        Ok(loaded)
    }
}

fn has_yaml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_rule(dir: &Path, file: &str, contents: &str) {
        fs::write(dir.join(file), contents).unwrap();
    }

    fn full_rule(id: &str) -> String {
        format!(
            "id: {id}\ndescription: rule {id}\nlanguage: rust\ntags:\n  - style\nrule: |\n  Body of {id}.\n"
        )
    }

    #[test]
    fn loads_all_valid_documents() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(dir.path(), "b.yaml", &full_rule("b"));
        write_rule(dir.path(), "a.yml", &full_rule("a"));

        let loader = YamlRuleLoader::new(dir.path());
        let mut repo = RuleRepository::new();
        assert_eq!(loader.load_into(&mut repo).unwrap(), 2);
        assert!(repo.contains("a"));
        assert!(repo.contains("b"));
        assert_eq!(repo.content("a").unwrap(), "Body of a.\n");
    }

    #[test]
    fn skips_documents_missing_required_fields() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(dir.path(), "ok.yaml", &full_rule("ok"));
        write_rule(dir.path(), "no-description.yaml", "id: broken\nrule: body\n");
        write_rule(dir.path(), "no-body.yaml", "id: b2\ndescription: d\n");
        write_rule(dir.path(), "garbage.yaml", ":\n  - [unbalanced\n");

        let loader = YamlRuleLoader::new(dir.path());
        let mut repo = RuleRepository::new();
        assert_eq!(loader.load_into(&mut repo).unwrap(), 1);
        assert_eq!(repo.ids(), ["ok"]);
    }

    #[test]
    fn duplicate_ids_keep_the_first_document() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(
            dir.path(),
            "a.yaml",
            "id: dup\ndescription: first\nrule: first body\n",
        );
        write_rule(
            dir.path(),
            "b.yaml",
            "id: dup\ndescription: second\nrule: second body\n",
        );

        let loader = YamlRuleLoader::new(dir.path());
        let mut repo = RuleRepository::new();
        assert_eq!(loader.load_into(&mut repo).unwrap(), 1);
        assert_eq!(repo.get("dup").unwrap().description(), "first");
    }

    #[test]
    fn enumeration_is_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(dir.path(), "top.yaml", &full_rule("top"));
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write_rule(&nested, "hidden.yaml", &full_rule("hidden"));
        write_rule(dir.path(), "notes.txt", "not yaml");

        let loader = YamlRuleLoader::new(dir.path());
        let mut repo = RuleRepository::new();
        assert_eq!(loader.load_into(&mut repo).unwrap(), 1);
        assert_eq!(repo.ids(), ["top"]);
    }

    #[test]
    fn missing_directory_is_a_source_level_error() {
        let loader = YamlRuleLoader::new("/definitely/not/here");
        let mut repo = RuleRepository::new();
        assert!(matches!(
            loader.load_into(&mut repo),
            Err(LoadError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn optional_fields_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(
            dir.path(),
            "rich.yaml",
            "id: rich\ndescription: d\nlanguage: Rust\ntags:\n  - '  A '\n  - b\n  - ''\ncontext: proj1\nis_core: true\nrule: body\n",
        );
        write_rule(
            dir.path(),
            "null-language.yaml",
            "id: bare\ndescription: d\nlanguage: 'null'\nrule: body\n",
        );

        let loader = YamlRuleLoader::new(dir.path());
        let mut repo = RuleRepository::new();
        assert_eq!(loader.load_into(&mut repo).unwrap(), 2);

        let rich = repo.get("rich").unwrap();
        assert_eq!(rich.language(), Some("Rust"));
        assert_eq!(rich.tags(), ["A", "b"]);
        assert_eq!(rich.context(), Some("proj1"));
        assert!(rich.is_core());

        let bare = repo.get("bare").unwrap();
        assert_eq!(bare.language(), None);
        assert!(!bare.is_core());
    }

    #[test]
    fn validate_all_reports_per_file_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(dir.path(), "ok.yaml", &full_rule("ok"));
        write_rule(dir.path(), "broken.yaml", "description: no id\nrule: body\n");

        let loader = YamlRuleLoader::new(dir.path());
        let report = loader.validate_all();
        assert!(report.directory_exists);
        assert_eq!(report.total_files, 2);
        assert_eq!(report.valid_files, 1);
        assert_eq!(report.invalid_files, 1);
        let broken = report.files.iter().find(|file| !file.valid).unwrap();
        assert!(broken.rule_id.is_none());
        assert!(!broken.errors.is_empty());

        let missing = YamlRuleLoader::new("/definitely/not/here").validate_all();
        assert!(!missing.directory_exists);
    }
}
