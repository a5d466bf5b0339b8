//! In-memory rule repository and multi-criteria query engine.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

use crate::model::{ContentLoadError, Rule};

/// Errors raised by repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A rule with the same id is already stored; the first insertion wins.
    #[error("rule with ID '{id}' already exists")]
    DuplicateRuleId {
        /// Colliding rule id.
        id: String,
    },
    /// No rule is stored under the requested id.
    #[error("rule with ID '{id}' not found")]
    NotFound {
        /// Requested rule id.
        id: String,
    },
    /// The rule's backing content could not be loaded.
    #[error(transparent)]
    Content(#[from] ContentLoadError),
}

/// How [`QueryCriteria::tags`] entries combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagMode {
    /// At least one listed tag must match.
    #[default]
    Any,
    /// Every listed tag must match.
    All,
}

/// Composable filter set for repository queries.
///
/// Filters compose conjunctively. The context filter is asymmetric: with no
/// context requested only context-less rules are visible; with a context
/// requested, context-less rules remain visible alongside rules whose own
/// context matches case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct QueryCriteria {
    /// Exact, case-insensitive language filter.
    pub language: Option<String>,
    /// Tags to match according to `tag_mode`; `None` or empty disables the filter.
    pub tags: Option<Vec<String>>,
    /// Tag combination mode.
    pub tag_mode: TagMode,
    /// Case-insensitive substring filter over descriptions.
    pub description_contains: Option<String>,
    /// Requested context scope.
    pub context: Option<String>,
    /// Core-status filter; `None` disables it.
    pub is_core: Option<bool>,
}

/// Aggregate snapshot over the current rule set.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    /// Number of stored rules.
    pub total_rules: usize,
    /// Number of distinct languages.
    pub total_languages: usize,
    /// Number of distinct tags.
    pub total_tags: usize,
    /// Number of distinct contexts.
    pub total_contexts: usize,
    /// Distinct languages, sorted.
    pub available_languages: Vec<String>,
    /// Distinct tags, sorted.
    pub available_tags: Vec<String>,
    /// Distinct contexts, sorted.
    pub available_contexts: Vec<String>,
}

/// In-memory mapping from rule id to [`Rule`].
///
/// Iteration order is deterministic but not part of the contract; callers
/// needing a particular order must sort query results themselves.
#[derive(Debug, Default)]
pub struct RuleRepository {
    rules: BTreeMap<String, Rule>,
}

impl RuleRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `rule`; ids are unique and the first insertion wins.
    pub fn add(&mut self, rule: Rule) -> Result<(), RepositoryError> {
        if self.rules.contains_key(rule.rule_id()) {
            return Err(RepositoryError::DuplicateRuleId {
                id: rule.rule_id().to_string(),
            });
        }
        self.rules.insert(rule.rule_id().to_string(), rule);
        Ok(())
    }

    /// Replace the rule stored under `rule`'s id.
    pub fn update(&mut self, rule: Rule) -> Result<(), RepositoryError> {
        if !self.rules.contains_key(rule.rule_id()) {
            return Err(RepositoryError::NotFound {
                id: rule.rule_id().to_string(),
            });
        }
        self.rules.insert(rule.rule_id().to_string(), rule);
        Ok(())
    }

    /// Remove the rule stored under `rule_id`, returning whether it was present.
    pub fn remove(&mut self, rule_id: &str) -> bool {
        self.rules.remove(rule_id).is_some()
    }

    /// Rule stored under `rule_id`.
    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.get(rule_id)
    }

    /// Body text of the rule stored under `rule_id`, fetched on demand.
    pub fn content(&self, rule_id: &str) -> Result<String, RepositoryError> {
        let rule = self.get(rule_id).ok_or_else(|| RepositoryError::NotFound {
            id: rule_id.to_string(),
        })?;
        Ok(rule.load_content()?)
    }

    /// All stored rules.
    pub fn all(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// All stored rule ids.
    pub fn ids(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    /// Whether a rule is stored under `rule_id`.
    pub fn contains(&self, rule_id: &str) -> bool {
        self.rules.contains_key(rule_id)
    }

    /// Number of stored rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the repository holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Drop every stored rule.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Rules matching every provided criterion.
    pub fn query(&self, criteria: &QueryCriteria) -> Vec<&Rule> {
        self.rules
            .values()
            .filter(|rule| Self::matches(rule, criteria))
            .collect()
    }

    fn matches(rule: &Rule, criteria: &QueryCriteria) -> bool {
        if let Some(language) = &criteria.language {
            if !rule.matches_language(language) {
                return false;
            }
        }

        if let Some(tags) = criteria.tags.as_deref().filter(|tags| !tags.is_empty()) {
            let matched = match criteria.tag_mode {
                TagMode::Any => rule.has_any_tag(tags),
                TagMode::All => rule.has_all_tags(tags),
            };
            if !matched {
                return false;
            }
        }

        if let Some(query) = &criteria.description_contains {
            if !rule
                .description()
                .to_lowercase()
                .contains(&query.to_lowercase())
            {
                return false;
            }
        }

        match &criteria.context {
            // A context-less rule is visible under any requested context; a
            // contextual rule only under its own.
            Some(requested) => {
                if let Some(context) = rule.context() {
                    if context.to_lowercase() != requested.to_lowercase() {
                        return false;
                    }
                }
            }
            None => {
                if rule.context().is_some() {
                    return false;
                }
            }
        }

        if let Some(is_core) = criteria.is_core {
            if rule.is_core() != is_core {
                return false;
            }
        }

        true
    }

    /// Distinct languages present in the repository, sorted.
    pub fn available_languages(&self) -> Vec<String> {
        let languages: BTreeSet<String> = self
            .rules
            .values()
            .filter_map(|rule| rule.language().map(str::to_string))
            .collect();
        languages.into_iter().collect()
    }

    /// Distinct tags present in the repository, sorted.
    pub fn available_tags(&self) -> Vec<String> {
        let tags: BTreeSet<String> = self
            .rules
            .values()
            .flat_map(|rule| rule.tags().iter().cloned())
            .collect();
        tags.into_iter().collect()
    }

    /// Distinct contexts present in the repository, sorted.
    pub fn available_contexts(&self) -> Vec<String> {
        let contexts: BTreeSet<String> = self
            .rules
            .values()
            .filter_map(|rule| rule.context().map(str::to_string))
            .collect();
        contexts.into_iter().collect()
    }

    /// Aggregate counts and views over the current rule set.
    pub fn stats(&self) -> RepositoryStats {
        let available_languages = self.available_languages();
        let available_tags = self.available_tags();
        let available_contexts = self.available_contexts();
        RepositoryStats {
            total_rules: self.rules.len(),
            total_languages: available_languages.len(),
            total_tags: available_tags.len(),
            total_contexts: available_contexts.len(),
            available_languages,
            available_tags,
            available_contexts,
        }
    }
}
