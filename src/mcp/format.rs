//! Formatting helpers shared across MCP handlers and resources.

use rmcp::model::ResourceContents;
use schemars::JsonSchema;
use serde::Serialize;

use crate::bootstrap::{BootstrapStats, SourceValidationReport};
use crate::model::Rule;
use crate::repository::RepositoryStats;

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Rule metadata row returned by the `list-rules` tool.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleMetadata {
    /// Unique rule identifier.
    pub rule_id: String,
    /// Human-readable description.
    pub description: String,
    /// Language the rule applies to, when scoped.
    pub language: Option<String>,
    /// Normalized tag set.
    pub tags: Vec<String>,
    /// Context scoping label, when scoped.
    pub context: Option<String>,
    /// Kind of the backing content source.
    pub source_kind: String,
}

impl RuleMetadata {
    /// Project the metadata view of `rule`.
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            rule_id: rule.rule_id().to_string(),
            description: rule.description().to_string(),
            language: rule.language().map(str::to_string),
            tags: rule.tags().to_vec(),
            context: rule.context().map(str::to_string),
            source_kind: rule.source_info().kind,
        }
    }
}

/// Combined statistics payload returned by the `rules://stats` resource.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatsSnapshot<'a> {
    /// Aggregate view over the stored rules.
    pub(crate) repository: RepositoryStats,
    /// Success-rate percentage of the bootstrap run.
    pub(crate) bootstrap_success_rate: f64,
    /// Statistics captured by the bootstrap run.
    pub(crate) bootstrap: &'a BootstrapStats,
}

/// Payload returned by the `rules://sources` resource.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SourcesSnapshot<'a> {
    /// Pre-flight validation report over the configured sources.
    pub(crate) sources: &'a SourceValidationReport,
}

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}
