//! Lazily initialized bridge between the MCP surface and the rule system.

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::bootstrap::{BootstrapStats, Bootstrapper, SourceValidationReport};
use crate::config::ConfigError;
use crate::mcp::format::RuleMetadata;
use crate::repository::{QueryCriteria, RepositoryError, RepositoryStats, RuleRepository};

/// Errors surfaced by the MCP-facing rule service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bootstrapping from the environment failed.
    #[error("failed to initialize rule system: {0}")]
    Init(#[from] ConfigError),
    /// A repository lookup or content fetch failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug)]
struct ServiceState {
    repository: RuleRepository,
    stats: BootstrapStats,
    sources: SourceValidationReport,
}

/// Read-side service the MCP handlers consume.
///
/// The repository is bootstrapped from environment configuration on first
/// access and immutable afterwards, so handlers can share the service freely
/// across concurrent requests.
#[derive(Debug, Default)]
pub struct RuleService {
    cell: OnceCell<ServiceState>,
}

impl RuleService {
    /// Empty, not-yet-initialized service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bootstrap from the environment if that has not happened yet.
    ///
    /// Idempotent: a successful bootstrap is reused for the process lifetime,
    /// while a failed attempt is retried on the next call.
    pub async fn initialize(&self) -> Result<(), ServiceError> {
        self.state().await.map(|_| ())
    }

    async fn state(&self) -> Result<&ServiceState, ServiceError> {
        self.cell
            .get_or_try_init(|| async {
                let bootstrapper = Bootstrapper::from_environment()?;
                let sources = bootstrapper.validate_sources();
                let outcome = bootstrapper.bootstrap();
                tracing::info!(rules = outcome.repository.len(), "Rule system initialized");
                Ok::<_, ConfigError>(ServiceState {
                    repository: outcome.repository,
                    stats: outcome.stats,
                    sources,
                })
            })
            .await
            .map_err(ServiceError::from)
    }

    /// Metadata for every non-core rule, optionally scoped by context.
    ///
    /// With no filter only context-less rules are listed; with a filter,
    /// context-less rules are listed alongside rules whose context matches
    /// case-insensitively.
    pub async fn list_metadata(
        &self,
        context_filter: Option<&str>,
    ) -> Result<Vec<RuleMetadata>, ServiceError> {
        let state = self.state().await?;
        let criteria = QueryCriteria {
            context: context_filter.map(str::to_string),
            is_core: Some(false),
            ..QueryCriteria::default()
        };
        Ok(state
            .repository
            .query(&criteria)
            .into_iter()
            .map(RuleMetadata::from_rule)
            .collect())
    }

    /// Body text of the rule stored under `rule_id`.
    pub async fn rule_content(&self, rule_id: &str) -> Result<String, ServiceError> {
        let state = self.state().await?;
        Ok(state.repository.content(rule_id)?)
    }

    /// Whether a rule is stored under `rule_id`.
    pub async fn rule_exists(&self, rule_id: &str) -> Result<bool, ServiceError> {
        Ok(self.state().await?.repository.contains(rule_id))
    }

    /// Distinct context labels present in the repository, sorted.
    pub async fn contexts(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.state().await?.repository.available_contexts())
    }

    /// Body text of every core rule, in rule-id order.
    ///
    /// Content-load failures propagate as typed errors.
    pub async fn core_rule_contents(&self) -> Result<Vec<String>, ServiceError> {
        let state = self.state().await?;
        let mut contents = Vec::new();
        for rule in state.repository.all().filter(|rule| rule.is_core()) {
            contents.push(rule.load_content().map_err(RepositoryError::from)?);
        }
        Ok(contents)
    }

    /// Aggregate repository statistics.
    pub async fn repository_stats(&self) -> Result<RepositoryStats, ServiceError> {
        Ok(self.state().await?.repository.stats())
    }

    /// Statistics captured by the bootstrap run.
    pub async fn bootstrap_stats(&self) -> Result<&BootstrapStats, ServiceError> {
        Ok(&self.state().await?.stats)
    }

    /// Pre-flight source report captured at initialization.
    pub async fn sources(&self) -> Result<&SourceValidationReport, ServiceError> {
        Ok(&self.state().await?.sources)
    }
}
