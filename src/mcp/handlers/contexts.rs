//! Handlers for the `list-contexts` and `core-rules` tools.

use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

use crate::mcp::RuleService;

use super::map_service_error;

/// Handle the `list-contexts` tool, returning every known context label.
pub(crate) async fn handle_list_contexts(
    service: &Arc<RuleService>,
) -> Result<CallToolResult, McpError> {
    let contexts = service.contexts().await.map_err(map_service_error)?;
    Ok(CallToolResult::structured(json!({
        "contexts": contexts,
    })))
}

/// Handle the `core-rules` tool, returning the body text of every core rule.
pub(crate) async fn handle_core_rules(
    service: &Arc<RuleService>,
) -> Result<CallToolResult, McpError> {
    let contents = service
        .core_rule_contents()
        .await
        .map_err(map_service_error)?;
    Ok(CallToolResult::structured(json!({
        "count": contents.len(),
        "coreRules": contents,
    })))
}
