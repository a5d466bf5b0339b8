//! Handler for the `list-rules` tool.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use crate::mcp::RuleService;

use super::{map_service_error, parse_arguments};

/// Request payload for the `list-rules` tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ListRulesRequest {
    /// Optional context scope; see the asymmetric context semantics.
    #[serde(default, rename = "contextFilter")]
    pub(crate) context_filter: Option<String>,
}

/// Handle the `list-rules` tool: metadata for every non-core rule visible
/// under the requested context.
pub(crate) async fn handle_list_rules(
    service: &Arc<RuleService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: ListRulesRequest = parse_arguments(arguments)?;
    let context_filter = args
        .context_filter
        .as_deref()
        .map(str::trim)
        .filter(|filter| !filter.is_empty());

    let rules = service
        .list_metadata(context_filter)
        .await
        .map_err(map_service_error)?;

    Ok(CallToolResult::structured(json!({
        "count": rules.len(),
        "rules": rules,
    })))
}
