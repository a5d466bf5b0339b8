//! Handler for the `get-rule` tool.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use crate::mcp::RuleService;

use super::{map_service_error, parse_arguments};

/// Request payload for the `get-rule` tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GetRuleRequest {
    /// Identifier of the rule to fetch.
    #[serde(rename = "ruleId")]
    pub(crate) rule_id: String,
}

/// Handle the `get-rule` tool by fetching one rule's body text on demand.
pub(crate) async fn handle_get_rule(
    service: &Arc<RuleService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: GetRuleRequest = parse_arguments(arguments)?;
    let rule_id = args.rule_id.trim();
    if rule_id.is_empty() {
        return Err(McpError::invalid_params(
            "`ruleId` must be a non-empty string",
            None,
        ));
    }

    let content = service
        .rule_content(rule_id)
        .await
        .map_err(map_service_error)?;

    Ok(CallToolResult::structured(json!({
        "ruleId": rule_id,
        "content": content,
    })))
}
