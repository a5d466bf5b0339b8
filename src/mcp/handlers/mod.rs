//! Tool handlers for the MCP server.

use rmcp::{ErrorData as McpError, model::JsonObject};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::mcp::ServiceError;
use crate::repository::RepositoryError;

pub mod content;
pub mod contexts;
pub mod metadata;

/// Parse structured arguments supplied to a tool invocation.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<JsonObject>,
) -> Result<T, McpError> {
    let value = arguments
        .map(Value::Object)
        .unwrap_or_else(|| Value::Object(JsonObject::new()));
    serde_json::from_value(value)
        .map_err(|err| McpError::invalid_params(format!("Invalid arguments: {err}"), None))
}

/// Map a service error onto the MCP error taxonomy.
///
/// Unknown ids are caller mistakes; everything else is an internal failure.
pub(crate) fn map_service_error(error: ServiceError) -> McpError {
    match error {
        ServiceError::Repository(RepositoryError::NotFound { id }) => {
            McpError::invalid_params(format!("Rule with ID '{id}' not found"), None)
        }
        other => McpError::internal_error(other.to_string(), None),
    }
}
