//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::mcp::{
    RuleService,
    format::{SourcesSnapshot, StatsSnapshot, json_resource_contents, serialize_json},
    handlers::{
        content::handle_get_rule,
        contexts::{handle_core_rules, handle_list_contexts},
        metadata::handle_list_rules,
    },
    registry, schemas,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
        RawResource, ReadResourceRequestParam, ReadResourceResult, Resource, ServerCapabilities,
        ServerInfo, Tool, ToolAnnotations,
    },
};

const STATS_URI: &str = "rules://stats";
const SOURCES_URI: &str = "rules://sources";

/// MCP server implementation exposing the Contextual Rules Hub operations.
#[derive(Clone)]
pub struct RulesHubServer {
    service: Arc<RuleService>,
    registry: Arc<registry::Registry>,
}

impl RulesHubServer {
    /// Create a new MCP server over the supplied rule service.
    pub fn new(service: Arc<RuleService>) -> Self {
        let mut registry = registry::Registry::new();
        registry.register_resource(STATS_URI, resource_stats);
        registry.register_resource(SOURCES_URI, resource_sources);

        registry.register_tool("list-rules", tool_list_rules);
        registry.register_tool("get-rule", tool_get_rule);
        registry.register_tool("list-contexts", tool_list_contexts);
        registry.register_tool("core-rules", tool_core_rules);

        Self {
            service,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        let list_rules_schema = Arc::new(schemas::list_rules_input_schema());
        let get_rule_schema = Arc::new(schemas::get_rule_input_schema());
        vec![
            Tool {
                name: Cow::Borrowed("list-rules"),
                title: Some("List Rule Metadata".to_string()),
                description: Some(Cow::Borrowed(
                    "Browse metadata for all non-core rules in the index; pass contextFilter to scope by project context.",
                )),
                input_schema: list_rules_schema.clone(),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("List Rule Metadata")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("get-rule"),
                title: Some("Get Rule Content".to_string()),
                description: Some(Cow::Borrowed(
                    "Fetch the full body text of one rule by its id; content is read fresh from the backing source.",
                )),
                input_schema: get_rule_schema.clone(),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Get Rule Content")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("list-contexts"),
                title: Some("List Contexts".to_string()),
                description: Some(Cow::Borrowed(
                    "Enumerate the context labels rules are scoped under; empty when no rule carries a context.",
                )),
                input_schema: Arc::new(schemas::empty_object_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("List Contexts")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("core-rules"),
                title: Some("Core Rule Contents".to_string()),
                description: Some(Cow::Borrowed(
                    "Fetch the body text of every core rule; core rules are excluded from list-rules and meant to always apply.",
                )),
                input_schema: Arc::new(schemas::empty_object_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Core Rule Contents")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut stats = RawResource::new(STATS_URI, "stats");
        stats.description =
            Some("Repository aggregates plus bootstrap statistics for the current process".into());

        let mut sources = RawResource::new(SOURCES_URI, "sources");
        sources.description =
            Some("Configured rule sources and their pre-flight validation outcomes".into());

        vec![stats.no_annotation(), sources.no_annotation()]
    }
}

fn resource_stats(
    server: &RulesHubServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let service = server.service.clone();
    Box::pin(async move {
        let repository = service
            .repository_stats()
            .await
            .map_err(|err| McpError::internal_error(err.to_string(), None))?;
        let bootstrap = service
            .bootstrap_stats()
            .await
            .map_err(|err| McpError::internal_error(err.to_string(), None))?;
        let payload = StatsSnapshot {
            repository,
            bootstrap_success_rate: bootstrap.success_rate(),
            bootstrap,
        };
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                STATS_URI,
                serialize_json(&payload, STATS_URI),
            )],
        })
    })
}

fn resource_sources(
    server: &RulesHubServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let service = server.service.clone();
    Box::pin(async move {
        let sources = service
            .sources()
            .await
            .map_err(|err| McpError::internal_error(err.to_string(), None))?;
        let payload = SourcesSnapshot { sources };
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                SOURCES_URI,
                serialize_json(&payload, SOURCES_URI),
            )],
        })
    })
}

fn tool_list_rules(
    server: &RulesHubServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_list_rules(&service, request.arguments).await })
}

fn tool_get_rule(server: &RulesHubServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_get_rule(&service, request.arguments).await })
}

fn tool_list_contexts(
    server: &RulesHubServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_list_contexts(&service).await })
}

fn tool_core_rules(
    server: &RulesHubServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_core_rules(&service).await })
}

impl ServerHandler for RulesHubServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "rules-hub".to_string();
        implementation.title = Some("Contextual Rules Hub".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to discover and fetch agent rules. List non-core rule metadata (optionally scoped by context), fetch a rule's body by id, enumerate contexts, and pull every core rule's content for always-on guidance.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let uri = request.uri.clone();
            if let Some(handler) = self.registry.resources.get(uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {uri}"),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
