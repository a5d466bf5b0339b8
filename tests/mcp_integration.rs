use std::path::Path;
use std::sync::Arc;

use rmcp::{
    handler::client::ClientHandler,
    model::{self, CallToolRequestParam, ClientInfo, PaginatedRequestParam, ReadResourceRequestParam},
    service::{RoleClient, RoleServer, RunningService, serve_directly},
    transport::async_rw::AsyncRwTransport,
};
use ruleshub::{
    logging,
    mcp::{RuleService, RulesHubServer},
};
use serde_json::{Value, json};
use tokio::{io::split, sync::OnceCell};

static INIT: OnceCell<()> = OnceCell::const_new();

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

fn write_rule(dir: &Path, file: &str, contents: &str) {
    std::fs::write(dir.join(file), contents).expect("write rule fixture");
}

fn build_fixtures() -> &'static Path {
    let dir = Box::leak(Box::new(
        tempfile::tempdir().expect("create fixture directory"),
    ));
    let path = dir.path();

    write_rule(
        path,
        "general.yaml",
        "id: general-style\ndescription: General style guidance\ntags:\n  - style\n  - general\nrule: |\n  Prefer clarity over cleverness.\n",
    );
    write_rule(
        path,
        "rust.yaml",
        "id: rust-style\ndescription: Rust-specific guidance\nlanguage: rust\ntags:\n  - style\nrule: |\n  Propagate errors with the question mark operator.\n",
    );
    write_rule(
        path,
        "project.yaml",
        "id: proj-style\ndescription: Project-scoped guidance\ncontext: proj1\nrule: |\n  Follow the project playbook.\n",
    );
    write_rule(
        path,
        "core.yaml",
        "id: core-safety\ndescription: Always-on safety rule\nis_core: true\nrule: |\n  Never commit secrets.\n",
    );
    // Missing description; the loader must skip it with a warning.
    write_rule(path, "broken.yaml", "id: broken\nrule: body\n");

    path
}

#[derive(Clone, Default)]
struct DummyClientHandler;

impl ClientHandler for DummyClientHandler {
    fn get_info(&self) -> ClientInfo {
        ClientInfo::default()
    }
}

struct TestHarness {
    service: RunningService<RoleClient, DummyClientHandler>,
    server: RunningService<RoleServer, RulesHubServer>,
}

impl TestHarness {
    async fn new() -> Self {
        INIT.get_or_init(|| async {
            let rules_dir = build_fixtures();

            set_env("RulesLoaderOptions:0:SourceType", "YamlFile");
            set_env(
                "RulesLoaderOptions:0:Path",
                rules_dir.to_str().expect("fixture path is UTF-8"),
            );
            set_env("RulesLoaderOptions:1:SourceType", "YamlFile");
            set_env("RulesLoaderOptions:1:Path", "/definitely/not/here");
            set_env("AGENT_RULES_LOG_LEVEL", "ERROR");

            logging::init_tracing("ERROR");
        })
        .await;

        let rule_service = Arc::new(RuleService::new());
        rule_service
            .initialize()
            .await
            .expect("rule system bootstraps");
        let server = RulesHubServer::new(rule_service);

        let (client_stream, server_stream) = tokio::io::duplex(16 * 1024);
        let (client_read, client_write) = split(client_stream);
        let (server_read, server_write) = split(server_stream);

        let client_transport = AsyncRwTransport::new_client(client_read, client_write);
        let server_transport = AsyncRwTransport::new_server(server_read, server_write);

        let server_info = rmcp::handler::server::ServerHandler::get_info(&server);
        let client_handler = DummyClientHandler;
        let client_info = ClientHandler::get_info(&client_handler);

        let server =
            serve_directly::<RoleServer, _, _, _, _>(server, server_transport, Some(client_info));

        let service = serve_directly::<RoleClient, _, _, _, _>(
            client_handler,
            client_transport,
            Some(server_info),
        );

        Self { service, server }
    }

    async fn shutdown(self) {
        let Self { service, server } = self;
        let _ = service.cancel().await;
        let _ = server.cancel().await;
    }

    async fn call(&self, name: &'static str, arguments: Value) -> model::CallToolResult {
        self.service
            .call_tool(CallToolRequestParam {
                name: name.into(),
                arguments: Some(arguments.as_object().expect("arguments object").clone()),
            })
            .await
            .unwrap_or_else(|err| panic!("{name} tool call failed: {err:?}"))
    }
}

fn rule_ids(payload: &Value) -> Vec<String> {
    payload["rules"]
        .as_array()
        .expect("rules array")
        .iter()
        .map(|rule| rule["ruleId"].as_str().expect("ruleId string").to_string())
        .collect()
}

#[tokio::test]
async fn initialize_and_list_tools() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let info = service
        .peer_info()
        .expect("server info should be initialized");
    assert_eq!(info.server_info.name, "rules-hub");
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.resources.is_some());

    let tools_result = service
        .list_tools(Some(PaginatedRequestParam { cursor: None }))
        .await
        .expect("list_tools");

    let names: Vec<_> = tools_result
        .tools
        .iter()
        .map(|tool| tool.name.as_ref())
        .collect();

    assert!(names.contains(&"list-rules"));
    assert!(names.contains(&"get-rule"));
    assert!(names.contains(&"list-contexts"));
    assert!(names.contains(&"core-rules"));

    harness.shutdown().await;
}

#[tokio::test]
async fn list_rules_excludes_core_and_contextual_rules() {
    let harness = TestHarness::new().await;

    let response = harness.call("list-rules", json!({})).await;
    assert_eq!(response.is_error, Some(false));
    let payload = response.structured_content.expect("structured payload");

    let ids = rule_ids(&payload);
    assert_eq!(ids, ["general-style", "rust-style"]);
    assert_eq!(payload["count"], 2);

    let general = payload["rules"]
        .as_array()
        .unwrap()
        .iter()
        .find(|rule| rule["ruleId"] == "general-style")
        .expect("general-style present");
    assert_eq!(general["description"], "General style guidance");
    assert_eq!(general["sourceKind"], "YamlFile");
    assert_eq!(general["tags"], json!(["style", "general"]));

    harness.shutdown().await;
}

#[tokio::test]
async fn list_rules_context_filter_keeps_contextless_rules_visible() {
    let harness = TestHarness::new().await;

    let response = harness
        .call("list-rules", json!({ "contextFilter": "PROJ1" }))
        .await;
    let payload = response.structured_content.expect("structured payload");
    let ids = rule_ids(&payload);
    assert_eq!(ids, ["general-style", "proj-style", "rust-style"]);

    harness.shutdown().await;
}

#[tokio::test]
async fn get_rule_returns_lazily_loaded_body() {
    let harness = TestHarness::new().await;

    let response = harness
        .call("get-rule", json!({ "ruleId": "general-style" }))
        .await;
    assert_eq!(response.is_error, Some(false));
    let payload = response.structured_content.expect("structured payload");
    assert_eq!(payload["ruleId"], "general-style");
    assert_eq!(payload["content"], "Prefer clarity over cleverness.\n");

    harness.shutdown().await;
}

#[tokio::test]
async fn get_rule_rejects_unknown_and_empty_ids() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    for arguments in [json!({ "ruleId": "missing" }), json!({ "ruleId": "  " })] {
        let err = service
            .call_tool(CallToolRequestParam {
                name: "get-rule".into(),
                arguments: Some(arguments.as_object().unwrap().clone()),
            })
            .await
            .expect_err("get-rule should fail");

        match err {
            rmcp::service::ServiceError::McpError(data) => {
                assert_eq!(data.code, model::ErrorCode::INVALID_PARAMS);
            }
            other => panic!("expected MCP error, got {other:?}"),
        }
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn list_contexts_returns_known_labels() {
    let harness = TestHarness::new().await;

    let response = harness.call("list-contexts", json!({})).await;
    let payload = response.structured_content.expect("structured payload");
    assert_eq!(payload["contexts"], json!(["proj1"]));

    harness.shutdown().await;
}

#[tokio::test]
async fn core_rules_returns_core_bodies_only() {
    let harness = TestHarness::new().await;

    let response = harness.call("core-rules", json!({})).await;
    let payload = response.structured_content.expect("structured payload");
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["coreRules"], json!(["Never commit secrets.\n"]));

    harness.shutdown().await;
}

#[tokio::test]
async fn stats_resource_reports_partial_source_failure() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let result = service
        .read_resource(ReadResourceRequestParam {
            uri: "rules://stats".into(),
        })
        .await
        .expect("read stats resource");

    let text = match &result.contents[0] {
        model::ResourceContents::TextResourceContents { text, .. } => text.clone(),
        other => panic!("expected text contents, got {other:?}"),
    };
    let payload: Value = serde_json::from_str(&text).expect("stats JSON");

    // Four parsable documents in the good source; the broken one is skipped
    // and the second source fails wholesale.
    assert_eq!(payload["repository"]["totalRules"], 4);
    assert_eq!(payload["bootstrap"]["totalSources"], 2);
    assert_eq!(payload["bootstrap"]["successfulSources"], 1);
    assert_eq!(payload["bootstrap"]["failedSources"], 1);
    assert_eq!(payload["bootstrap"]["totalRulesLoaded"], 4);
    let rate = payload["bootstrapSuccessRate"].as_f64().expect("rate");
    assert!((rate - 50.0).abs() < 1e-9);

    harness.shutdown().await;
}
