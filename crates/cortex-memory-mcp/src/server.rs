//! MCP Server Core
//!
//! Routes incoming JSON-RPC requests to the tool/resource handlers in
//! `tools`/`resources`, wiring them to a shared `Engine` (spec §4.9, §9).
//!
//! Two server states: a live `Engine` behind `Arc`, or "degraded mode"
//! (spec §7) when the storage layer failed to initialize — every tool call
//! then answers with a structured error via `health_check`'s reachable-even-
//! when-degraded shape, and the adapter keeps reading requests rather than
//! exiting, so a client can still inspect `health_check`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListResourcesResult,
    ListToolsResult, ReadResourceRequest, ReadResourceResult, ResourceContent, ResourceDescription,
    ServerCapabilities, ServerInfo, ToolDescription, ToolResultContent,
};
use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
use crate::resources;
use crate::tools;
use cortex_memory_core::Engine;

/// Either a live engine, or the reason storage failed to initialize
/// (spec §4.1, §7: "degraded mode").
enum EngineState {
    Live(Arc<Engine>),
    Degraded(String),
}

/// MCP server implementation: one per stdio connection.
pub struct McpServer {
    engine: EngineState,
    initialized: bool,
}

impl McpServer {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine: EngineState::Live(engine), initialized: false }
    }

    /// Construct a server in degraded mode: storage failed to open at
    /// startup. Every tool call will answer with a structured error except
    /// `health_check`, which reports the reason (spec §7).
    pub fn degraded(init_error: String) -> Self {
        Self { engine: EngineState::Degraded(init_error), initialized: false }
    }

    fn engine(&self) -> Option<&Arc<Engine>> {
        match &self.engine {
            EngineState::Live(engine) => Some(engine),
            EngineState::Degraded(_) => None,
        }
    }

    /// Handle an incoming JSON-RPC request. Returns `None` for notifications
    /// (no response expected).
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("handling request: {}", request.method);

        if !self.initialized && request.method != "initialize" && request.method != "notifications/initialized" {
            warn!("rejecting '{}': server not initialized", request.method);
            return Some(JsonRpcResponse::error(request.id, JsonRpcError::server_not_initialized()));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "notifications/initialized" => return None,
            "tools/list" | "mcp/listTools" => self.handle_tools_list().await,
            "tools/call" | "mcp/callTool" => self.handle_tools_call(request.params).await,
            "resources/list" | "mcp/listResources" => self.handle_resources_list().await,
            "resources/read" | "mcp/readResource" => self.handle_resources_read(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!("unknown method: {}", method);
                Err(JsonRpcError::method_not_found())
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    async fn handle_initialize(&mut self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: InitializeRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => InitializeRequest::default(),
        };

        // Claude Desktop rejects servers reporting a newer protocol version
        // than the one the client sent; negotiate down when necessary.
        let negotiated_version = if request.protocol_version.as_str() < MCP_VERSION {
            request.protocol_version.clone()
        } else {
            MCP_VERSION.to_string()
        };

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: negotiated_version,
            server_info: ServerInfo { name: "cortex-memory".to_string(), version: env!("CARGO_PKG_VERSION").to_string() },
            capabilities: ServerCapabilities {
                tools: Some(std::collections::HashMap::from([("listChanged".to_string(), serde_json::json!(false))])),
                resources: Some(std::collections::HashMap::from([("listChanged".to_string(), serde_json::json!(false))])),
                prompts: None,
            },
            instructions: Some(
                "cortex-memory is a persistent, rank-aware memory store for this codebase. Use \
                 `store_memory`/`quick_store` to record corrections, decisions, conventions, and bug \
                 fixes as they happen; use `recall_memory` for a targeted query or `force_recall`/\
                 `get_context` at the start of a conversation to prime yourself with the most relevant \
                 history for the current topic and file."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_tools_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let tools = vec![
            ToolDescription {
                name: "recall_memory".to_string(),
                description: Some("Hybrid keyword+vector+file-scoped search over stored memories, ranked by kind, recency, access, and file affinity.".to_string()),
                input_schema: tools::recall_memory::schema(),
            },
            ToolDescription {
                name: "store_memory".to_string(),
                description: Some("Store a typed observation (correction, decision, convention, bug_fix, ...) through the quality gate and contradiction detector.".to_string()),
                input_schema: tools::store_memory::schema(),
            },
            ToolDescription {
                name: "quick_store".to_string(),
                description: Some("Store a memory with its kind auto-classified from keywords, when the caller doesn't want to pick one.".to_string()),
                input_schema: tools::quick_store::schema(),
            },
            ToolDescription {
                name: "force_recall".to_string(),
                description: Some("Run the full layered context-assembly pipeline for a topic: maintenance, hot corrections, core context, temporal buckets, workspace state, and a topic search.".to_string()),
                input_schema: tools::force_recall::schema(),
            },
            ToolDescription {
                name: "auto_learn".to_string(),
                description: Some("Regex-extract candidate memories from free-form text (e.g. a conversation transcript) and store the ones that pass the quality gate.".to_string()),
                input_schema: tools::auto_learn::schema(),
            },
            ToolDescription {
                name: "update_memory".to_string(),
                description: Some("Replace a memory's content: creates a successor item and deactivates the original with a SUPERSEDED_BY edge.".to_string()),
                input_schema: tools::update_memory::schema(),
            },
            ToolDescription {
                name: "delete_memory".to_string(),
                description: Some("Soft-delete a memory by id.".to_string()),
                input_schema: tools::delete_memory::schema(),
            },
            ToolDescription {
                name: "list_memories".to_string(),
                description: Some("List active memories, optionally filtered by kind.".to_string()),
                input_schema: tools::list_memories::schema(),
            },
            ToolDescription {
                name: "get_stats".to_string(),
                description: Some("Active/total item counts and engine version.".to_string()),
                input_schema: tools::get_stats::schema(),
            },
            ToolDescription {
                name: "get_context".to_string(),
                description: Some("Session-start variant of force_recall: topic is optional.".to_string()),
                input_schema: tools::get_context::schema(),
            },
            ToolDescription {
                name: "scan_project".to_string(),
                description: Some("Scan the workspace for an export map and architecture graph, feeding the context assembler's L11/L12 sections.".to_string()),
                input_schema: tools::scan_project::schema(),
            },
            ToolDescription {
                name: "verify_code".to_string(),
                description: Some("Check a code snippet against stored conventions and proven patterns for this project.".to_string()),
                input_schema: tools::verify_code::schema(),
            },
            ToolDescription {
                name: "verify_files".to_string(),
                description: Some("Check a set of files against stored memories scoped to them.".to_string()),
                input_schema: tools::verify_files::schema(),
            },
            ToolDescription {
                name: "export_memories".to_string(),
                description: Some("Export all active memories as a versioned bundle.".to_string()),
                input_schema: tools::export_memories::schema(),
            },
            ToolDescription {
                name: "import_memories".to_string(),
                description: Some("Import a versioned export bundle. Idempotent: existing (kind, intent) pairs are skipped.".to_string()),
                input_schema: tools::import_memories::schema(),
            },
            ToolDescription {
                name: "health_check".to_string(),
                description: Some("Report whether the engine is healthy or running in degraded mode.".to_string()),
                input_schema: tools::health_check::schema(),
            },
        ];

        let result = ListToolsResult { tools };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing tool call parameters")),
        };

        // `health_check` is the one tool reachable in degraded mode.
        if request.name == "health_check" {
            let degraded_reason = match &self.engine {
                EngineState::Degraded(reason) => Some(reason.as_str()),
                EngineState::Live(_) => None,
            };
            let value = tools::health_check::execute(self.engine(), degraded_reason).await;
            return Ok(Self::wrap_result(Ok(value)));
        }

        let Some(engine) = self.engine() else {
            return Ok(Self::wrap_result(Err("engine is in degraded mode: storage failed to initialize; only health_check is available".to_string())));
        };

        let result: Result<serde_json::Value, String> = match request.name.as_str() {
            "recall_memory" => tools::recall_memory::execute(engine, request.arguments).await,
            "store_memory" => tools::store_memory::execute(engine, request.arguments).await,
            "quick_store" => tools::quick_store::execute(engine, request.arguments).await,
            "force_recall" => tools::force_recall::execute(engine, request.arguments).await,
            "auto_learn" => tools::auto_learn::execute(engine, request.arguments).await,
            "update_memory" => tools::update_memory::execute(engine, request.arguments).await,
            "delete_memory" => tools::delete_memory::execute(engine, request.arguments).await,
            "list_memories" => tools::list_memories::execute(engine, request.arguments).await,
            "get_stats" => tools::get_stats::execute(engine, request.arguments).await,
            "get_context" => tools::get_context::execute(engine, request.arguments).await,
            "scan_project" => tools::scan_project::execute(engine, request.arguments).await,
            "verify_code" => tools::verify_code::execute(engine, request.arguments).await,
            "verify_files" => tools::verify_files::execute(engine, request.arguments).await,
            "export_memories" => tools::export_memories::execute(engine, request.arguments).await,
            "import_memories" => tools::import_memories::execute(engine, request.arguments).await,
            name => {
                return Err(JsonRpcError::method_not_found_with_message(&format!("unknown tool: {}", name)));
            }
        };

        Ok(Self::wrap_result(result))
    }

    /// Tool failures become a *successful* JSON-RPC response carrying
    /// `isError: true` (the MCP convention, spec §4.9) — never a JSON-RPC
    /// error object, which is reserved for framing/dispatch failures.
    fn wrap_result(result: Result<serde_json::Value, String>) -> serde_json::Value {
        let call_result = match result {
            Ok(value) => CallToolResult {
                content: vec![ToolResultContent {
                    content_type: "text".to_string(),
                    text: serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
                }],
                is_error: Some(false),
            },
            Err(message) => CallToolResult {
                content: vec![ToolResultContent { content_type: "text".to_string(), text: message }],
                is_error: Some(true),
            },
        };
        serde_json::to_value(call_result).unwrap_or_else(|_| serde_json::json!({ "content": [], "isError": true }))
    }

    async fn handle_resources_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let resources = vec![ResourceDescription {
            uri: resources::BRAIN_CONTEXT_URI.to_string(),
            name: "Brain Context".to_string(),
            description: Some("The Context Assembler's conversation-priming output for the current topic.".to_string()),
            mime_type: Some("text/plain".to_string()),
        }];
        let result = ListResourcesResult { resources };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_resources_read(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: ReadResourceRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing resource uri")),
        };

        let Some(engine) = self.engine() else {
            return Err(JsonRpcError::internal_error("engine is in degraded mode"));
        };

        match resources::read(engine, &request.uri) {
            Ok(text) => {
                let result = ReadResourceResult {
                    contents: vec![ResourceContent {
                        uri: request.uri,
                        mime_type: Some("text/plain".to_string()),
                        text: Some(text),
                        blob: None,
                    }],
                };
                serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
            }
            Err(e) => Err(JsonRpcError::resource_not_found(&e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_memory_core::Storage;
    use tempfile::TempDir;

    /// Keep the `TempDir` alive for the duration of the test; dropping it
    /// deletes the backing database file.
    fn test_server() -> (McpServer, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::open(&dir.path().join("test.db")).expect("open storage");
        let engine = Engine::with_storage(dir.path().to_path_buf(), storage).expect("engine");
        (McpServer::new(Arc::new(engine)), dir)
    }

    fn make_request(method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
        JsonRpcRequest { jsonrpc: "2.0".to_string(), id: Some(serde_json::json!(1)), method: method.to_string(), params }
    }

    #[tokio::test]
    async fn initialize_sets_initialized_flag() {
        let (mut server, _dir) = test_server();
        assert!(!server.initialized);
        let response = server.handle_request(make_request("initialize", None)).await.unwrap();
        assert!(response.result.is_some());
        assert!(server.initialized);
    }

    #[tokio::test]
    async fn request_before_initialize_is_rejected() {
        let (mut server, _dir) = test_server();
        let response = server.handle_request(make_request("tools/list", None)).await.unwrap();
        assert_eq!(response.error.unwrap().code, -32003);
    }

    #[tokio::test]
    async fn initialized_notification_returns_none() {
        let (mut server, _dir) = test_server();
        server.handle_request(make_request("initialize", None)).await;
        let response = server.handle_request(make_request("notifications/initialized", None)).await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn tools_list_returns_all_sixteen_tools() {
        let (mut server, _dir) = test_server();
        server.handle_request(make_request("initialize", None)).await;
        let response = server.handle_request(make_request("tools/list", None)).await.unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 16);
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        for expected in [
            "recall_memory",
            "store_memory",
            "quick_store",
            "force_recall",
            "auto_learn",
            "update_memory",
            "delete_memory",
            "list_memories",
            "get_stats",
            "get_context",
            "scan_project",
            "verify_code",
            "verify_files",
            "export_memories",
            "import_memories",
            "health_check",
        ] {
            assert!(names.contains(&expected), "missing tool {}", expected);
        }
    }

    #[tokio::test]
    async fn unknown_tool_returns_method_not_found() {
        let (mut server, _dir) = test_server();
        server.handle_request(make_request("initialize", None)).await;
        let request = make_request("tools/call", Some(serde_json::json!({ "name": "nonexistent", "arguments": {} })));
        let response = server.handle_request(request).await.unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn store_then_recall_round_trips() {
        let (mut server, _dir) = test_server();
        server.handle_request(make_request("initialize", None)).await;

        let store_req = make_request(
            "tools/call",
            Some(serde_json::json!({
                "name": "store_memory",
                "arguments": { "type": "CONVENTION", "content": "Always use Zod for schema validation in this project" }
            })),
        );
        let store_resp = server.handle_request(store_req).await.unwrap();
        assert!(store_resp.error.is_none());

        let recall_req = make_request(
            "tools/call",
            Some(serde_json::json!({ "name": "recall_memory", "arguments": { "query": "schema validation" } })),
        );
        let recall_resp = server.handle_request(recall_req).await.unwrap();
        let result = recall_resp.result.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Zod"));
    }

    #[tokio::test]
    async fn degraded_mode_answers_health_check_but_rejects_others() {
        let mut server = McpServer::degraded("disk full".to_string());
        server.handle_request(make_request("initialize", None)).await;

        let health_req = make_request("tools/call", Some(serde_json::json!({ "name": "health_check", "arguments": {} })));
        let health_resp = server.handle_request(health_req).await.unwrap();
        let text = health_resp.result.unwrap()["content"][0]["text"].as_str().unwrap().to_string();
        assert!(text.contains("degraded"));

        let store_req = make_request(
            "tools/call",
            Some(serde_json::json!({ "name": "store_memory", "arguments": { "type": "INSIGHT", "content": "anything at all here" } })),
        );
        let store_resp = server.handle_request(store_req).await.unwrap();
        let result = store_resp.result.unwrap();
        assert_eq!(result["isError"], serde_json::json!(true));
    }
}
