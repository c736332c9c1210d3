//! MCP Server Implementation
//!
//! Handles MCP protocol requests and routes tool calls to the catalog
//! capabilities.

use super::protocol::*;
use super::tools::{self, get_all_tools};
use super::transport::{Incoming, LineTransport};
use crate::capabilities::CatalogTools;
use crate::error::{ToolError, ToolResult};
use modelfinder_catalog::{FilterCriteria, DEFAULT_TOP_K};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "modelfinder";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server - handles protocol messages
pub struct McpServer {
    tools: Arc<CatalogTools>,
    initialized: bool,
}

impl McpServer {
    pub fn new(tools: CatalogTools) -> Self {
        Self {
            tools: Arc::new(tools),
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Serve MCP over stdio until the client closes stdin
    pub async fn run_stdio(&mut self) -> std::io::Result<()> {
        let mut transport = LineTransport::stdio();
        self.run(&mut transport).await
    }

    /// Run the MCP server event loop
    pub async fn run<R, W>(&mut self, transport: &mut LineTransport<R, W>) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("MCP server starting...");

        while let Some(message) = transport.read_message().await? {
            let response = match message {
                Incoming::Request(request) => self.handle_request(request).await,
                Incoming::Malformed(reason) => Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Parse error: {}", reason)),
                )),
            };
            if let Some(response) = response {
                transport.write_response(&response).await?;
            }
        }

        tracing::info!("Client disconnected");
        Ok(())
    }

    /// Handle a JSON-RPC request; notifications produce no response
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!("Handling request: {}", request.method);

        if request.is_notification() {
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id, request.params),
            "ping" => JsonRpcResponse::from_result(request.id, &PingResult {}),
            "tools/list" => JsonRpcResponse::from_result(
                request.id,
                &ToolsListResult {
                    tools: get_all_tools(),
                },
            ),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => {
                JsonRpcResponse::error(request.id, JsonRpcError::method_not_found(&request.method))
            }
        };
        Some(response)
    }

    fn handle_initialize(&mut self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();
        if let Some(client) = &params.client_info {
            tracing::info!(
                "Client connected: {} {}",
                client.name,
                client.version.as_deref().unwrap_or("")
            );
        }

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                logging: Some(LoggingCapability {}),
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(SERVER_VERSION.to_string()),
            },
        };

        JsonRpcResponse::from_result(id, &result)
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid params: {}", e)),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"));
            }
        };

        let args = params
            .arguments
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let tools = Arc::clone(&self.tools);
        let name = params.name;

        // Embedding and index queries are CPU bound
        let outcome = tokio::task::spawn_blocking(move || dispatch(&tools, &name, &args))
            .await
            .unwrap_or_else(|e| Err(ToolError::Task(e.to_string())));

        match outcome {
            Ok(text) => JsonRpcResponse::from_result(id, &ToolCallResult::text(text)),
            Err(e @ ToolError::Catalog(_)) | Err(e @ ToolError::Task(_)) => {
                tracing::warn!("Tool call failed: {}", e);
                JsonRpcResponse::from_result(id, &ToolCallResult::error(format!("Error: {}", e)))
            }
            Err(e) => JsonRpcResponse::error(id, e.into()),
        }
    }
}

/// Execute a tool by name
pub fn dispatch(tools: &CatalogTools, name: &str, args: &Value) -> ToolResult<String> {
    match name {
        tools::GET_MODEL_INFO => Ok(tools.get_model_info(required_str(args, "model_id")?)),
        tools::FILTER_MODELS => {
            let criteria: FilterCriteria = serde_json::from_value(args.clone())
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
            Ok(tools.filter_models(&criteria))
        }
        tools::SEMANTIC_MODEL_SEARCH => {
            let query = required_str(args, "query")?;
            let top_k = match args.get("top_k") {
                None | Some(Value::Null) => DEFAULT_TOP_K,
                Some(v) => v
                    .as_u64()
                    .map(|k| k as usize)
                    .ok_or_else(|| ToolError::InvalidArguments("top_k must be a non-negative integer".into()))?,
            };
            Ok(tools.semantic_model_search(query, top_k))
        }
        tools::COMPARE_MODELS => Ok(tools.compare_models(
            required_str(args, "model_id1")?,
            required_str(args, "model_id2")?,
        )),
        _ => Err(ToolError::UnknownTool(name.to_string())),
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> ToolResult<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::MissingArgument(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelfinder_catalog::{CatalogConfig, HashingEmbedder, ModelCatalog, ModelRecord, RecordStore};
    use serde_json::json;

    fn server() -> (tempfile::TempDir, McpServer) {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            ModelRecord {
                description: "English masked language model".into(),
                likes: 2100,
                model_type: "pretrained".into(),
                ..ModelRecord::new("google-bert/bert-base-uncased")
            },
            ModelRecord {
                description: "Multilingual question answering".into(),
                likes: 400,
                model_type: "fine-tuned".into(),
                ..ModelRecord::new("deepset/xlm-roberta-large-squad2")
            },
        ];
        let catalog = ModelCatalog::with_store(
            CatalogConfig::from_data_dir(dir.path()),
            RecordStore::from_records(records).unwrap(),
            Arc::new(HashingEmbedder::default()),
        )
        .unwrap();
        catalog.ensure_consistent().unwrap();
        (dir, McpServer::new(CatalogTools::new(Arc::new(catalog))))
    }

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .unwrap()
    }

    fn tool_text(response: &JsonRpcResponse) -> String {
        response.result.as_ref().unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_initialize() {
        let (_dir, mut server) = server();
        let response = server
            .handle_request(request(1, "initialize", json!({"clientInfo": {"name": "test"}})))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "modelfinder");
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let (_dir, mut server) = server();
        let notification: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
        }))
        .unwrap();
        assert!(server.handle_request(notification).await.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let (_dir, mut server) = server();
        let response = server
            .handle_request(request(2, "tools/list", Value::Null))
            .await
            .unwrap();
        assert_eq!(response.result.unwrap()["tools"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (_dir, mut server) = server();
        let response = server
            .handle_request(request(3, "resources/list", Value::Null))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_get_model_info_call() {
        let (_dir, mut server) = server();
        let response = server
            .handle_request(request(
                4,
                "tools/call",
                json!({"name": "get_model_info", "arguments": {"model_id": "bert-base"}}),
            ))
            .await
            .unwrap();
        assert!(tool_text(&response).starts_with("Model: google-bert/bert-base-uncased"));
    }

    #[tokio::test]
    async fn test_filter_call_parses_criteria() {
        let (_dir, mut server) = server();
        let response = server
            .handle_request(request(
                5,
                "tools/call",
                json!({"name": "filter_models", "arguments": {"min_likes": 1000}}),
            ))
            .await
            .unwrap();
        let text = tool_text(&response);
        assert!(text.starts_with("Filtered Models:"));
        assert!(text.contains("google-bert/bert-base-uncased"));
        assert!(!text.contains("deepset"));
    }

    #[test]
    fn test_filter_dispatch_accepts_null_and_float_arguments() {
        let (_dir, server) = server();
        let text = dispatch(
            &server.tools,
            tools::FILTER_MODELS,
            &json!({"tag": null, "min_likes": 1000.0, "license": null, "merged_only": null}),
        )
        .unwrap();
        assert!(text.starts_with("Filtered Models:"));
        assert!(text.contains("google-bert/bert-base-uncased"));
        assert!(!text.contains("deepset"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_invalid_params() {
        let (_dir, mut server) = server();
        let response = server
            .handle_request(request(
                6,
                "tools/call",
                json!({"name": "compare_models", "arguments": {"model_id1": "a"}}),
            ))
            .await
            .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(error.message.contains("model_id2"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (_dir, mut server) = server();
        let response = server
            .handle_request(request(7, "tools/call", json!({"name": "delete_models"})))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_run_loop_over_buffers() {
        let (_dir, mut server) = server();
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "garbage\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"semantic_model_search\",\"arguments\":{\"query\":\"question answering\",\"top_k\":1}}}\n",
        );
        let mut transport = LineTransport::new(input.as_bytes(), Vec::new());
        server.run(&mut transport).await.unwrap();

        let output = String::from_utf8(transport.into_writer()).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["error"]["code"], -32700);
        let text = lines[2]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Top Semantic Matches:"));
        assert_eq!(text.matches("-----").count(), 1);
    }

    #[test]
    fn test_dispatch_rejects_bad_top_k() {
        let (_dir, server) = server();
        let err = dispatch(
            &server.tools,
            tools::SEMANTIC_MODEL_SEARCH,
            &json!({"query": "bert", "top_k": "many"}),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
