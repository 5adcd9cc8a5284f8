//! MCP JSON-RPC 2.0 server implementation for stdio communication.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader as AsyncBufReader};
use tracing::{debug, error, info};

use crate::mcp::protocol::{
    create_assess_schema, create_feedback_schema, create_history_schema, create_mutate_schema,
    error_codes, JsonRpcRequest, JsonRpcResponse, McpCapabilities, McpInitResult, McpServerInfo,
    McpTool, ToolCallParams, ToolResult,
};
use crate::mcp::tools::{
    execute_assess, execute_feedback, execute_history, execute_mutate, AssessParams,
    FeedbackParams, HistoryParams, MutateParams,
};

/// MCP server that handles JSON-RPC 2.0 communication over stdin/stdout.
pub struct McpServer {
    server_info: McpServerInfo,
}

impl McpServer {
    /// Create a new MCP server instance
    pub fn new(version: &str) -> Self {
        Self {
            server_info: McpServerInfo {
                name: "gavel".to_string(),
                version: version.to_string(),
            },
        }
    }

    /// Run the MCP server, processing JSON-RPC messages over stdin/stdout.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("Starting MCP JSON-RPC 2.0 server");

        let stdin = tokio::io::stdin();
        let mut reader = AsyncBufReader::new(stdin);
        let mut stdout = tokio::io::stdout();
        let mut line = String::new();

        loop {
            line.clear();

            let response = match reader.read_line(&mut line).await {
                Ok(0) => {
                    debug!("EOF reached, shutting down MCP server");
                    break;
                }
                Ok(_) => self.handle_request(&line).await,
                Err(err) => {
                    error!("Error reading from stdin: {err}");
                    JsonRpcResponse::error(
                        None,
                        error_codes::INTERNAL_ERROR,
                        format!("Failed to read request: {err}"),
                    )
                }
            };

            Self::write_response(&mut stdout, &response).await?;
        }

        info!("MCP server shutdown complete");
        Ok(())
    }

    /// Writes a JSON-RPC response to stdout.
    async fn write_response(
        stdout: &mut tokio::io::Stdout,
        response: &JsonRpcResponse,
    ) -> anyhow::Result<()> {
        let response_json = serde_json::to_string(response)?;
        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        Ok(())
    }

    /// Handle a single JSON-RPC request line.
    async fn handle_request(&self, request_line: &str) -> JsonRpcResponse {
        let request_line = request_line.trim();
        if request_line.is_empty() {
            return JsonRpcResponse::error(
                None,
                error_codes::INVALID_REQUEST,
                "Empty request".to_string(),
            );
        }

        let request: JsonRpcRequest = match serde_json::from_str(request_line) {
            Ok(request) => request,
            Err(err) => {
                error!("Failed to parse JSON-RPC request: {err}");
                return JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {err}"),
                );
            }
        };

        debug!("Handling method: {}", request.method);

        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_REQUEST,
                "Only JSON-RPC 2.0 is supported".to_string(),
            );
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tool_call(request.id, request.params).await,
            _ => JsonRpcResponse::error(
                request.id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    /// Handle MCP initialization.
    fn handle_initialize(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        let result = McpInitResult {
            protocol_version: "2024-11-05".to_string(),
            capabilities: McpCapabilities {
                tools: Self::available_tools(),
            },
            server_info: self.server_info.clone(),
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::error(
                id,
                error_codes::INTERNAL_ERROR,
                format!("Failed to serialize capabilities: {err}"),
            ),
        }
    }

    /// Handle tools list request.
    fn handle_tools_list(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        let result = serde_json::json!({
            "tools": Self::available_tools()
        });

        JsonRpcResponse::success(id, result)
    }

    /// Returns the list of available MCP tools.
    fn available_tools() -> Vec<McpTool> {
        vec![
            McpTool {
                name: "gavel_assess".to_string(),
                description:
                    "Run the full assessment pipeline on the current diff or specified refs"
                        .to_string(),
                input_schema: create_assess_schema(),
            },
            McpTool {
                name: "gavel_mutate".to_string(),
                description: "Run mutation testing only on changed files".to_string(),
                input_schema: create_mutate_schema(),
            },
            McpTool {
                name: "gavel_history".to_string(),
                description: "Query past assessments with pagination".to_string(),
                input_schema: create_history_schema(),
            },
            McpTool {
                name: "gavel_feedback".to_string(),
                description: "Submit feedback on an assessment".to_string(),
                input_schema: create_feedback_schema(),
            },
        ]
    }

    /// Handle tool call request.
    async fn handle_tool_call(
        &self,
        id: Option<serde_json::Value>,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        let tool_params = match Self::parse_tool_params(params) {
            Ok(params) => params,
            Err(response) => return response.with_id(id),
        };

        let tool_result = Self::dispatch_tool(&tool_params.name, tool_params.arguments).await;

        match tool_result {
            Ok(result) => match serde_json::to_value(result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(err) => JsonRpcResponse::error(
                    id,
                    error_codes::INTERNAL_ERROR,
                    format!("Failed to serialize result: {err}"),
                ),
            },
            Err((code, message)) => JsonRpcResponse::error(id, code, message),
        }
    }

    /// Parse tool call parameters from JSON.
    fn parse_tool_params(
        params: Option<serde_json::Value>,
    ) -> Result<ToolCallParams, JsonRpcResponse> {
        let params = params.ok_or_else(|| {
            JsonRpcResponse::error(
                None,
                error_codes::INVALID_PARAMS,
                "Missing parameters".to_string(),
            )
        })?;

        serde_json::from_value(params).map_err(|err| {
            JsonRpcResponse::error(
                None,
                error_codes::INVALID_PARAMS,
                format!("Invalid tool call parameters: {err}"),
            )
        })
    }

    /// Dispatch to the appropriate tool handler.
    async fn dispatch_tool(
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, (i32, String)> {
        match name {
            "gavel_assess" => {
                let params = serde_json::from_value::<AssessParams>(arguments).map_err(|err| {
                    (
                        error_codes::INVALID_PARAMS,
                        format!("Invalid gavel_assess parameters: {err}"),
                    )
                })?;
                execute_assess(params).await
            }
            "gavel_mutate" => {
                let params = serde_json::from_value::<MutateParams>(arguments).map_err(|err| {
                    (
                        error_codes::INVALID_PARAMS,
                        format!("Invalid gavel_mutate parameters: {err}"),
                    )
                })?;
                execute_mutate(params).await
            }
            "gavel_history" => {
                let params =
                    serde_json::from_value::<HistoryParams>(arguments).map_err(|err| {
                        (
                            error_codes::INVALID_PARAMS,
                            format!("Invalid gavel_history parameters: {err}"),
                        )
                    })?;
                execute_history(params).await
            }
            "gavel_feedback" => {
                let params =
                    serde_json::from_value::<FeedbackParams>(arguments).map_err(|err| {
                        (
                            error_codes::INVALID_PARAMS,
                            format!("Invalid gavel_feedback parameters: {err}"),
                        )
                    })?;
                execute_feedback(params).await
            }
            _ => Err((
                error_codes::TOOL_NOT_FOUND,
                format!("Unknown tool: {name}"),
            )),
        }
    }
}
