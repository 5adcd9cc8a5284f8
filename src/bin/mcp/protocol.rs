//! MCP protocol types and message handling for JSON-RPC 2.0 communication.

use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 request structure
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<JsonRpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 error structure
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// MCP tool definition for tool discovery
#[derive(Debug, Serialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// MCP capabilities reported during initialization
#[derive(Debug, Serialize)]
pub struct McpCapabilities {
    pub tools: Vec<McpTool>,
}

/// MCP initialization result
#[derive(Debug, Serialize)]
pub struct McpInitResult {
    pub protocol_version: String,
    pub capabilities: McpCapabilities,
    pub server_info: McpServerInfo,
}

/// MCP server information
#[derive(Debug, Clone, Serialize)]
pub struct McpServerInfo {
    pub name: String,
    pub version: String,
}

/// Tool execution request parameters
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Tool execution result
#[derive(Debug, Serialize)]
pub struct ToolResult {
    pub content: Vec<ContentItem>,
}

/// Content item in tool result
#[derive(Debug, Serialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ToolResult {
    /// Single text-content result.
    pub fn text(text: String) -> Self {
        Self {
            content: vec![ContentItem {
                content_type: "text".to_string(),
                text,
            }],
        }
    }
}

/// Factory methods for [`JsonRpcResponse`].
impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response
    pub fn error(id: Option<serde_json::Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }

    /// Replace the response id (used when an id arrives after the error).
    pub fn with_id(mut self, id: Option<serde_json::Value>) -> Self {
        self.id = id;
        self
    }
}

/// MCP error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // MCP-specific error codes
    pub const TOOL_NOT_FOUND: i32 = -32001;
    pub const ASSESSMENT_ERROR: i32 = -32003;
}

/// Create tool schema for gavel_assess
pub fn create_assess_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "ref_before": {
                "type": "string",
                "default": "",
                "description": "Git ref before changes (default: HEAD)"
            },
            "ref_after": {
                "type": "string",
                "default": "",
                "description": "Git ref after changes (default: working tree)"
            },
            "skip_baseline": {
                "type": "boolean",
                "default": false,
                "description": "Skip the flakiness baseline (faster)"
            },
            "skip_mutations": {
                "type": "boolean",
                "default": false,
                "description": "Skip mutation testing (much faster)"
            }
        }
    })
}

/// Create tool schema for gavel_mutate
pub fn create_mutate_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "ref_before": {
                "type": "string",
                "default": "",
                "description": "Git ref before changes (default: HEAD)"
            },
            "ref_after": {
                "type": "string",
                "default": "",
                "description": "Git ref after changes (default: working tree)"
            }
        }
    })
}

/// Create tool schema for gavel_history
pub fn create_history_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "limit": {
                "type": "integer",
                "minimum": 1,
                "maximum": 100,
                "default": 10,
                "description": "Maximum number of results"
            },
            "offset": {
                "type": "integer",
                "minimum": 0,
                "default": 0,
                "description": "Number of results to skip"
            }
        }
    })
}

/// Create tool schema for gavel_feedback
pub fn create_feedback_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "assessment_id": {
                "type": "string",
                "description": "The assessment ID to give feedback on"
            },
            "outcome": {
                "type": "string",
                "enum": ["accepted", "rejected", "modified"],
                "description": "What happened to the assessed change"
            },
            "context": {
                "type": "string",
                "default": "",
                "description": "Optional explanation"
            }
        },
        "required": ["assessment_id", "outcome"]
    })
}
