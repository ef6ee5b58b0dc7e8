//! MCP request handling
//!
//! JSON-RPC 2.0 messages, one per line. Requests without an `id` are
//! notifications and get no response.

use crate::config::ServerConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tabula_core::Value;
use tabula_plugin::{EvalContext, PluginRegistry};

pub const PROTOCOL_VERSION: &str = "2025-11-25";
pub const SERVER_NAME: &str = "tabula";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

// MCP Protocol types
#[derive(Debug, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    pub id: Option<JsonValue>,
    pub method: String,
    #[serde(default)]
    pub params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

#[derive(Debug, Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl McpError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }
}

impl McpResponse {
    fn reply(id: Option<JsonValue>, result: Result<JsonValue, McpError>) -> Self {
        match result {
            Ok(r) => Self {
                jsonrpc: "2.0".to_string(),
                id,
                result: Some(r),
                error: None,
            },
            Err(e) => Self {
                jsonrpc: "2.0".to_string(),
                id,
                result: None,
                error: Some(e),
            },
        }
    }
}

/// Statistics registry plus the context every call is evaluated in
pub struct Server {
    registry: Arc<PluginRegistry>,
    ctx: EvalContext,
}

impl Server {
    pub fn new(config: &ServerConfig) -> Self {
        let registry = Arc::new(tabula_stats::load_stats_library(PluginRegistry::new()));
        let ctx = EvalContext::new(registry.clone()).with_precision(config.precision);
        Self { registry, ctx }
    }

    pub fn function_count(&self) -> usize {
        self.registry.len()
    }

    /// Handle one input line, returning the serialized response if one is due
    pub fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<McpRequest>(line) {
            Ok(request) => {
                tracing::debug!(method = %request.method, "processing");
                let response = self.handle_request(&request);
                if request.id.is_none() {
                    tracing::debug!(method = %request.method, "notification processed");
                    return None;
                }
                response
            }
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request");
                McpResponse::reply(None, Err(McpError::new(PARSE_ERROR, format!("Parse error: {}", e))))
            }
        };

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response");
                None
            }
        }
    }

    pub fn handle_request(&self, request: &McpRequest) -> McpResponse {
        if request.jsonrpc != "2.0" {
            return McpResponse::reply(
                request.id.clone(),
                Err(McpError::new(
                    INVALID_REQUEST,
                    format!("Unsupported jsonrpc version: {}", request.jsonrpc),
                )),
            );
        }

        let result = match request.method.as_str() {
            // Lifecycle
            "initialize" => handle_initialize(&request.params),
            "initialized" | "notifications/initialized" => Ok(json!({})),
            "ping" => Ok(json!({})),

            // Tools
            "tools/list" => handle_tools_list(),
            "tools/call" => self.handle_tool_call(&request.params),

            _ => Err(McpError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };

        McpResponse::reply(request.id.clone(), result)
    }

    fn handle_tool_call(&self, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
        let params = params
            .as_ref()
            .ok_or_else(|| McpError::invalid_params("Missing params"))?;

        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;

        let args = params.get("arguments").cloned().unwrap_or(json!({}));

        match name {
            "call" => self.tool_call(&args),
            "help" => self.tool_help(&args),
            "list_functions" => self.tool_list_functions(&args),
            _ => Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
        }
    }

    fn tool_call(&self, args: &JsonValue) -> Result<JsonValue, McpError> {
        let function = args
            .get("function")
            .and_then(|v| v.as_str())
            .ok_or_else(|| McpError::invalid_params("Missing function argument"))?;

        let values: Vec<Value> = match args.get("args") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items.iter().map(Value::from_json).collect(),
            Some(_) => return Err(McpError::invalid_params("args must be an array")),
        };

        let ctx = match args.get("precision").and_then(|v| v.as_u64()) {
            Some(p) => self.ctx.clone().with_precision(p.min(17) as u32),
            None => self.ctx.clone(),
        };

        let result = self.registry.call_function(function, &values, &ctx);
        let text = match &result {
            Value::Error(e) => format!("Error: {}", e),
            other => format!("{} = {}", function, other.render(ctx.precision)),
        };
        if let Value::Error(e) = &result {
            tracing::info!(function, code = %e.code, "call returned error");
        }

        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "data": result.to_json(),
            "isError": result.is_error()
        }))
    }

    fn tool_help(&self, args: &JsonValue) -> Result<JsonValue, McpError> {
        let name = args.get("name").and_then(|v| v.as_str());
        let help = self.registry.help(name);

        Ok(json!({
            "content": [{ "type": "text", "text": format_help(&help) }],
            "data": help.to_json()
        }))
    }

    fn tool_list_functions(&self, args: &JsonValue) -> Result<JsonValue, McpError> {
        let category = args.get("category").and_then(|v| v.as_str());
        let functions = self.registry.list_functions(category);

        let text = match functions.as_list() {
            Some(items) if !items.is_empty() => items
                .iter()
                .map(|f| format!("- `{}`: {}", f.get("usage"), f.get("description")))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => "No functions found".to_string(),
        };

        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "data": functions.to_json()
        }))
    }
}

fn handle_initialize(params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let client_info = params
        .as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown");

    // Use client's protocol version for compatibility
    let client_protocol = params
        .as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);

    tracing::info!(client = client_info, protocol = client_protocol, "client connected");

    Ok(json!({
        "protocolVersion": client_protocol,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": "Probability distributions, confidence intervals and one-sample tests"
        },
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "instructions": "Tabula evaluates binomial, Poisson, normal, Student's t and chi-squared distributions. Use 'list_functions' to discover functions, 'help' for their arguments, and 'call' to evaluate one."
    }))
}

fn handle_tools_list() -> Result<JsonValue, McpError> {
    Ok(json!({
        "tools": [
            {
                "name": "call",
                "description": "Call a statistics function with positional arguments. Optional selectors accept codes or names, e.g. sidedness \"lower\"/\"two-sided\"/\"upper\".",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "function": {
                            "type": "string",
                            "description": "Function name, e.g. binom_dist"
                        },
                        "args": {
                            "type": "array",
                            "description": "Positional arguments (numbers, booleans or selector strings)"
                        },
                        "precision": {
                            "type": "integer",
                            "description": "Significant digits in the text output (1-17)"
                        }
                    },
                    "required": ["function"]
                }
            },
            {
                "name": "help",
                "description": "Get documentation for a function, or general help when no name is given.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Function name. Omit for general help."
                        }
                    }
                }
            },
            {
                "name": "list_functions",
                "description": "List available functions, optionally filtered by category (e.g. stats/confidence).",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "category": {
                            "type": "string",
                            "description": "Category or category prefix"
                        }
                    }
                }
            }
        ]
    }))
}

fn format_help(help: &Value) -> String {
    match help {
        Value::Object(map) if map.contains_key("name") => {
            let mut out = String::new();
            if let Some(Value::Text(n)) = map.get("name") {
                out.push_str(&format!("# {}\n\n", n));
            }
            if let Some(Value::Text(d)) = map.get("description") {
                out.push_str(&format!("{}\n\n", d));
            }
            if let Some(Value::Text(u)) = map.get("usage") {
                out.push_str(&format!("**Usage:** `{}`\n\n", u));
            }
            if let Some(Value::List(args)) = map.get("args") {
                for arg in args {
                    let default = match arg.get("default") {
                        Value::Text(d) => format!(" (default {})", d),
                        _ => String::new(),
                    };
                    out.push_str(&format!(
                        "- `{}` {}: {}{}\n",
                        arg.get("name"),
                        arg.get("type"),
                        arg.get("description"),
                        default
                    ));
                }
            }
            if let Some(Value::List(examples)) = map.get("examples") {
                if !examples.is_empty() {
                    out.push_str("\n**Examples:**\n");
                    for ex in examples {
                        out.push_str(&format!("- `{}`\n", ex));
                    }
                }
            }
            out
        }
        Value::Object(map) => {
            let mut out = String::from("# Tabula functions\n\n");
            if let Some(Value::Object(categories)) = map.get("functions") {
                let mut names: Vec<&String> = categories.keys().collect();
                names.sort();
                for cat in names {
                    out.push_str(&format!("**{}:** {}\n", cat, categories[cat]));
                }
            }
            if let Some(Value::Text(usage)) = map.get("usage") {
                out.push_str(&format!("\n{}\n", usage));
            }
            out
        }
        Value::Error(e) => format!("Error: {}", e.message),
        other => other.to_string(),
    }
}
