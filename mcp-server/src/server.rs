//! MCP Server implementation
//!
//! Each request runs in its own task so a slow tool never blocks `ping` or
//! other calls; responses are written in completion order.
//! `notifications/cancelled` aborts the matching task and no response is sent
//! for it. When the client closes its end, every in-flight task is aborted.

use crate::error::{McpError, McpResult};
use crate::protocol::{
    methods, InitializeResult, McpRequest, McpResponse, ServerInfo, ToolInput, ToolResult, PROTOCOL_VERSION,
};
use crate::render::to_call_result;
use crate::tools::ToolsRegistry;
use crate::transport::Transport;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

/// MCP Server
pub struct Server {
    info: ServerInfo,
    tools: ToolsRegistry,
}

impl Server {
    /// Create a new MCP server
    pub fn new(name: impl Into<String>, version: impl Into<String>, tools: ToolsRegistry) -> Self {
        let info = ServerInfo {
            name: name.into(),
            version: version.into(),
        };
        info!(server = %info.name, tools = tools.len(), "Initializing MCP Server");
        Self { info, tools }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn tools(&self) -> &ToolsRegistry {
        &self.tools
    }

    /// Handle an MCP request. Notifications produce no response.
    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        let started = Instant::now();
        let method = request.method.clone();
        let tool = if method == methods::CALL_TOOL {
            request.params.get("name").and_then(Value::as_str).map(str::to_string)
        } else {
            None
        };

        let response = match self.dispatch(request).await {
            Ok(result) => McpResponse::success(id, result),
            Err(e) => {
                warn!(method = %method, code = e.code(), error = %e, "MCP request failed");
                McpResponse::failure(id, e.to_protocol_error())
            }
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(method = %method, tool = tool.as_deref().unwrap_or("-"), elapsed_ms, "MCP request handled");
        Some(response)
    }

    /// Parse one raw message and handle it
    pub async fn handle_message(&self, message: &str) -> Option<McpResponse> {
        match parse_request(message) {
            Ok(request) => self.handle_request(request).await,
            Err(response) => Some(response),
        }
    }

    async fn dispatch(&self, request: McpRequest) -> McpResult<Value> {
        debug!(method = %request.method, "Handling MCP request");

        match request.method.as_str() {
            methods::INITIALIZE => Ok(serde_json::to_value(self.handle_initialize())?),
            methods::PING => Ok(json!({})),
            methods::LIST_TOOLS => Ok(json!({ "tools": self.tools.list() })),
            methods::CALL_TOOL => {
                let input: ToolInput =
                    serde_json::from_value(request.params).map_err(|e| McpError::InvalidParams(e.to_string()))?;
                let result = match self.tools.execute(input).await {
                    Ok(result) => result,
                    Err(e @ (McpError::InvalidParams(_) | McpError::UnknownTool(_))) => return Err(e),
                    Err(e) => {
                        error!(error = %e, "Tool execution failed");
                        ToolResult::error(e.to_string())
                    }
                };
                Ok(serde_json::to_value(to_call_result(result))?)
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn handle_notification(&self, request: &McpRequest) {
        match request.method.as_str() {
            methods::INITIALIZED => info!("MCP client initialized"),
            methods::CANCELLED => debug!("Cancellation received outside the serve loop"),
            other => debug!(method = %other, "Ignoring notification"),
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_info: self.info.clone(),
            capabilities: json!({ "tools": {} }),
        }
    }

    /// Serve requests until the client closes the transport.
    ///
    /// Undecodable messages are answered with a parse error and reading goes
    /// on. A fatal transport error ends the session like EOF does, then is
    /// returned.
    pub async fn serve<T: Transport>(self: Arc<Self>, mut transport: T) -> McpResult<()> {
        info!(server = %self.info.name, "MCP server listening");

        let (completed_tx, mut completed_rx) = mpsc::unbounded_channel::<(String, McpResponse)>();
        let mut in_flight: HashMap<String, AbortHandle> = HashMap::new();

        let outcome = loop {
            tokio::select! {
                message = transport.read_request() => {
                    let message = match message {
                        Ok(Some(message)) => message,
                        Ok(None) => break Ok(()),
                        Err(McpError::Parse(reason)) => {
                            warn!(error = %reason, "Undecodable MCP message");
                            let response = McpResponse::failure(Value::Null, McpError::Parse(reason).to_protocol_error());
                            if let Err(e) = write(&mut transport, &response).await {
                                break Err(e);
                            }
                            continue;
                        }
                        Err(e) => break Err(e),
                    };
                    let request = match parse_request(&message) {
                        Ok(request) => request,
                        Err(response) => {
                            if let Err(e) = write(&mut transport, &response).await {
                                break Err(e);
                            }
                            continue;
                        }
                    };

                    if request.method == methods::CANCELLED {
                        cancel(&mut in_flight, &request.params);
                        continue;
                    }

                    let Some(id) = request.id.clone() else {
                        self.handle_notification(&request);
                        continue;
                    };

                    let key = id.to_string();
                    let server = Arc::clone(&self);
                    let completed = completed_tx.clone();
                    let task_key = key.clone();
                    let task = tokio::spawn(async move {
                        if let Some(response) = server.handle_request(request).await {
                            // receiver only closes when the loop has ended
                            completed.send((task_key, response)).ok();
                        }
                    });
                    in_flight.insert(key, task.abort_handle());
                }
                Some((key, response)) = completed_rx.recv() => {
                    in_flight.remove(&key);
                    if let Err(e) = write(&mut transport, &response).await {
                        break Err(e);
                    }
                }
            }
        };

        if !in_flight.is_empty() {
            info!(in_flight = in_flight.len(), "Session ended, abandoning in-flight requests");
        }
        for (_, task) in in_flight.drain() {
            task.abort();
        }
        match &outcome {
            Ok(()) => info!("MCP server stopped"),
            Err(e) => error!(error = %e, "MCP transport failed, server stopped"),
        }
        outcome
    }
}

/// Parse one message, producing the error response to send when it is unusable
fn parse_request(message: &str) -> Result<McpRequest, McpResponse> {
    let value: Value = serde_json::from_str(message).map_err(|e| {
        warn!(error = %e, "Unparseable MCP message");
        McpResponse::failure(Value::Null, McpError::Parse(e.to_string()).to_protocol_error())
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value::<McpRequest>(value)
        .map_err(|e| McpResponse::failure(id, McpError::Protocol(e.to_string()).to_protocol_error()))
}

fn cancel(in_flight: &mut HashMap<String, AbortHandle>, params: &Value) {
    let Some(request_id) = params.get("requestId") else {
        return;
    };
    match in_flight.remove(&request_id.to_string()) {
        Some(task) => {
            task.abort();
            info!(request_id = %request_id, "Request cancelled by client");
        }
        None => debug!(request_id = %request_id, "Cancellation for unknown or finished request"),
    }
}

async fn write<T: Transport>(transport: &mut T, response: &McpResponse) -> McpResult<()> {
    let line = serde_json::to_string(response)?;
    transport.write_response(&line).await
}
