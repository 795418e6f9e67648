//! Model Context Protocol (MCP) Server
//!
//! JSON-RPC 2.0 framing for exposing tools to AI agents and clients.
//!
//! # MCP Server Capabilities
//!
//! - **Lifecycle**: `initialize`, `notifications/initialized`, `ping`
//! - **Tools**: `tools/list` and `tools/call` over a [`ToolsRegistry`] of [`McpTool`]s
//! - **Cancellation**: `notifications/cancelled` aborts the matching in-flight call
//!
//! # Architecture
//!
//! The server is transport-agnostic ([`Transport`]); the binary wires it to
//! newline-delimited JSON on stdin/stdout. Logs must never go to stdout.
//!
//! ```no_run
//! use mcp_server::{stdio, Server, ToolsRegistry};
//! use std::sync::Arc;
//!
//! # async fn run() -> mcp_server::Result<()> {
//! let server = Arc::new(Server::new("my-server", "0.1.0", ToolsRegistry::new()));
//! server.serve(stdio()).await
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod render;
pub mod server;
pub mod tools;
pub mod transport;

pub use error::{McpError, McpResult};
pub use error::{McpError as Error, McpResult as Result};
pub use protocol::*;
pub use render::*;
pub use server::*;
pub use tools::*;
pub use transport::*;
