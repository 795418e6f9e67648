use crate::protocol::{error_codes, McpProtocolError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    Protocol(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl McpError {
    /// JSON-RPC error code for this error
    pub fn code(&self) -> i32 {
        match self {
            McpError::Parse(_) => error_codes::PARSE_ERROR,
            McpError::Protocol(_) => error_codes::INVALID_REQUEST,
            McpError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpError::InvalidParams(_) | McpError::UnknownTool(_) => error_codes::INVALID_PARAMS,
            McpError::Tool(_) | McpError::Transport(_) | McpError::Serialization(_) => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn to_protocol_error(&self) -> McpProtocolError {
        McpProtocolError {
            code: self.code(),
            message: self.to_string(),
            data: None,
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;
