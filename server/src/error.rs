//! Error types for the ModelFinder server.

use modelfinder_catalog::CatalogError;
use thiserror::Error;

use crate::mcp::protocol::JsonRpcError;

/// Errors raised while dispatching a tool call.
///
/// Catalog operations themselves never fail at the capability boundary; these
/// cover malformed requests and runtime faults around them.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Missing '{0}' parameter")]
    MissingArgument(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Tool task failed: {0}")]
    Task(String),
}

impl From<ToolError> for JsonRpcError {
    fn from(err: ToolError) -> Self {
        match &err {
            ToolError::MissingArgument(_) | ToolError::InvalidArguments(_) => {
                JsonRpcError::invalid_params(err.to_string())
            }
            ToolError::UnknownTool(_) => JsonRpcError::method_not_found(err.to_string()),
            _ => JsonRpcError::internal_error(err.to_string()),
        }
    }
}

/// Result type alias for tool dispatch.
pub type ToolResult<T> = Result<T, ToolError>;
