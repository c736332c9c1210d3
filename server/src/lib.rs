//! ModelFinder Server Library
//!
//! Agent-facing surface of the model catalog: text capabilities, the MCP
//! server that exposes them over stdio, the command-line interface and the
//! model card fetcher used when refreshing snapshots.

pub mod capabilities;
pub mod cli;
pub mod error;
pub mod fetch;
pub mod mcp;

pub use capabilities::CatalogTools;
pub use error::{ToolError, ToolResult};
pub use mcp::McpServer;
