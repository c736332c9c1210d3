//! MCP (Model Context Protocol) Server Module
//!
//! Exposes the model catalog to AI clients such as Claude Desktop, Cursor and
//! Cline.
//!
//! ## Usage
//!
//! ```bash
//! modelfinder --data-dir ./data serve
//! ```
//!
//! The MCP server communicates via stdio using JSON-RPC 2.0.

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::*;
pub use server::McpServer;
