//! Tool bridge
//!
//! Reads the user API's OpenAPI document and exposes every operation as an
//! MCP tool over the SSE transport:
//! - `GET /sse` opens a session stream and announces the message endpoint
//! - `POST /messages/?session_id=..` carries JSON-RPC requests
//!
//! Tool calls are forwarded to the API over HTTP.

pub mod bootstrap;
pub mod catalog;
pub mod client;
pub mod errors;
pub mod invoker;
pub mod protocol;
pub mod sse;
pub mod transport;

pub use catalog::{Tool, ToolCatalog};
pub use client::McpClient;
pub use errors::BridgeError;
pub use protocol::McpHandler;
