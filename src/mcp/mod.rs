//! MCP (Model Context Protocol) module
//!
//! Protocol framing, the tool catalog and dispatch onto the Google services.

pub mod args;
pub mod catalog;
pub mod dispatcher;
pub mod server;
pub mod types;

pub use dispatcher::ToolDispatcher;
pub use server::McpServer;
