//! Google Workspace MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing Gmail, Google Drive and
//! Google Calendar (with Meet links) as tools, plus a few workflows that
//! combine them.

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod google;
pub mod mcp;
pub mod registry;
pub mod workflow;

pub use config::Config;
pub use error::{Result, WorkspaceMcpError};
