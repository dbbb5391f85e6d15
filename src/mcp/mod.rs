//! MCP Server for DevMemory
//!
//! Exposes every memory service operation as a tool over stdio.

mod server;

pub use server::{run_mcp_server, DevMemoryServer};
