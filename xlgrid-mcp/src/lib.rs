//! MCP stdio server for windowed reads and writes of xlsx sheets.

pub mod config;
pub mod error;
pub mod protocol;
pub mod render;
pub mod server;
pub mod tools;

pub use config::Config;
pub use error::McpError;
pub use server::Server;
