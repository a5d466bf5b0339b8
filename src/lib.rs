#![deny(missing_docs)]

//! Core library for the Contextual Rules Hub MCP server.

/// Bootstrap orchestration across configured rule sources.
pub mod bootstrap;
/// Environment-driven configuration discovery and parsing.
pub mod config;
/// Rule loaders and the loader factory.
pub mod loader;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Rule entity and on-demand content loading.
pub mod model;
/// In-memory rule repository and query engine.
pub mod repository;
/// Source configurations and the kind registry.
pub mod source;
