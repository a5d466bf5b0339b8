//! Model Context Protocol (MCP) integration for the Contextual Rules Hub.
//!
//! This module wires the bootstrapped rule repository into an MCP server so editors and agent
//! hosts can browse and fetch rules over stdio. The surface area consists of:
//!
//! - Tools: `list-rules` (non-core metadata, optional context filter), `get-rule` (body text by
//!   id), `list-contexts`, and `core-rules` (body text of every core rule).
//! - Resources: `rules://stats` and `rules://sources`.
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules to make tests and
//! reviews small and targeted.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;
mod service;

pub use format::RuleMetadata;
pub use server::RulesHubServer;
pub use service::{RuleService, ServiceError};
