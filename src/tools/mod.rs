//! Retrieval tools consumed by research workers
//!
//! This module provides the tool infrastructure workers use to gather raw
//! material: web search and local file search. Both return sequences of
//! [`crate::types::SourceDocument`] (a source locator plus retrieved
//! content), the only shape the evidence compressor accepts.
//!
//! # Module Structure
//!
//! - [`registry`](crate::tools::registry) - Tool registration and discovery
//! - [`web_search`](crate::tools::web_search) - Web search via DuckDuckGo
//! - [`file_search`](crate::tools::file_search) - Local file search under a
//!   configured root
//!
//! An empty result set is a valid outcome, not an error; tools fail with
//! `ToolUnavailable` only when the backing capability itself is broken.

/// Local file search tool.
pub mod file_search;
/// Tool registry for managing available tools.
pub mod registry;
/// Web search tool using DuckDuckGo.
pub mod web_search;

pub use registry::{Tool, ToolRegistry};
