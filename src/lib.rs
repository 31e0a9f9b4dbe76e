//! # ODCAF Server
//!
//! Serves the Open Database of Cultural and Art Facilities (ODCAF), a static
//! Statistics Canada export of cultural sites, over a REST API, the Model
//! Context Protocol, and a small result widget.
//!
//! The dataset is loaded once at startup into an immutable
//! [`DatasetIndex`](odcaf_core::DatasetIndex) and shared by reference;
//! nothing mutates it afterwards.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────────────┐
//! │ ODCAF CSV  │──▶│ DatasetIndex │──▶│ ToolContext (limits, │
//! │ (startup)  │   │ (odcaf-core) │   │ input validation)    │
//! └────────────┘   └──────────────┘   └──────────┬───────────┘
//!                                                │
//!               ┌──────────────┬─────────────────┼──────────────┐
//!               ▼              ▼                 ▼              ▼
//!          ┌─────────┐   ┌───────────┐   ┌──────────────┐  ┌─────────┐
//!          │   CLI   │   │ REST /api │   │ MCP /mcp+/sse│  │ /tools  │
//!          │ (odcaf) │   └───────────┘   └──────────────┘  └─────────┘
//!          └─────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`dataset`] | Startup load of the CSV file |
//! | [`traits`] | Tool trait, query boundary, tool registry |
//! | [`output`] | Tagged tool output |
//! | [`server`] | HTTP server |
//! | [`mcp`] | MCP protocol bridge |
//! | [`sse`] | Legacy MCP SSE transport |
//! | [`widget`] | Widget document rendering |
//! | [`search`], [`get`], [`stats`] | CLI commands |

pub mod config;
pub mod dataset;
pub mod get;
pub mod mcp;
pub mod output;
pub mod search;
pub mod server;
pub mod sse;
pub mod stats;
pub mod traits;
pub mod widget;
