//! # ARDF Manager
//!
//! A catalog manager for ARDF resources (tools, prompts, resources and
//! workflows described by the Agentic Resource Description Format).
//!
//! ARDF Manager pulls descriptors from remote MCP-style catalogs, normalizes
//! them into a local SQLite store, and recommends resources for free-text
//! queries with a hybrid lexical + semantic ranker. Everything is exposed
//! through the `ardf` CLI and a small JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ HTTP catalog │──▶│     Sync     │──▶│  SQLite  │
//! │ tools/prompts│   │  normalize   │   │ resources│
//! └──────────────┘   └──────────────┘   └────┬─────┘
//!                                            │
//!                                  ┌─────────┴─────────┐
//!                                  ▼                   ▼
//!                             ┌──────────┐       ┌──────────┐
//!                             │   CLI    │       │   HTTP   │
//!                             │  (ardf)  │       │   API    │
//!                             └──────────┘       └──────────┘
//! ```
//!
//! Storage-agnostic logic (models, ranking, descriptor normalization, the
//! store trait) lives in the `ardf-core` crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and env overrides |
//! | [`error`] | Configuration, fetch and sync error types |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite-backed `ResourceStore` |
//! | [`embedding`] | OpenAI-compatible provider and provider factory |
//! | [`connector_http`] | HTTP catalog source |
//! | [`sync`] | Catalog sync coordinator |
//! | [`search`] | Catalog listing and recommendations |
//! | [`get`] | `ardf get` and `ardf add` |
//! | [`ingest`] | `ardf sync` |
//! | [`sources`] | `ardf sources` |
//! | [`server`] | HTTP API server |

pub mod config;
pub mod connector_http;
pub mod db;
pub mod embedding;
pub mod error;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sources;
pub mod sqlite_store;
pub mod sync;
