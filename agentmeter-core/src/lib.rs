//! # agentmeter-core
//!
//! Core library for agentmeter - a cost and usage meter for OpenCode agents.
//!
//! This library provides:
//! - Domain types for sessions and messages as OpenCode stores them
//! - A read-only record store over the OpenCode SQLite database
//! - The aggregation engine (per-session, per-agent, per-provider, timeline)
//! - A client for the Codex usage endpoint
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Data flow
//!
//! record store → message classifier → {session, agent, provider, timeline}
//! folds (single pass) → session tree reduction → [`DashboardData`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use agentmeter_core::{aggregate, load_corpus, Config, ProviderCatalog};
//!
//! let config = Config::load().expect("failed to load config");
//! let corpus = load_corpus(&config.database_path()).expect("failed to read database");
//! let catalog = ProviderCatalog::with_overrides(&config.providers);
//!
//! let data = aggregate(&corpus.sessions, &corpus.messages, &catalog);
//! println!("{} billable messages", data.totals.messages);
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{aggregate, aggregate_at, session_detail, DashboardData, SessionDetail};
pub use catalog::{BillingClassifier, BillingType, ProviderCatalog};
pub use config::Config;
pub use error::{Error, Result};
pub use store::{load_corpus, Corpus, RecordStore, SqliteStore};
pub use types::*;
pub use usage::{UsageClient, UsageSnapshot};

// Public modules
pub mod analytics;
pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod store;
pub mod types;
pub mod usage;
