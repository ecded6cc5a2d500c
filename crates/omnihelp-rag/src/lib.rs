//! # OmniHelp RAG
//!
//! Query orchestration for a customer-support assistant. Each question is
//! routed to one of three answer paths:
//!
//! - **Documents**: embed the query, retrieve the nearest chunks, draft a
//!   grounded answer and refine it
//! - **Orders**: have the model write one read-only SQL query, run it against
//!   the order database and phrase the rows as an answer
//! - **General**: ask the model directly, then refine
//!
//! Every stage degrades to a fallback answer instead of failing the request.
//!
//! ## Example
//!
//! ```rust,ignore
//! use omnihelp_rag::{config::RagConfig, server::RagServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RagConfig::load(None)?;
//!     RagServer::new(config).await?.start().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result, StageError};
pub use pipeline::Orchestrator;
pub use server::RagServer;
pub use types::{Query, QueryRequest, QueryResponse, RoutingDecision};
