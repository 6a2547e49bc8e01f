//! Local (I/O-bearing) half of the citation graph engine: a Semantic
//! Scholar-backed [`MetadataClient`] and the concurrent [`GraphBuilder`]
//! that drives it.
//!
//! Everything in `citation_graph_core` is pure and synchronous; this crate
//! is where an async runtime, HTTP, and rate limiting live.

pub mod builder;
pub mod client;
pub mod config;
pub mod rate_gate;

pub use builder::GraphBuilder;
pub use client::{citation_summary, CitationSummary, SemanticScholarClient};
pub use config::Config;
pub use rate_gate::RateGate;
