use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{CitationRelationship, PaperInfo};

/// A single page of search results (spec §4.2 `search`).
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub papers: Vec<PaperInfo>,
    pub total: u64,
    pub next_offset: Option<u64>,
}

/// Optional filters accepted by `MetadataClient::search`.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// `YYYY`, `YYYY-YYYY`, `YYYY-`, or `-YYYY`.
    pub year: Option<String>,
    pub fields_of_study: Option<Vec<String>>,
    pub min_citations: Option<u64>,
}

/// The seam crossed by Graph Builder: a client for the remote citation graph
/// metadata service (spec §4.2). Implementations never propagate transport or
/// decode failures as `Err` — absence is represented in the return value
/// (empty vector, `None`, or an absent batch entry), per spec §7.
#[async_trait::async_trait]
pub trait MetadataClient: Send + Sync {
    async fn get_paper(&self, paper_id: &str) -> Result<Option<PaperInfo>>;

    /// Arcs where `cited == paper_id`, i.e. papers that cite `paper_id`.
    async fn get_citations(
        &self,
        paper_id: &str,
        limit: usize,
    ) -> Result<Vec<CitationRelationship>>;

    /// Arcs where `citing == paper_id`, i.e. papers `paper_id` cites.
    async fn get_references(
        &self,
        paper_id: &str,
        limit: usize,
    ) -> Result<Vec<CitationRelationship>>;

    async fn get_papers_batch(
        &self,
        paper_ids: &[String],
    ) -> Result<BTreeMap<String, Option<PaperInfo>>>;

    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: SearchFilters,
    ) -> Result<SearchPage>;
}
