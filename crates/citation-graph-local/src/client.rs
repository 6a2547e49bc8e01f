//! Concrete [`MetadataClient`] implementation against the Semantic Scholar
//! Graph API (spec §4.2, §6).
//!
//! Transport and decode failures never reach the caller as `Err` — per spec
//! §7 they are logged (`tracing::warn!`) and turned into an empty/absent
//! result at the point of origin, before they reach Graph Builder.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use citation_graph_core::{
    normalise_paper_id, CitationContext, CitationIntent, CitationRelationship, Error,
    MetadataClient, PaperInfo, Result, SearchFilters, SearchPage,
};
use serde::Deserialize;

use crate::config::Config;
use crate::rate_gate::RateGate;

const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// Field set requested for paper metadata (spec §6).
const PAPER_FIELDS: &str = "paperId,externalIds,title,authors,year,venue,abstract,citationCount,referenceCount,influentialCitationCount";

const CITATION_EDGE_FIELDS: &str = "contexts,intents,isInfluential,citingPaper.paperId,citingPaper.externalIds,citingPaper.title,citingPaper.authors,citingPaper.year,citingPaper.venue,citingPaper.abstract,citingPaper.citationCount,citingPaper.referenceCount,citingPaper.influentialCitationCount";

const REFERENCE_EDGE_FIELDS: &str = "contexts,intents,isInfluential,citedPaper.paperId,citedPaper.externalIds,citedPaper.title,citedPaper.authors,citedPaper.year,citedPaper.venue,citedPaper.abstract,citedPaper.citationCount,citedPaper.referenceCount,citedPaper.influentialCitationCount";

#[derive(Debug, Deserialize)]
struct PaperDto {
    #[serde(rename = "paperId")]
    paper_id: Option<String>,
    title: Option<String>,
    authors: Option<Vec<AuthorDto>>,
    year: Option<i32>,
    venue: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "externalIds")]
    external_ids: Option<ExternalIdsDto>,
    #[serde(rename = "citationCount")]
    citation_count: Option<u64>,
    #[serde(rename = "referenceCount")]
    reference_count: Option<u64>,
    #[serde(rename = "influentialCitationCount")]
    influential_citation_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AuthorDto {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIdsDto {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CitationEdgeDto {
    contexts: Option<Vec<String>>,
    intents: Option<Vec<String>>,
    #[serde(rename = "isInfluential")]
    is_influential: Option<bool>,
    #[serde(rename = "citingPaper")]
    citing_paper: Option<PaperDto>,
}

#[derive(Debug, Deserialize)]
struct ReferenceEdgeDto {
    contexts: Option<Vec<String>>,
    intents: Option<Vec<String>>,
    #[serde(rename = "isInfluential")]
    is_influential: Option<bool>,
    #[serde(rename = "citedPaper")]
    cited_paper: Option<PaperDto>,
}

#[derive(Debug, Deserialize)]
struct EdgePage<T> {
    data: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponseDto {
    total: Option<u64>,
    next: Option<u64>,
    data: Option<Vec<PaperDto>>,
}

/// A missing `title` yields "Unknown Title"; a missing author list yields
/// empty (spec §4.2). `fallback_id` is used when upstream omits `paperId`
/// (should not normally happen for a resolved paper).
fn paper_from_dto(dto: PaperDto, fallback_id: &str) -> PaperInfo {
    let paper_id = dto
        .paper_id
        .clone()
        .unwrap_or_else(|| fallback_id.to_string());
    let title = dto
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown Title".to_string());
    let authors = dto
        .authors
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| a.name)
        .collect();
    let (doi, arxiv_id) = match dto.external_ids {
        Some(ids) => (ids.doi, ids.arxiv),
        None => (None, None),
    };
    PaperInfo {
        paper_id,
        title,
        authors,
        year: dto.year,
        venue: dto.venue,
        abstract_text: dto.abstract_text,
        arxiv_id,
        doi,
        s2_paper_id: dto.paper_id,
        citation_count: dto.citation_count,
        reference_count: dto.reference_count,
        influential_citation_count: dto.influential_citation_count,
        fetched_at: SystemTime::now(),
    }
}

/// Pairs `contexts` with `intents` by index; if `intents` is shorter, the
/// remaining contexts get `unknown` (spec §4.2). `is_influential` has no
/// per-context signal upstream, so the relationship-level flag is mirrored
/// onto every context.
fn build_contexts(
    contexts: Option<Vec<String>>,
    intents: Option<Vec<String>>,
    relationship_influential: bool,
) -> Vec<CitationContext> {
    let contexts = contexts.unwrap_or_default();
    let intents = intents.unwrap_or_default();
    contexts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let intent = intents
                .get(i)
                .map(|raw| CitationIntent::from_upstream(raw))
                .unwrap_or(CitationIntent::Unknown);
            CitationContext {
                text,
                intent,
                section: None,
                is_influential: relationship_influential,
            }
        })
        .collect()
}

/// A reqwest-based [`MetadataClient`] backed by the Semantic Scholar Graph
/// API, gated by a global [`RateGate`] shared across every outbound call
/// (spec §5).
pub struct SemanticScholarClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    rate_gate: RateGate,
}

impl SemanticScholarClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("citation-graph/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        let rate_gate = if config.s2_api_key.is_some() {
            RateGate::with_api_key()
        } else {
            RateGate::without_api_key()
        };
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: config.s2_api_key.clone(),
            timeout: config.request_timeout,
            rate_gate,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url;
        self
    }

    fn apply_auth(&self, mut rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            rb = rb.header("x-api-key", key);
        }
        rb
    }

    fn paper_url(&self, segment: &str, sub: Option<&str>) -> Result<reqwest::Url> {
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| Error::Transport(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Transport("metadata service base url cannot be a base".into()))?;
            segments.push("paper").push(segment);
            if let Some(s) = sub {
                segments.push(s);
            }
        }
        Ok(url)
    }

    /// GETs `url`, treating 404 as `Ok(None)` and any transport/decode
    /// failure as `Ok(None)` after logging, per spec §7.
    async fn get_json<T>(&self, url: reqwest::Url) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        self.rate_gate.acquire().await;
        let rb = self.apply_auth(self.http.get(url.clone())).timeout(self.timeout);
        let resp = match rb.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(target: "citation_graph", %url, error = %e, "metadata client transport failure");
                return Ok(None);
            }
        };
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            tracing::warn!(target: "citation_graph", %url, status = %resp.status(), "metadata client non-success status");
            return Ok(None);
        }
        match resp.json::<T>().await {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(target: "citation_graph", %url, error = %e, "metadata client decode failure");
                Ok(None)
            }
        }
    }

    async fn edge_page<T>(&self, normalised_id: &str, kind: &str, fields: &str, limit: usize) -> Vec<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = match self.paper_url(normalised_id, Some(kind)) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("fields", fields)
                    .append_pair("limit", &limit.to_string());
                url
            }
            Err(e) => {
                tracing::warn!(target: "citation_graph", error = %e, "failed to build edge url");
                return Vec::new();
            }
        };
        match self.get_json::<EdgePage<T>>(url).await {
            Ok(Some(page)) => page.data.unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(target: "citation_graph", error = %e, "edge fetch failed");
                Vec::new()
            }
        }
    }

    /// `get_citations`/`get_references` with an additional bandwidth-saving
    /// knob: drop citation contexts from the returned relationships after
    /// fetch. Not part of the `MetadataClient` trait — core
    /// `CitationRelationship` always carries a `contexts` field either way
    /// (SPEC_FULL §F.2).
    pub async fn get_citations_with(
        &self,
        paper_id: &str,
        limit: usize,
        strip_contexts: bool,
    ) -> Result<Vec<CitationRelationship>> {
        let mut rels = MetadataClient::get_citations(self, paper_id, limit).await?;
        if strip_contexts {
            for rel in &mut rels {
                rel.contexts.clear();
            }
        }
        Ok(rels)
    }

    pub async fn get_references_with(
        &self,
        paper_id: &str,
        limit: usize,
        strip_contexts: bool,
    ) -> Result<Vec<CitationRelationship>> {
        let mut rels = MetadataClient::get_references(self, paper_id, limit).await?;
        if strip_contexts {
            for rel in &mut rels {
                rel.contexts.clear();
            }
        }
        Ok(rels)
    }
}

#[async_trait]
impl MetadataClient for SemanticScholarClient {
    async fn get_paper(&self, paper_id: &str) -> Result<Option<PaperInfo>> {
        let normalised = normalise_paper_id(paper_id);
        let mut url = self.paper_url(&normalised, None)?;
        url.query_pairs_mut().append_pair("fields", PAPER_FIELDS);
        let dto = self.get_json::<PaperDto>(url).await?;
        Ok(dto.map(|d| paper_from_dto(d, &normalised)))
    }

    async fn get_citations(&self, paper_id: &str, limit: usize) -> Result<Vec<CitationRelationship>> {
        let normalised = normalise_paper_id(paper_id);
        let limit = Config::clamp_fetch_limit(limit).max(1);
        let pivot = PaperInfo::placeholder(normalised.clone(), "Unknown Title");
        let edges = self
            .edge_page::<CitationEdgeDto>(&normalised, "citations", CITATION_EDGE_FIELDS, limit)
            .await;
        let rels = edges
            .into_iter()
            .take(limit)
            .filter_map(|edge| {
                let citing_dto = edge.citing_paper?;
                citing_dto.paper_id.as_ref()?;
                let is_influential = edge.is_influential.unwrap_or(false);
                let contexts = build_contexts(edge.contexts, edge.intents, is_influential);
                Some(CitationRelationship {
                    citing_paper: paper_from_dto(citing_dto, ""),
                    cited_paper: pivot.clone(),
                    contexts,
                    is_influential,
                })
            })
            .collect();
        Ok(rels)
    }

    async fn get_references(&self, paper_id: &str, limit: usize) -> Result<Vec<CitationRelationship>> {
        let normalised = normalise_paper_id(paper_id);
        let limit = Config::clamp_fetch_limit(limit).max(1);
        let pivot = PaperInfo::placeholder(normalised.clone(), "Unknown Title");
        let edges = self
            .edge_page::<ReferenceEdgeDto>(&normalised, "references", REFERENCE_EDGE_FIELDS, limit)
            .await;
        let rels = edges
            .into_iter()
            .take(limit)
            .filter_map(|edge| {
                let cited_dto = edge.cited_paper?;
                cited_dto.paper_id.as_ref()?;
                let is_influential = edge.is_influential.unwrap_or(false);
                let contexts = build_contexts(edge.contexts, edge.intents, is_influential);
                Some(CitationRelationship {
                    citing_paper: pivot.clone(),
                    cited_paper: paper_from_dto(cited_dto, ""),
                    contexts,
                    is_influential,
                })
            })
            .collect();
        Ok(rels)
    }

    async fn get_papers_batch(&self, paper_ids: &[String]) -> Result<BTreeMap<String, Option<PaperInfo>>> {
        if paper_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let normalised: Vec<String> = paper_ids.iter().map(|id| normalise_paper_id(id)).collect();
        self.rate_gate.acquire().await;

        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| Error::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| Error::Transport("metadata service base url cannot be a base".into()))?
            .push("paper")
            .push("batch");
        url.query_pairs_mut().append_pair("fields", PAPER_FIELDS);

        let body = serde_json::json!({ "ids": normalised });
        let none_map = || paper_ids.iter().cloned().map(|id| (id, None)).collect();

        let rb = self
            .apply_auth(self.http.post(url.clone()))
            .timeout(self.timeout)
            .json(&body);
        let resp = match rb.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(target: "citation_graph", %url, error = %e, "batch fetch transport failure");
                return Ok(none_map());
            }
        };
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(none_map());
        }
        if !resp.status().is_success() {
            tracing::warn!(target: "citation_graph", %url, status = %resp.status(), "batch fetch non-success status");
            return Ok(none_map());
        }
        let parsed: Vec<Option<PaperDto>> = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "citation_graph", %url, error = %e, "batch fetch decode failure");
                return Ok(none_map());
            }
        };

        let mut out = BTreeMap::new();
        for (original_id, dto) in paper_ids.iter().zip(parsed.into_iter()) {
            out.insert(original_id.clone(), dto.map(|d| paper_from_dto(d, original_id)));
        }
        for id in paper_ids.iter().skip(out.len()) {
            out.entry(id.clone()).or_insert(None);
        }
        Ok(out)
    }

    async fn search(&self, query: &str, limit: usize, filters: SearchFilters) -> Result<SearchPage> {
        let limit = Config::clamp_fetch_limit(limit).max(1);
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| Error::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| Error::Transport("metadata service base url cannot be a base".into()))?
            .push("paper")
            .push("search");
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query", query)
                .append_pair("limit", &limit.to_string())
                .append_pair("fields", PAPER_FIELDS);
            if let Some(year) = &filters.year {
                pairs.append_pair("year", year);
            }
            if let Some(fos) = &filters.fields_of_study {
                if !fos.is_empty() {
                    pairs.append_pair("fieldsOfStudy", &fos.join(","));
                }
            }
        }

        let resp = self.get_json::<SearchResponseDto>(url).await?;
        let Some(resp) = resp else {
            return Ok(SearchPage {
                papers: Vec::new(),
                total: 0,
                next_offset: None,
            });
        };

        // The upstream search endpoint has no `minCitationCount` parameter
        // (SPEC_FULL §F.3); filter client-side, same pattern the teacher
        // uses for year filtering it can't push upstream.
        let mut papers: Vec<PaperInfo> = resp
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|d| paper_from_dto(d, ""))
            .collect();
        if let Some(min_citations) = filters.min_citations {
            papers.retain(|p| p.citation_count.unwrap_or(0) >= min_citations);
        }

        Ok(SearchPage {
            papers,
            total: resp.total.unwrap_or(0),
            next_offset: resp.next,
        })
    }
}

/// Citation-summary shortcut (SPEC_FULL §F.1): fetches a single paper's
/// metadata and returns its citation metrics without building a graph.
#[derive(Debug, Clone)]
pub struct CitationSummary {
    pub paper_id: String,
    pub title: String,
    pub citation_count: Option<u64>,
    pub reference_count: Option<u64>,
    pub influential_citation_count: Option<u64>,
}

pub async fn citation_summary(
    client: &dyn MetadataClient,
    paper_id: &str,
) -> Result<Option<CitationSummary>> {
    let paper = client.get_paper(paper_id).await?;
    Ok(paper.map(|p| CitationSummary {
        paper_id: p.paper_id,
        title: p.title,
        citation_count: p.citation_count,
        reference_count: p.reference_count,
        influential_citation_count: p.influential_citation_count,
    }))
}
