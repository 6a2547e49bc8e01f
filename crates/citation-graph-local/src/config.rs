use std::time::Duration;

/// Runtime configuration surface (spec §6, expanded in SPEC_FULL.md §D).
///
/// A plain struct populated from the environment, mirroring the teacher's
/// inline `env::var` lookups rather than a builder or a separate config
/// crate.
#[derive(Debug, Clone)]
pub struct Config {
    pub s2_api_key: Option<String>,
    pub request_timeout: Duration,
    pub max_citations: usize,
    pub max_references: usize,
    pub max_graph_depth: u8,
    pub max_papers_per_level: usize,
    pub max_search_results: usize,
    pub max_concurrent_requests: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            s2_api_key: None,
            request_timeout: Duration::from_secs(60),
            max_citations: 100,
            max_references: 100,
            max_graph_depth: 3,
            max_papers_per_level: 50,
            max_search_results: 50,
            max_concurrent_requests: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(key) = env_non_empty("S2_API_KEY") {
            config.s2_api_key = Some(key);
        }
        if let Some(secs) = env_non_empty("CITATION_GRAPH_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = env_non_empty("CITATION_GRAPH_MAX_CITATIONS").and_then(|v| v.parse().ok()) {
            config.max_citations = n;
        }
        if let Some(n) = env_non_empty("CITATION_GRAPH_MAX_REFERENCES").and_then(|v| v.parse().ok()) {
            config.max_references = n;
        }
        if let Some(n) = env_non_empty("CITATION_GRAPH_MAX_DEPTH").and_then(|v| v.parse().ok()) {
            config.max_graph_depth = n;
        }
        if let Some(n) = env_non_empty("CITATION_GRAPH_MAX_PAPERS_PER_LEVEL").and_then(|v| v.parse().ok()) {
            config.max_papers_per_level = n;
        }
        if let Some(n) = env_non_empty("CITATION_GRAPH_MAX_SEARCH_RESULTS").and_then(|v| v.parse().ok()) {
            config.max_search_results = n;
        }
        if let Some(n) = env_non_empty("CITATION_GRAPH_MAX_CONCURRENT_REQUESTS").and_then(|v| v.parse().ok()) {
            config.max_concurrent_requests = n;
        }
        config
    }

    /// Clamps a caller-supplied limit at the remote service maximum (spec §4.2).
    pub fn clamp_fetch_limit(limit: usize) -> usize {
        limit.min(100)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
