//! Concurrent, level-synchronous Graph Builder (spec §4.3, §5).

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use citation_graph_core::{
    clamp_depth, CitationGraph, CitationRelationship, Direction, MetadataClient, PaperInfo, Result,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::Config;

/// Level-bounded BFS coordinator. Holds only a client handle and the
/// concurrency/limit knobs it needs per build; carries no mutable state
/// between calls.
pub struct GraphBuilder {
    client: Arc<dyn MetadataClient>,
    max_concurrent_requests: usize,
}

/// One pivot's outgoing relationships for a single level, tagged with which
/// direction produced them so the merge step knows how to read the edge.
enum LevelFetch {
    Citations(String, Result<Vec<CitationRelationship>>),
    References(String, Result<Vec<CitationRelationship>>),
}

impl GraphBuilder {
    pub fn new(client: Arc<dyn MetadataClient>, config: &Config) -> Self {
        Self {
            client,
            max_concurrent_requests: config.max_concurrent_requests.max(1),
        }
    }

    /// Builds a graph rooted at `root_id` (spec §4.3 steps 1-4).
    pub async fn build(
        &self,
        root_id: &str,
        depth: u8,
        direction: Direction,
        max_per_level: usize,
    ) -> Result<CitationGraph> {
        let depth = clamp_depth(depth);
        let max_per_level = max_per_level.max(1);

        let mut papers: BTreeMap<String, PaperInfo> = BTreeMap::new();
        let mut edges: Vec<(String, String)> = Vec::new();
        let mut edge_set: HashSet<(String, String)> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();

        let root = match self.client.get_paper(root_id).await {
            Ok(Some(paper)) => paper,
            Ok(None) => PaperInfo::placeholder(root_id, "Unknown"),
            Err(e) => {
                tracing::warn!(target: "citation_graph", error = %e, "root paper fetch failed, using placeholder");
                PaperInfo::placeholder(root_id, "Unknown")
            }
        };
        let root_id = root.paper_id.clone();
        papers.insert(root_id.clone(), root);

        let mut frontier: HashSet<String> = HashSet::new();
        frontier.insert(root_id.clone());

        for _level in 0..depth {
            let pending: Vec<String> = frontier
                .iter()
                .filter(|pid| !visited.contains(*pid))
                .cloned()
                .collect();
            if pending.is_empty() {
                break;
            }
            for pid in &pending {
                visited.insert(pid.clone());
            }

            let results = self.fetch_level(&pending, direction, max_per_level).await;

            let mut next_frontier: HashSet<String> = HashSet::new();
            for result in results {
                let (pivot, rels, is_citations) = match result {
                    LevelFetch::Citations(pivot, rels) => (pivot, rels, true),
                    LevelFetch::References(pivot, rels) => (pivot, rels, false),
                };
                let rels = match rels {
                    Ok(rels) => rels,
                    Err(e) => {
                        tracing::warn!(target: "citation_graph", pivot = %pivot, error = %e, "level fetch failed, continuing");
                        continue;
                    }
                };
                for rel in rels.into_iter().take(max_per_level) {
                    let other = if is_citations {
                        rel.citing_paper.clone()
                    } else {
                        rel.cited_paper.clone()
                    };
                    if !papers.contains_key(&other.paper_id) {
                        next_frontier.insert(other.paper_id.clone());
                        papers.insert(other.paper_id.clone(), other);
                    }
                    let edge = (rel.citing_paper.paper_id.clone(), rel.cited_paper.paper_id.clone());
                    if edge_set.insert(edge.clone()) {
                        edges.push(edge);
                    }
                }
            }

            frontier = next_frontier;
            if frontier.is_empty() {
                break;
            }
        }

        Ok(CitationGraph::new(root_id, papers, edges, depth, direction))
    }

    /// Builds a graph that accumulates each `paper_ids` entry's immediate
    /// neighbourhood without BFS expansion, used by the comparison analyser
    /// (spec §4.8). Returns the graph plus the resolved canonical id for each
    /// input, in the same order — the caller's raw ids (e.g. arXiv ids) may
    /// differ from the ids the graph's nodes end up keyed by.
    pub async fn build_from_papers(
        &self,
        paper_ids: &[String],
        limit: usize,
    ) -> Result<(CitationGraph, Vec<String>)> {
        let limit = limit.max(1);
        let mut papers: BTreeMap<String, PaperInfo> = BTreeMap::new();
        let mut edges: Vec<(String, String)> = Vec::new();
        let mut edge_set: HashSet<(String, String)> = HashSet::new();
        let mut resolved_ids: Vec<String> = Vec::with_capacity(paper_ids.len());

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_requests));
        let mut fetches: JoinSet<(String, Result<Option<PaperInfo>>)> = JoinSet::new();
        for raw_id in paper_ids {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let raw_id = raw_id.clone();
            fetches.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let result = client.get_paper(&raw_id).await;
                (raw_id, result)
            });
        }
        let mut fetched: BTreeMap<String, PaperInfo> = BTreeMap::new();
        while let Some(joined) = fetches.join_next().await {
            let (raw_id, result) = joined.expect("paper fetch task panicked");
            let paper = match result {
                Ok(Some(paper)) => paper,
                Ok(None) => PaperInfo::placeholder(raw_id.clone(), "Unknown"),
                Err(e) => {
                    tracing::warn!(target: "citation_graph", paper_id = %raw_id, error = %e, "paper fetch failed, using placeholder");
                    PaperInfo::placeholder(raw_id.clone(), "Unknown")
                }
            };
            fetched.insert(raw_id, paper);
        }
        for raw_id in paper_ids {
            let paper = fetched.remove(raw_id).expect("every requested id was fetched");
            resolved_ids.push(paper.paper_id.clone());
            papers.entry(paper.paper_id.clone()).or_insert(paper);
        }

        let pivots = resolved_ids.clone();
        let results = self.fetch_level(&pivots, Direction::Both, limit).await;
        for result in results {
            let (_pivot, rels, is_citations) = match result {
                LevelFetch::Citations(pivot, rels) => (pivot, rels, true),
                LevelFetch::References(pivot, rels) => (pivot, rels, false),
            };
            let rels = match rels {
                Ok(rels) => rels,
                Err(e) => {
                    tracing::warn!(target: "citation_graph", error = %e, "neighbourhood fetch failed, continuing");
                    continue;
                }
            };
            for rel in rels.into_iter().take(limit) {
                let other = if is_citations {
                    rel.citing_paper.clone()
                } else {
                    rel.cited_paper.clone()
                };
                papers.entry(other.paper_id.clone()).or_insert(other);
                let edge = (rel.citing_paper.paper_id.clone(), rel.cited_paper.paper_id.clone());
                if edge_set.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }

        let root_paper_id = resolved_ids
            .first()
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        let graph = CitationGraph::new(root_paper_id, papers, edges, clamp_depth(1), Direction::Both);
        Ok((graph, resolved_ids))
    }

    /// Runs citations/references/both fetches for `pivots` with bounded
    /// concurrency, joining at the level boundary (spec §5: "bulk-synchronous
    /// per level").
    async fn fetch_level(
        &self,
        pivots: &[String],
        direction: Direction,
        max_per_level: usize,
    ) -> Vec<LevelFetch> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_requests));
        let mut tasks: JoinSet<LevelFetch> = JoinSet::new();

        for pid in pivots {
            if matches!(direction, Direction::Citations | Direction::Both) {
                let client = Arc::clone(&self.client);
                let semaphore = Arc::clone(&semaphore);
                let pid = pid.clone();
                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                    let result = client.get_citations(&pid, max_per_level).await;
                    LevelFetch::Citations(pid, result)
                });
            }
            if matches!(direction, Direction::References | Direction::Both) {
                let client = Arc::clone(&self.client);
                let semaphore = Arc::clone(&semaphore);
                let pid = pid.clone();
                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                    let result = client.get_references(&pid, max_per_level).await;
                    LevelFetch::References(pid, result)
                });
            }
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(fetch) => results.push(fetch),
                Err(e) => {
                    tracing::warn!(target: "citation_graph", error = %e, "level fetch task panicked");
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use citation_graph_core::{CitationContext, CitationIntent, SearchFilters, SearchPage};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    /// An in-memory `MetadataClient` double: a tiny fixed citation graph with
    /// no network, used the way the teacher mocks backends in unit tests.
    struct FixtureClient {
        papers: HashMap<String, PaperInfo>,
        citations: HashMap<String, Vec<CitationRelationship>>,
        references: HashMap<String, Vec<CitationRelationship>>,
        calls: StdMutex<Vec<String>>,
    }

    fn paper(id: &str) -> PaperInfo {
        PaperInfo::placeholder(id, format!("Title {id}"))
    }

    fn rel(citing: &str, cited: &str) -> CitationRelationship {
        CitationRelationship {
            citing_paper: paper(citing),
            cited_paper: paper(cited),
            contexts: vec![CitationContext {
                text: "see also".into(),
                intent: CitationIntent::Background,
                section: None,
                is_influential: false,
            }],
            is_influential: false,
        }
    }

    #[async_trait]
    impl MetadataClient for FixtureClient {
        async fn get_paper(&self, paper_id: &str) -> Result<Option<PaperInfo>> {
            self.calls.lock().unwrap().push(format!("get_paper:{paper_id}"));
            Ok(self.papers.get(paper_id).cloned())
        }

        async fn get_citations(&self, paper_id: &str, limit: usize) -> Result<Vec<CitationRelationship>> {
            self.calls.lock().unwrap().push(format!("get_citations:{paper_id}"));
            Ok(self
                .citations
                .get(paper_id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .take(limit)
                .collect())
        }

        async fn get_references(&self, paper_id: &str, limit: usize) -> Result<Vec<CitationRelationship>> {
            self.calls.lock().unwrap().push(format!("get_references:{paper_id}"));
            Ok(self
                .references
                .get(paper_id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .take(limit)
                .collect())
        }

        async fn get_papers_batch(&self, paper_ids: &[String]) -> Result<BTreeMap<String, Option<PaperInfo>>> {
            Ok(paper_ids
                .iter()
                .map(|id| (id.clone(), self.papers.get(id).cloned()))
                .collect())
        }

        async fn search(&self, _query: &str, _limit: usize, _filters: SearchFilters) -> Result<SearchPage> {
            Ok(SearchPage {
                papers: Vec::new(),
                total: 0,
                next_offset: None,
            })
        }
    }

    /// root -(references)-> A -(references)-> B, direction both so citations
    /// are also probed (and come back empty).
    fn two_level_fixture() -> FixtureClient {
        let mut references = HashMap::new();
        references.insert("root".to_string(), vec![rel("root", "A")]);
        references.insert("A".to_string(), vec![rel("A", "B")]);
        let mut papers = HashMap::new();
        for id in ["root", "A", "B"] {
            papers.insert(id.to_string(), paper(id));
        }
        FixtureClient {
            papers,
            citations: HashMap::new(),
            references,
            calls: StdMutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn build_expands_level_by_level_and_stops_at_depth() {
        let client: Arc<dyn MetadataClient> = Arc::new(two_level_fixture());
        let builder = GraphBuilder::new(client, &Config::default());
        let graph = builder.build("root", 1, Direction::Both, 50).await.unwrap();

        assert_eq!(graph.root_paper_id, "root");
        assert!(graph.papers.contains_key("A"));
        assert!(
            !graph.papers.contains_key("B"),
            "depth 1 must expand exactly one level past the root"
        );
        assert!(graph.edges.contains(&("root".to_string(), "A".to_string())));
    }

    #[tokio::test]
    async fn build_expands_two_levels_when_depth_is_two() {
        let client: Arc<dyn MetadataClient> = Arc::new(two_level_fixture());
        let builder = GraphBuilder::new(client, &Config::default());
        let graph = builder.build("root", 2, Direction::Both, 50).await.unwrap();

        assert!(graph.papers.contains_key("A"));
        assert!(
            graph.papers.contains_key("B"),
            "depth 2 must expand two levels past the root"
        );
        assert!(graph.edges.contains(&("A".to_string(), "B".to_string())));
    }

    #[tokio::test]
    async fn trivial_graph_with_no_citations_or_references() {
        let mut papers = HashMap::new();
        papers.insert("ARXIV:2103.12345".to_string(), paper("ARXIV:2103.12345"));
        let client: Arc<dyn MetadataClient> = Arc::new(FixtureClient {
            papers,
            citations: HashMap::new(),
            references: HashMap::new(),
            calls: StdMutex::new(Vec::new()),
        });
        let builder = GraphBuilder::new(client, &Config::default());
        let graph = builder
            .build("ARXIV:2103.12345", 1, Direction::Both, 50)
            .await
            .unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.papers.contains_key("ARXIV:2103.12345"));
    }

    #[tokio::test]
    async fn build_terminates_early_when_frontier_empties() {
        let client: Arc<dyn MetadataClient> = Arc::new(two_level_fixture());
        let builder = GraphBuilder::new(client, &Config::default());
        // depth 3 fully exhausts the fixture (root -> A -> B, B has no further
        // edges); the third iteration's frontier comes back empty and the
        // loop must break instead of erroring on an empty pending set.
        let graph = builder.build("root", 3, Direction::Both, 50).await.unwrap();
        assert!(graph.papers.contains_key("B"));
        assert_eq!(graph.node_count(), 3);
    }

    #[tokio::test]
    async fn build_deduplicates_edges_reachable_via_both_directions() {
        let mut citations = HashMap::new();
        citations.insert("root".to_string(), vec![rel("A", "root")]);
        let mut references = HashMap::new();
        references.insert("root".to_string(), vec![rel("root", "A")]);
        let mut papers = HashMap::new();
        for id in ["root", "A"] {
            papers.insert(id.to_string(), paper(id));
        }
        let client: Arc<dyn MetadataClient> = Arc::new(FixtureClient {
            papers,
            citations,
            references,
            calls: StdMutex::new(Vec::new()),
        });
        let builder = GraphBuilder::new(client, &Config::default());
        let graph = builder.build("root", 2, Direction::Both, 50).await.unwrap();
        let count = graph
            .edges
            .iter()
            .filter(|e| *e == &("root".to_string(), "A".to_string()))
            .count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn unresolved_root_falls_back_to_a_placeholder() {
        let client: Arc<dyn MetadataClient> = Arc::new(FixtureClient {
            papers: HashMap::new(),
            citations: HashMap::new(),
            references: HashMap::new(),
            calls: StdMutex::new(Vec::new()),
        });
        let builder = GraphBuilder::new(client, &Config::default());
        let graph = builder.build("missing", 2, Direction::Both, 50).await.unwrap();
        assert_eq!(graph.papers["missing"].title, "Unknown");
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn build_from_papers_resolves_ids_in_input_order() {
        let mut papers = HashMap::new();
        papers.insert("raw-a".to_string(), {
            let mut p = paper("resolved-a");
            p.paper_id = "resolved-a".to_string();
            p
        });
        papers.insert("raw-b".to_string(), paper("raw-b"));
        let client: Arc<dyn MetadataClient> = Arc::new(FixtureClient {
            papers,
            citations: HashMap::new(),
            references: HashMap::new(),
            calls: StdMutex::new(Vec::new()),
        });
        let builder = GraphBuilder::new(client, &Config::default());
        let (graph, resolved) = builder
            .build_from_papers(&["raw-a".to_string(), "raw-b".to_string()], 50)
            .await
            .unwrap();
        assert_eq!(resolved, vec!["resolved-a".to_string(), "raw-b".to_string()]);
        assert!(graph.papers.contains_key("resolved-a"));
        assert!(graph.papers.contains_key("raw-b"));
    }

    proptest::proptest! {
        /// P1/P2/P3 (spec §8): every edge endpoint is a papers key, no
        /// duplicate edges, root always present — for any reference
        /// structure the fixture client happens to return.
        #[test]
        fn build_upholds_core_graph_invariants(
            edge_count in 0usize..12,
            node_count in 1usize..8,
            depth in 1u8..4,
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let node_ids: Vec<String> = (0..node_count).map(|i| format!("n{i}")).collect();
                let mut papers = HashMap::new();
                for id in &node_ids {
                    papers.insert(id.clone(), paper(id));
                }
                let mut references: HashMap<String, Vec<CitationRelationship>> = HashMap::new();
                for i in 0..edge_count {
                    let from = &node_ids[i % node_count];
                    let to = &node_ids[(i * 7 + 3) % node_count];
                    references.entry(from.clone()).or_default().push(rel(from, to));
                }
                let client: Arc<dyn MetadataClient> = Arc::new(FixtureClient {
                    papers,
                    citations: HashMap::new(),
                    references,
                    calls: StdMutex::new(Vec::new()),
                });
                let builder = GraphBuilder::new(client, &Config::default());
                let graph = builder.build(&node_ids[0], depth, Direction::References, 50).await.unwrap();

                // P1: every edge endpoint is a papers key.
                for (citing, cited) in &graph.edges {
                    prop_assert!(graph.papers.contains_key(citing));
                    prop_assert!(graph.papers.contains_key(cited));
                }
                // P2: no duplicate edges.
                let unique: HashSet<&(String, String)> = graph.edges.iter().collect();
                prop_assert_eq!(unique.len(), graph.edges.len());
                // P3: root always present.
                prop_assert!(graph.papers.contains_key(&graph.root_paper_id));
                Ok(())
            })?;
        }
    }
}
