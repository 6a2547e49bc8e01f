use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::CitationGraph;

/// The three Jaccard-based similarity variants (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    BibliographicCoupling,
    CoCitation,
    CitationOverlap,
}

impl std::str::FromStr for SimilarityMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bibliographic_coupling" => Ok(SimilarityMethod::BibliographicCoupling),
            "co_citation" => Ok(SimilarityMethod::CoCitation),
            "citation_overlap" => Ok(SimilarityMethod::CitationOverlap),
            other => Err(Error::InvalidArgument(format!(
                "unknown similarity method: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaperSimilarity {
    pub paper_a: String,
    pub paper_b: String,
    pub score: f64,
    pub method: SimilarityMethod,
    pub shared_refs: Vec<String>,
    pub shared_citers: Vec<String>,
    pub explanation: String,
}

/// Computes Jaccard-based similarity of papers against a source paper in a
/// built graph (spec §4.4). Pure and synchronous; builds `cites`/`cited_by`
/// once per analyser instance.
pub struct SimilarityAnalyser {
    cites: HashMap<String, HashSet<String>>,
    cited_by: HashMap<String, HashSet<String>>,
}

impl SimilarityAnalyser {
    pub fn new(graph: &CitationGraph) -> Self {
        Self {
            cites: graph.adjacency_out(),
            cited_by: graph.adjacency_in(),
        }
    }

    fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
        if a.is_empty() && b.is_empty() {
            return 0.0;
        }
        let intersection = a.intersection(b).count();
        let union = a.union(b).count();
        if union == 0 {
            0.0
        } else {
            intersection as f64 / union as f64
        }
    }

    fn explain(score: f64) -> String {
        if score > 0.5 {
            "strong".to_string()
        } else if score > 0.2 {
            "moderate".to_string()
        } else {
            "weak".to_string()
        }
    }

    /// Top-`top_k` similarities of `source` against every other paper in the
    /// graph, descending by score, score strictly greater than zero.
    pub fn compute_similarity(
        &self,
        graph: &CitationGraph,
        source: &str,
        method: SimilarityMethod,
        top_k: usize,
    ) -> Vec<PaperSimilarity> {
        let empty = HashSet::new();
        let source_cites = self.cites.get(source).unwrap_or(&empty);
        let source_cited_by = self.cited_by.get(source).unwrap_or(&empty);

        let mut results: Vec<PaperSimilarity> = graph
            .papers
            .keys()
            .filter(|id| id.as_str() != source)
            .filter_map(|other| {
                let other_cites = self.cites.get(other).unwrap_or(&empty);
                let other_cited_by = self.cited_by.get(other).unwrap_or(&empty);

                let j_refs = Self::jaccard(source_cites, other_cites);
                let j_citers = Self::jaccard(source_cited_by, other_cited_by);

                let score = match method {
                    SimilarityMethod::BibliographicCoupling => j_refs,
                    SimilarityMethod::CoCitation => j_citers,
                    SimilarityMethod::CitationOverlap => 0.4 * j_refs + 0.6 * j_citers,
                };

                if score <= 0.0 {
                    return None;
                }

                let mut shared_refs: Vec<String> =
                    source_cites.intersection(other_cites).cloned().collect();
                shared_refs.sort();
                let mut shared_citers: Vec<String> = source_cited_by
                    .intersection(other_cited_by)
                    .cloned()
                    .collect();
                shared_citers.sort();

                Some(PaperSimilarity {
                    paper_a: source.to_string(),
                    paper_b: other.clone(),
                    score,
                    method,
                    shared_refs,
                    shared_citers,
                    explanation: Self::explain(score),
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.paper_b.cmp(&b.paper_b))
        });
        results.truncate(top_k);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{clamp_depth, Direction, PaperInfo};
    use std::collections::BTreeMap;

    fn graph_with_edges(edges: Vec<(&str, &str)>) -> CitationGraph {
        let mut papers = BTreeMap::new();
        for (a, b) in &edges {
            papers
                .entry(a.to_string())
                .or_insert_with(|| PaperInfo::placeholder(a.to_string(), "t"));
            papers
                .entry(b.to_string())
                .or_insert_with(|| PaperInfo::placeholder(b.to_string(), "t"));
        }
        let edges = edges
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        CitationGraph::new("A", papers, edges, clamp_depth(1), Direction::Both)
    }

    #[test]
    fn bibliographic_coupling_matches_seed_scenario() {
        // edges: (A,X) (A,Y) (B,X) (B,Y) (B,Z) -> sim(A,B) = |{X,Y}| / |{X,Y,Z}| = 2/3
        let graph = graph_with_edges(vec![("A", "X"), ("A", "Y"), ("B", "X"), ("B", "Y"), ("B", "Z")]);
        let analyser = SimilarityAnalyser::new(&graph);
        let sims = analyser.compute_similarity(
            &graph,
            "A",
            SimilarityMethod::BibliographicCoupling,
            10,
        );
        let ab = sims.iter().find(|s| s.paper_b == "B").unwrap();
        assert!((ab.score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn symmetry_holds_for_all_three_methods() {
        let graph = graph_with_edges(vec![("A", "X"), ("A", "Y"), ("B", "X"), ("B", "Y"), ("B", "Z")]);
        let analyser = SimilarityAnalyser::new(&graph);
        for method in [
            SimilarityMethod::BibliographicCoupling,
            SimilarityMethod::CoCitation,
            SimilarityMethod::CitationOverlap,
        ] {
            let a_to_b = analyser
                .compute_similarity(&graph, "A", method, 10)
                .into_iter()
                .find(|s| s.paper_b == "B")
                .map(|s| s.score);
            let b_to_a = analyser
                .compute_similarity(&graph, "B", method, 10)
                .into_iter()
                .find(|s| s.paper_b == "A")
                .map(|s| s.score);
            assert_eq!(a_to_b, b_to_a);
        }
    }

    #[test]
    fn results_are_capped_at_top_k_and_sorted_descending() {
        let graph = graph_with_edges(vec![
            ("A", "X"),
            ("B", "X"),
            ("C", "X"),
            ("D", "X"),
        ]);
        let analyser = SimilarityAnalyser::new(&graph);
        let sims = analyser.compute_similarity(&graph, "A", SimilarityMethod::BibliographicCoupling, 2);
        assert!(sims.len() <= 2);
        for pair in sims.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn unknown_method_string_is_rejected() {
        let err = "made_up_method".parse::<SimilarityMethod>().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
