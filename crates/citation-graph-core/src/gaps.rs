use std::collections::HashMap;

use serde::Serialize;

use crate::cluster::ClusteringResult;
use crate::model::CitationGraph;

/// Method-cluster detector terms (spec §6).
pub const METHOD_TERMS: &[&str] = &["algorithm", "model", "method", "approach", "network", "learning"];

const MAX_METHODOLOGICAL_GAPS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    Bridging,
    Temporal,
    Methodological,
    Unexplored,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchGap {
    pub gap_id: String,
    pub description: String,
    pub gap_type: GapType,
    pub evidence_papers: Vec<String>,
    pub related_clusters: Vec<usize>,
    pub confidence: f64,
    pub potential_topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GapAnalysisResult {
    pub gaps: Vec<ResearchGap>,
    pub analyzed_paper_count: usize,
    pub analysis_depth: u8,
}

/// Normalised symmetric pair `(min(a,b), max(a,b))`, used as a map key for
/// cross-cluster edge counts (spec §9: "from mapping-with-tuple-keys to
/// explicit pair normalisation").
fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Bridging, temporal, and methodological gap inference over a clustered
/// graph (spec §4.6).
pub struct GapAnalyser;

impl GapAnalyser {
    pub fn analyse(
        &self,
        graph: &CitationGraph,
        clustering: &ClusteringResult,
        analysis_depth: u8,
    ) -> GapAnalysisResult {
        let paper_to_cluster: HashMap<&str, usize> = clustering
            .clusters
            .iter()
            .flat_map(|c| c.papers.iter().map(move |p| (p.as_str(), c.cluster_id)))
            .collect();

        let mut cross_cluster_count: HashMap<(usize, usize), usize> = HashMap::new();
        for (citing, cited) in &graph.edges {
            let (Some(&ci), Some(&cj)) = (
                paper_to_cluster.get(citing.as_str()),
                paper_to_cluster.get(cited.as_str()),
            ) else {
                continue;
            };
            if ci == cj {
                continue;
            }
            *cross_cluster_count.entry(pair_key(ci, cj)).or_insert(0) += 1;
        }

        let mut gaps = Vec::new();
        gaps.extend(self.bridging_gaps(clustering, &cross_cluster_count));
        gaps.extend(self.temporal_gaps(graph, clustering));
        gaps.extend(self.methodological_gaps(clustering, &cross_cluster_count));

        GapAnalysisResult {
            analyzed_paper_count: graph.papers.len(),
            analysis_depth,
            gaps,
        }
    }

    fn bridging_gaps(
        &self,
        clustering: &ClusteringResult,
        cross_cluster_count: &HashMap<(usize, usize), usize>,
    ) -> Vec<ResearchGap> {
        let mut gaps = Vec::new();
        let eligible: Vec<_> = clustering.clusters.iter().filter(|c| c.papers.len() >= 3).collect();

        for (i, a) in eligible.iter().enumerate() {
            for b in eligible.iter().skip(i + 1) {
                let count = cross_cluster_count
                    .get(&pair_key(a.cluster_id, b.cluster_id))
                    .copied()
                    .unwrap_or(0);
                let denom = (a.papers.len() * b.papers.len()) as f64;
                let r = count as f64 / denom;
                if r < 0.05 {
                    let confidence = (1.0 - 10.0 * r).min(0.9);
                    gaps.push(ResearchGap {
                        gap_id: format!("bridging-{}-{}", a.cluster_id, b.cluster_id),
                        description: format!(
                            "Little work bridges '{}' and '{}'",
                            a.label, b.label
                        ),
                        gap_type: GapType::Bridging,
                        evidence_papers: vec![a.central_paper_id.clone(), b.central_paper_id.clone()],
                        related_clusters: vec![a.cluster_id, b.cluster_id],
                        confidence,
                        potential_topics: Vec::new(),
                    });
                }
            }
        }
        gaps
    }

    fn temporal_gaps(&self, graph: &CitationGraph, clustering: &ClusteringResult) -> Vec<ResearchGap> {
        let mut gaps = Vec::new();
        for cluster in &clustering.clusters {
            let mut by_year: HashMap<i32, usize> = HashMap::new();
            for p in &cluster.papers {
                if let Some(year) = graph.papers.get(p).and_then(|p| p.year) {
                    *by_year.entry(year).or_insert(0) += 1;
                }
            }
            if by_year.len() < 3 {
                continue;
            }
            let mut years: Vec<i32> = by_year.keys().copied().collect();
            years.sort();
            let early_count: usize = years.iter().take(2).map(|y| by_year[y]).sum();
            let recent_count: usize = years.iter().rev().take(2).map(|y| by_year[y]).sum();

            if early_count > 0 && (recent_count as f64 / early_count as f64) < 0.5 {
                gaps.push(ResearchGap {
                    gap_id: format!("temporal-{}", cluster.cluster_id),
                    description: format!(
                        "Research interest in '{}' has declined in recent years",
                        cluster.label
                    ),
                    gap_type: GapType::Temporal,
                    evidence_papers: vec![cluster.central_paper_id.clone()],
                    related_clusters: vec![cluster.cluster_id],
                    confidence: 0.6,
                    potential_topics: Vec::new(),
                });
            }
        }
        gaps
    }

    fn methodological_gaps(
        &self,
        clustering: &ClusteringResult,
        cross_cluster_count: &HashMap<(usize, usize), usize>,
    ) -> Vec<ResearchGap> {
        let method_terms: std::collections::HashSet<&str> = METHOD_TERMS.iter().copied().collect();
        let is_method_cluster = |key_terms: &[String]| {
            key_terms.iter().any(|t| method_terms.contains(t.as_str()))
        };

        let (method_clusters, domain_clusters): (Vec<_>, Vec<_>) = clustering
            .clusters
            .iter()
            .partition(|c| is_method_cluster(&c.key_terms));

        let mut gaps = Vec::new();
        'outer: for m in &method_clusters {
            for d in &domain_clusters {
                let count = cross_cluster_count
                    .get(&pair_key(m.cluster_id, d.cluster_id))
                    .copied()
                    .unwrap_or(0);
                if count < 2 {
                    gaps.push(ResearchGap {
                        gap_id: format!("methodological-{}-{}", m.cluster_id, d.cluster_id),
                        description: format!(
                            "Method '{}' is rarely applied to '{}'",
                            m.label, d.label
                        ),
                        gap_type: GapType::Methodological,
                        evidence_papers: vec![m.central_paper_id.clone(), d.central_paper_id.clone()],
                        related_clusters: vec![m.cluster_id, d.cluster_id],
                        confidence: 0.5,
                        potential_topics: Vec::new(),
                    });
                    if gaps.len() >= MAX_METHODOLOGICAL_GAPS {
                        break 'outer;
                    }
                }
            }
        }
        gaps
    }
}
