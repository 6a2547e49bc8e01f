use std::collections::HashMap;

use serde::Serialize;

use crate::cluster::ClusteringResult;
use crate::model::CitationGraph;

/// Methodology-trend keywords (spec §6).
pub const METHODOLOGY_KEYWORDS: &[&str] = &[
    "neural",
    "deep learning",
    "transformer",
    "attention",
    "cnn",
    "rnn",
    "bert",
    "gpt",
    "llm",
    "reinforcement",
    "supervised",
    "unsupervised",
    "graph neural",
    "diffusion",
    "generative",
    "contrastive",
];

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub year: i32,
    pub paper_count: usize,
    pub key_paper: Option<String>,
    pub key_paper_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchAreaSummary {
    pub root: String,
    pub area_name: String,
    pub total_papers: usize,
    pub year_range: (Option<i32>, Option<i32>),
    pub foundational_papers: Vec<String>,
    pub recent_influential: Vec<String>,
    pub bridging_papers: Vec<String>,
    pub major_themes: Vec<String>,
    pub methodology_trends: Vec<(String, usize)>,
    pub timeline: Vec<TimelineEntry>,
    pub sub_areas: Vec<String>,
}

/// Foundational / recent-influential / bridging extraction plus timeline and
/// theme synthesis (spec §4.7).
pub struct SummaryGenerator;

impl SummaryGenerator {
    /// `current_year` is supplied by the caller rather than read from the
    /// clock so that the generator stays pure and its output reproducible in
    /// tests.
    pub fn generate_summary(
        &self,
        graph: &CitationGraph,
        clustering: &ClusteringResult,
        current_year: i32,
    ) -> ResearchAreaSummary {
        let in_degree = graph.adjacency_in();

        let mut foundational: Vec<(&String, usize)> = graph
            .papers
            .keys()
            .filter_map(|id| {
                let degree = in_degree.get(id).map(|s| s.len()).unwrap_or(0);
                (degree >= 1).then_some((id, degree))
            })
            .collect();
        foundational.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let foundational_papers: Vec<String> = foundational
            .into_iter()
            .take(5)
            .map(|(id, _)| id.clone())
            .collect();

        let mut recent: Vec<(&String, f64)> = graph
            .papers
            .iter()
            .filter_map(|(id, p)| {
                let year = p.year?;
                if year < current_year - 3 {
                    return None;
                }
                let citations = p.citation_count.unwrap_or(0) as f64;
                let age = (current_year - year + 1).max(1) as f64;
                Some((id, citations / age))
            })
            .collect();
        recent.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(b.0)));
        let recent_influential: Vec<String> = recent.into_iter().take(5).map(|(id, _)| id.clone()).collect();

        let bridging_papers = Self::bridging_papers(graph, clustering);

        let timeline = Self::timeline(graph);

        let major_themes: Vec<String> = clustering
            .clusters
            .iter()
            .take(5)
            .map(|c| c.label.clone())
            .collect();

        let methodology_trends = Self::methodology_trends(graph);

        let years: Vec<i32> = graph.papers.values().filter_map(|p| p.year).collect();
        let year_range = (years.iter().min().copied(), years.iter().max().copied());

        let area_name = graph
            .papers
            .get(&graph.root_paper_id)
            .map(|p| truncate_title(&p.title))
            .unwrap_or_default();

        ResearchAreaSummary {
            root: graph.root_paper_id.clone(),
            area_name,
            total_papers: graph.papers.len(),
            year_range,
            foundational_papers,
            recent_influential,
            bridging_papers,
            major_themes,
            methodology_trends,
            timeline,
            sub_areas: Vec::new(),
        }
    }

    fn bridging_papers(graph: &CitationGraph, clustering: &ClusteringResult) -> Vec<String> {
        let paper_to_cluster: HashMap<&str, usize> = clustering
            .clusters
            .iter()
            .flat_map(|c| c.papers.iter().map(move |p| (p.as_str(), c.cluster_id)))
            .collect();

        let adjacency_out = graph.adjacency_out();
        let mut distinct_clusters: Vec<(&String, usize)> = graph
            .papers
            .keys()
            .map(|id| {
                let count = adjacency_out
                    .get(id)
                    .map(|targets| {
                        targets
                            .iter()
                            .filter_map(|t| paper_to_cluster.get(t.as_str()))
                            .collect::<std::collections::HashSet<_>>()
                            .len()
                    })
                    .unwrap_or(0);
                (id, count)
            })
            .filter(|(_, count)| *count >= 2)
            .collect();

        distinct_clusters.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        distinct_clusters.into_iter().take(5).map(|(id, _)| id.clone()).collect()
    }

    fn timeline(graph: &CitationGraph) -> Vec<TimelineEntry> {
        let mut by_year: HashMap<i32, Vec<&String>> = HashMap::new();
        for (id, paper) in &graph.papers {
            if let Some(year) = paper.year {
                by_year.entry(year).or_default().push(id);
            }
        }
        let mut years: Vec<i32> = by_year.keys().copied().collect();
        years.sort();

        years
            .into_iter()
            .map(|year| {
                let ids = &by_year[&year];
                let key = ids
                    .iter()
                    .max_by(|a, b| {
                        let ca = graph.papers[a.as_str()].citation_count.unwrap_or(0);
                        let cb = graph.papers[b.as_str()].citation_count.unwrap_or(0);
                        ca.cmp(&cb).then_with(|| b.cmp(a))
                    })
                    .copied();
                TimelineEntry {
                    year,
                    paper_count: ids.len(),
                    key_paper: key.map(|id| graph.papers[id.as_str()].title.clone()),
                    key_paper_id: key.cloned(),
                }
            })
            .collect()
    }

    fn methodology_trends(graph: &CitationGraph) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = METHODOLOGY_KEYWORDS.iter().map(|k| (*k, 0)).collect();
        for paper in graph.papers.values() {
            let mut haystack = paper.title.to_lowercase();
            if let Some(abs) = &paper.abstract_text {
                haystack.push(' ');
                haystack.push_str(&abs.to_lowercase());
            }
            for keyword in METHODOLOGY_KEYWORDS {
                let occurrences = haystack.matches(keyword).count();
                if occurrences > 0 {
                    *counts.get_mut(keyword).unwrap() += occurrences;
                }
            }
        }
        let mut trends: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|(_, c)| *c > 0)
            .map(|(k, c)| (k.to_string(), c))
            .collect();
        trends.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        trends.truncate(5);
        trends
    }
}

fn truncate_title(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }
    let truncated: String = title.chars().take(50).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{clamp_depth, Direction, PaperInfo};
    use std::collections::BTreeMap;

    fn paper(id: &str, year: Option<i32>, citations: Option<u64>) -> PaperInfo {
        let mut p = PaperInfo::placeholder(id, format!("Title {id}"));
        p.year = year;
        p.citation_count = citations;
        p
    }

    #[test]
    fn foundational_papers_rank_by_in_degree() {
        let mut papers = BTreeMap::new();
        for id in ["A", "B", "C"] {
            papers.insert(id.to_string(), paper(id, Some(2020), Some(0)));
        }
        let edges = vec![("B".to_string(), "A".to_string()), ("C".to_string(), "A".to_string())];
        let graph = CitationGraph::new("A", papers, edges, clamp_depth(1), Direction::Both);
        let clustering = ClusteringResult {
            clusters: Vec::new(),
            unclustered_papers: Vec::new(),
            total_papers: 3,
            method: "label_propagation",
        };
        let summary = SummaryGenerator.generate_summary(&graph, &clustering, 2024);
        assert_eq!(summary.foundational_papers.first(), Some(&"A".to_string()));
    }

    #[test]
    fn foundational_papers_excludes_uncited_papers() {
        let mut papers = BTreeMap::new();
        for id in ["A", "B", "C"] {
            papers.insert(id.to_string(), paper(id, Some(2020), Some(0)));
        }
        // Only A is ever cited; B and C have in-degree 0 and must not appear.
        let edges = vec![("B".to_string(), "A".to_string())];
        let graph = CitationGraph::new("A", papers, edges, clamp_depth(1), Direction::Both);
        let clustering = ClusteringResult {
            clusters: Vec::new(),
            unclustered_papers: Vec::new(),
            total_papers: 3,
            method: "label_propagation",
        };
        let summary = SummaryGenerator.generate_summary(&graph, &clustering, 2024);
        assert_eq!(summary.foundational_papers, vec!["A".to_string()]);
    }

    #[test]
    fn area_name_truncates_long_titles() {
        let mut papers = BTreeMap::new();
        let long_title = "x".repeat(80);
        let mut root = PaperInfo::placeholder("root", long_title);
        root.year = Some(2020);
        papers.insert("root".to_string(), root);
        let graph = CitationGraph::new("root", papers, Vec::new(), clamp_depth(1), Direction::Both);
        let clustering = ClusteringResult {
            clusters: Vec::new(),
            unclustered_papers: Vec::new(),
            total_papers: 1,
            method: "label_propagation",
        };
        let summary = SummaryGenerator.generate_summary(&graph, &clustering, 2024);
        assert!(summary.area_name.ends_with("..."));
        assert_eq!(summary.area_name.len(), 53);
    }

    #[test]
    fn methodology_trends_counts_fixed_keywords() {
        let mut papers = BTreeMap::new();
        let mut p = paper("A", Some(2023), Some(10));
        p.title = "A Transformer Model with Attention".to_string();
        papers.insert("A".to_string(), p);
        let graph = CitationGraph::new("A", papers, Vec::new(), clamp_depth(1), Direction::Both);
        let clustering = ClusteringResult {
            clusters: Vec::new(),
            unclustered_papers: Vec::new(),
            total_papers: 1,
            method: "label_propagation",
        };
        let summary = SummaryGenerator.generate_summary(&graph, &clustering, 2024);
        let keywords: Vec<&str> = summary.methodology_trends.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keywords.contains(&"transformer"));
        assert!(keywords.contains(&"attention"));
    }
}
