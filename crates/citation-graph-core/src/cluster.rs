use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::CitationGraph;

/// Fixed English stop-word set used by clustering and comparison (spec §6).
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "of", "in", "for", "on", "with", "to", "and", "is", "are", "by", "from",
    "using", "via", "based", "towards", "its", "as", "at", "be", "or", "this", "that",
];

const MAX_ITERATIONS: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct PaperCluster {
    pub cluster_id: usize,
    pub label: String,
    pub papers: Vec<String>,
    pub central_paper_id: String,
    pub cohesion_score: f64,
    pub key_terms: Vec<String>,
    pub year_range: (Option<i32>, Option<i32>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusteringResult {
    pub clusters: Vec<PaperCluster>,
    pub unclustered_papers: Vec<String>,
    pub total_papers: usize,
    pub method: &'static str,
}

/// Undirected label-propagation community detection (spec §4.5).
pub struct ClusterAnalyser {
    pub min_cluster_size: usize,
    pub max_iterations: usize,
}

impl Default for ClusterAnalyser {
    fn default() -> Self {
        Self {
            min_cluster_size: 3,
            max_iterations: MAX_ITERATIONS,
        }
    }
}

impl ClusterAnalyser {
    pub fn new(min_cluster_size: usize) -> Self {
        Self {
            min_cluster_size,
            max_iterations: MAX_ITERATIONS,
        }
    }

    pub fn cluster_papers(&self, graph: &CitationGraph) -> ClusteringResult {
        let all_ids: Vec<String> = graph.papers.keys().cloned().collect();

        if all_ids.len() < self.min_cluster_size {
            return ClusteringResult {
                clusters: Vec::new(),
                unclustered_papers: all_ids,
                total_papers: graph.papers.len(),
                method: "label_propagation",
            };
        }

        let adjacency = graph.adjacency_undirected();
        let labels = self.propagate_labels(&all_ids, &adjacency);

        let mut by_label: HashMap<usize, Vec<String>> = HashMap::new();
        for (idx, id) in all_ids.iter().enumerate() {
            by_label.entry(labels[idx]).or_default().push(id.clone());
        }

        let mut clusters = Vec::new();
        let mut unclustered = Vec::new();

        for (cluster_id, mut members) in by_label.into_iter() {
            members.sort();
            if members.len() < self.min_cluster_size {
                unclustered.extend(members);
                continue;
            }
            clusters.push(self.characterise(cluster_id, members, graph, &adjacency));
        }

        clusters.sort_by(|a, b| b.papers.len().cmp(&a.papers.len()).then_with(|| a.cluster_id.cmp(&b.cluster_id)));
        unclustered.sort();

        ClusteringResult {
            total_papers: graph.papers.len(),
            clusters,
            unclustered_papers: unclustered,
            method: "label_propagation",
        }
    }

    /// Runs propagation to a fixed point (or `max_iterations`), returning the
    /// final label for each id in `all_ids`, by index.
    fn propagate_labels(
        &self,
        all_ids: &[String],
        adjacency: &HashMap<String, HashSet<String>>,
    ) -> Vec<usize> {
        let index_of: HashMap<&str, usize> = all_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let mut labels: Vec<usize> = (0..all_ids.len()).collect();

        for _ in 0..self.max_iterations {
            let mut changed = false;
            for (i, id) in all_ids.iter().enumerate() {
                let Some(neighbours) = adjacency.get(id) else {
                    continue;
                };
                if neighbours.is_empty() {
                    continue;
                }
                let mut sorted_neighbours: Vec<&str> =
                    neighbours.iter().map(|s| s.as_str()).collect();
                sorted_neighbours.sort();

                let mut counts: HashMap<usize, usize> = HashMap::new();
                let mut first_seen: HashMap<usize, usize> = HashMap::new();
                for (order, n) in sorted_neighbours.iter().enumerate() {
                    let Some(&n_idx) = index_of.get(n) else {
                        continue;
                    };
                    let label = labels[n_idx];
                    *counts.entry(label).or_insert(0) += 1;
                    first_seen.entry(label).or_insert(order);
                }

                if let Some(&new_label) = counts
                    .iter()
                    .max_by(|(la, ca), (lb, cb)| {
                        ca.cmp(cb).then_with(|| {
                            first_seen[lb].cmp(&first_seen[la])
                        })
                    })
                    .map(|(l, _)| l)
                {
                    if new_label != labels[i] {
                        labels[i] = new_label;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        labels
    }

    fn characterise(
        &self,
        cluster_id: usize,
        members: Vec<String>,
        graph: &CitationGraph,
        adjacency: &HashMap<String, HashSet<String>>,
    ) -> PaperCluster {
        let member_set: HashSet<&str> = members.iter().map(|s| s.as_str()).collect();

        let mut internal_degree: HashMap<&str, usize> = HashMap::new();
        let mut internal_edges = 0usize;
        for m in &members {
            let deg = adjacency
                .get(m)
                .map(|ns| ns.iter().filter(|n| member_set.contains(n.as_str())).count())
                .unwrap_or(0);
            internal_degree.insert(m.as_str(), deg);
            internal_edges += deg;
        }
        internal_edges /= 2;

        let n = members.len();
        let max_possible = n * n.saturating_sub(1) / 2;
        let cohesion_score = if max_possible == 0 {
            0.0
        } else {
            (internal_edges as f64 / max_possible as f64).min(1.0)
        };

        let central_paper_id = members
            .iter()
            .max_by(|a, b| {
                internal_degree[a.as_str()]
                    .cmp(&internal_degree[b.as_str()])
                    .then_with(|| b.cmp(a))
            })
            .cloned()
            .unwrap_or_default();

        let key_terms = extract_key_terms(&members, graph);
        let label = infer_cluster_label(&key_terms);

        let years: Vec<i32> = members
            .iter()
            .filter_map(|m| graph.papers.get(m).and_then(|p| p.year))
            .collect();
        let year_range = (years.iter().min().copied(), years.iter().max().copied());

        PaperCluster {
            cluster_id,
            label,
            papers: members,
            central_paper_id,
            cohesion_score,
            key_terms,
            year_range,
        }
    }
}

/// Top-10 tokens from cluster titles: lowercased, `[a-zA-Z]{3,}` words, minus
/// the fixed stop-word set, counted across all papers in the cluster.
fn extract_key_terms(members: &[String], graph: &CitationGraph) -> Vec<String> {
    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut order = 0usize;

    for m in members {
        let Some(paper) = graph.papers.get(m) else {
            continue;
        };
        for word in tokenize_alpha(&paper.title.to_lowercase()) {
            if word.len() < 3 || stop_words.contains(word.as_str()) {
                continue;
            }
            *counts.entry(word.clone()).or_insert(0) += 1;
            first_seen.entry(word).or_insert_with(|| {
                order += 1;
                order
            });
        }
    }

    let mut terms: Vec<(String, usize)> = counts.into_iter().collect();
    terms.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| first_seen[&a.0].cmp(&first_seen[&b.0]))
    });
    terms.into_iter().take(10).map(|(w, _)| w).collect()
}

/// Splits on runs of ascii alphabetic characters, equivalent to the
/// upstream's `\b[a-zA-Z]{3,}\b` regex scan (the length filter is applied by
/// the caller).
fn tokenize_alpha(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn infer_cluster_label(key_terms: &[String]) -> String {
    if key_terms.is_empty() {
        return "Unlabeled Cluster".to_string();
    }
    key_terms
        .iter()
        .take(3)
        .map(|w| title_case(w))
        .collect::<Vec<_>>()
        .join(" / ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{clamp_depth, Direction, PaperInfo};
    use std::collections::BTreeMap;

    fn graph_of_disconnected(n: usize) -> CitationGraph {
        let mut papers = BTreeMap::new();
        for i in 0..n {
            let id = format!("P{i}");
            papers.insert(id.clone(), PaperInfo::placeholder(id, "t"));
        }
        CitationGraph::new("P0", papers, Vec::new(), clamp_depth(1), Direction::Both)
    }

    #[test]
    fn disconnected_papers_below_min_size_are_all_unclustered() {
        let graph = graph_of_disconnected(10);
        let result = ClusterAnalyser::new(3).cluster_papers(&graph);
        assert!(result.clusters.is_empty());
        assert_eq!(result.unclustered_papers.len(), 10);
    }

    #[test]
    fn cohesion_score_is_bounded() {
        let mut papers = BTreeMap::new();
        let ids = ["A", "B", "C", "D"];
        for id in ids {
            papers.insert(id.to_string(), PaperInfo::placeholder(id, "t"));
        }
        let edges: Vec<(String, String)> = vec![
            ("A".into(), "B".into()),
            ("B".into(), "C".into()),
            ("C".into(), "D".into()),
            ("D".into(), "A".into()),
        ];
        let graph = CitationGraph::new("A", papers, edges, clamp_depth(1), Direction::Both);
        let result = ClusterAnalyser::new(2).cluster_papers(&graph);
        for cluster in &result.clusters {
            assert!(cluster.cohesion_score >= 0.0 && cluster.cohesion_score <= 1.0);
        }
    }

    #[test]
    fn every_paper_appears_exactly_once() {
        let graph = graph_of_disconnected(6);
        let result = ClusterAnalyser::new(3).cluster_papers(&graph);
        let mut seen: HashSet<String> = HashSet::new();
        for cluster in &result.clusters {
            for p in &cluster.papers {
                assert!(seen.insert(p.clone()), "paper counted twice");
            }
        }
        for p in &result.unclustered_papers {
            assert!(seen.insert(p.clone()), "paper counted twice");
        }
        assert_eq!(seen.len(), graph.papers.len());
    }

    #[test]
    fn label_propagation_terminates_on_adversarial_complete_graph() {
        let n = 20;
        let mut papers = BTreeMap::new();
        let ids: Vec<String> = (0..n).map(|i| format!("P{i}")).collect();
        for id in &ids {
            papers.insert(id.clone(), PaperInfo::placeholder(id.clone(), "t"));
        }
        let mut edges = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    edges.push((ids[i].clone(), ids[j].clone()));
                }
            }
        }
        let graph = CitationGraph::new(ids[0].clone(), papers, edges, clamp_depth(1), Direction::Both);
        // Should not hang: propagate_labels bounds itself at max_iterations.
        let result = ClusterAnalyser::new(3).cluster_papers(&graph);
        assert_eq!(result.total_papers, n);
    }
}
