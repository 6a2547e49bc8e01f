use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::cluster::STOP_WORDS;
use crate::error::{Error, Result};
use crate::model::{CitationGraph, PaperInfo};

const MAX_SHARED: usize = 10;
const MAX_UNIQUE: usize = 5;
const MAX_THEMES: usize = 5;
const MAX_DISTINGUISHING: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct PaperComparison {
    pub papers: Vec<String>,
    pub publication_timeline: Vec<(String, Option<i32>)>,
    pub venue_comparison: Vec<(String, Option<String>)>,
    pub citation_counts: HashMap<String, u64>,
    pub shared_references: Vec<PaperInfo>,
    pub unique_references: HashMap<String, Vec<PaperInfo>>,
    pub shared_citers: Vec<PaperInfo>,
    pub citation_overlap_score: f64,
    pub common_themes: Vec<String>,
    pub distinguishing_aspects: HashMap<String, Vec<String>>,
}

/// Set-algebraic comparison of 2..5 papers over a graph built from exactly
/// those papers' direct neighbourhoods (spec §4.8).
pub struct ComparisonAnalyser;

impl ComparisonAnalyser {
    pub fn compare(&self, graph: &CitationGraph, paper_ids: &[String]) -> Result<PaperComparison> {
        if paper_ids.len() < 2 || paper_ids.len() > 5 {
            return Err(Error::InvalidArgument(format!(
                "compare requires 2..5 papers, got {}",
                paper_ids.len()
            )));
        }

        let cites = graph.adjacency_out();
        let cited_by = graph.adjacency_in();
        let empty = HashSet::new();

        let cites_of: HashMap<&String, &HashSet<String>> = paper_ids
            .iter()
            .map(|p| (p, cites.get(p).unwrap_or(&empty)))
            .collect();
        let cited_by_of: HashMap<&String, &HashSet<String>> = paper_ids
            .iter()
            .map(|p| (p, cited_by.get(p).unwrap_or(&empty)))
            .collect();

        let shared_references_ids = intersect_all(paper_ids.iter().map(|p| cites_of[p]));
        let shared_citers_ids = intersect_all(paper_ids.iter().map(|p| cited_by_of[p]));

        let union_cited_by: HashSet<String> = cited_by_of.values().flat_map(|s| s.iter().cloned()).collect();
        let citation_overlap_score = if union_cited_by.is_empty() {
            0.0
        } else {
            shared_citers_ids.len() as f64 / union_cited_by.len() as f64
        };

        let mut unique_references = HashMap::new();
        for p in paper_ids {
            let others_union: HashSet<String> = paper_ids
                .iter()
                .filter(|q| *q != p)
                .flat_map(|q| cites_of[q].iter().cloned())
                .collect();
            let mut unique: Vec<String> = cites_of[p].difference(&others_union).cloned().collect();
            unique.sort();
            unique.truncate(MAX_UNIQUE);
            unique_references.insert(
                p.clone(),
                unique.into_iter().filter_map(|id| graph.papers.get(&id).cloned()).collect(),
            );
        }

        let mut shared_references: Vec<String> = shared_references_ids.into_iter().collect();
        shared_references.sort();
        shared_references.truncate(MAX_SHARED);
        let shared_references: Vec<PaperInfo> = shared_references
            .into_iter()
            .filter_map(|id| graph.papers.get(&id).cloned())
            .collect();

        let mut shared_citers: Vec<String> = shared_citers_ids.into_iter().collect();
        shared_citers.sort();
        shared_citers.truncate(MAX_SHARED);
        let shared_citers: Vec<PaperInfo> = shared_citers
            .into_iter()
            .filter_map(|id| graph.papers.get(&id).cloned())
            .collect();

        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
        let tokens_of: HashMap<&String, HashSet<String>> = paper_ids
            .iter()
            .map(|p| {
                let title = graph.papers.get(p).map(|info| info.title.clone()).unwrap_or_default();
                (p, tokenize(&title, &stop_words))
            })
            .collect();

        let mut common_themes: Vec<String> = intersect_all(paper_ids.iter().map(|p| &tokens_of[p]))
            .into_iter()
            .collect();
        common_themes.sort();
        common_themes.truncate(MAX_THEMES);

        let mut word_paper_count: HashMap<&str, usize> = HashMap::new();
        for p in paper_ids {
            for w in &tokens_of[p] {
                *word_paper_count.entry(w.as_str()).or_insert(0) += 1;
            }
        }
        let mut distinguishing_aspects = HashMap::new();
        for p in paper_ids {
            let mut words: Vec<String> = tokens_of[p]
                .iter()
                .filter(|w| word_paper_count[w.as_str()] == 1)
                .cloned()
                .collect();
            words.sort();
            words.truncate(MAX_DISTINGUISHING);
            distinguishing_aspects.insert(p.clone(), words);
        }

        let citation_counts: HashMap<String, u64> = paper_ids
            .iter()
            .map(|p| {
                let count = graph.papers.get(p).and_then(|info| info.citation_count).unwrap_or(0);
                (p.clone(), count)
            })
            .collect();

        let publication_timeline: Vec<(String, Option<i32>)> = paper_ids
            .iter()
            .map(|p| (p.clone(), graph.papers.get(p).and_then(|info| info.year)))
            .collect();

        let venue_comparison: Vec<(String, Option<String>)> = paper_ids
            .iter()
            .map(|p| (p.clone(), graph.papers.get(p).and_then(|info| info.venue.clone())))
            .collect();

        Ok(PaperComparison {
            papers: paper_ids.to_vec(),
            publication_timeline,
            venue_comparison,
            citation_counts,
            shared_references,
            unique_references,
            shared_citers,
            citation_overlap_score,
            common_themes,
            distinguishing_aspects,
        })
    }
}

fn intersect_all<'a, I>(mut sets: I) -> HashSet<String>
where
    I: Iterator<Item = &'a HashSet<String>>,
{
    let Some(first) = sets.next() else {
        return HashSet::new();
    };
    let mut acc = first.clone();
    for s in sets {
        acc = acc.intersection(s).cloned().collect();
    }
    acc
}

fn tokenize(title: &str, stop_words: &HashSet<&str>) -> HashSet<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| w.len() >= 3 && !stop_words.contains(w))
        .map(|w| w.to_string())
        .collect()
}
