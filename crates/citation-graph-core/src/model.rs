use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::SystemTime;

/// Identity and metadata of a single paper (spec §3).
///
/// Immutable after construction; equality and hashing are by `paper_id` only —
/// two `PaperInfo` values with the same id are the same node even if fetched at
/// different times with slightly different metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperInfo {
    pub paper_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub arxiv_id: Option<String>,
    pub doi: Option<String>,
    pub s2_paper_id: Option<String>,
    pub citation_count: Option<u64>,
    pub reference_count: Option<u64>,
    pub influential_citation_count: Option<u64>,
    pub fetched_at: SystemTime,
}

impl PaperInfo {
    /// A placeholder used when the upstream service has no record of `paper_id`
    /// but a graph invariant still requires the id to resolve to a paper.
    pub fn placeholder(paper_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            title: title.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            abstract_text: None,
            arxiv_id: None,
            doi: None,
            s2_paper_id: None,
            citation_count: None,
            reference_count: None,
            influential_citation_count: None,
            fetched_at: SystemTime::now(),
        }
    }
}

impl PartialEq for PaperInfo {
    fn eq(&self, other: &Self) -> bool {
        self.paper_id == other.paper_id
    }
}
impl Eq for PaperInfo {}

impl std::hash::Hash for PaperInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.paper_id.hash(state)
    }
}

/// Why a citation was made, as tagged by the upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationIntent {
    Background,
    Method,
    Result,
    Unknown,
}

impl CitationIntent {
    /// Maps upstream intent strings per spec §4.2: `background` -> background,
    /// `methodology`|`method` -> method, `result` -> result, else -> unknown.
    pub fn from_upstream(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "background" => CitationIntent::Background,
            "methodology" | "method" => CitationIntent::Method,
            "result" => CitationIntent::Result,
            _ => CitationIntent::Unknown,
        }
    }
}

/// One mention of a citation inside the citing paper's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationContext {
    pub text: String,
    pub intent: CitationIntent,
    pub section: Option<String>,
    pub is_influential: bool,
}

/// A single `citing -> cited` arc, with the text evidence for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationRelationship {
    pub citing_paper: PaperInfo,
    pub cited_paper: PaperInfo,
    pub contexts: Vec<CitationContext>,
    pub is_influential: bool,
}

/// Which arcs are followed outward from a pivot paper during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Citations,
    References,
    Both,
}

impl std::str::FromStr for Direction {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citations" => Ok(Direction::Citations),
            "references" => Ok(Direction::References),
            "both" => Ok(Direction::Both),
            other => Err(crate::Error::InvalidArgument(format!(
                "unknown direction: {other}"
            ))),
        }
    }
}

/// Symmetric, undirected adjacency used by the cluster analyser.
pub type UndirectedAdjacency = HashMap<String, HashSet<String>>;

/// The central value of the engine: an immutable graph of papers and the
/// citation arcs discovered between them (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationGraph {
    pub root_paper_id: String,
    pub papers: BTreeMap<String, PaperInfo>,
    /// `(citing_id, cited_id)` pairs. No duplicates; every id appears in `papers`.
    pub edges: Vec<(String, String)>,
    pub depth: u8,
    pub direction: Direction,
    pub created_at: SystemTime,
}

impl CitationGraph {
    /// Builds a graph value. Callers (Graph Builder) are responsible for
    /// upholding the invariants documented on the type (every edge endpoint is
    /// a key of `papers`, no duplicate edges, root present) — this constructor
    /// does not re-validate them on every call since it sits on the hot path
    /// of graph assembly.
    pub fn new(
        root_paper_id: impl Into<String>,
        papers: BTreeMap<String, PaperInfo>,
        edges: Vec<(String, String)>,
        depth: u8,
        direction: Direction,
    ) -> Self {
        Self {
            root_paper_id: root_paper_id.into(),
            papers,
            edges,
            depth,
            direction,
            created_at: SystemTime::now(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.papers.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// `cites[p] = { q : (p, q) in edges }`.
    pub fn adjacency_out(&self) -> HashMap<String, HashSet<String>> {
        let mut out: HashMap<String, HashSet<String>> = HashMap::new();
        for (citing, cited) in &self.edges {
            out.entry(citing.clone()).or_default().insert(cited.clone());
        }
        out
    }

    /// `cited_by[p] = { q : (q, p) in edges }`.
    pub fn adjacency_in(&self) -> HashMap<String, HashSet<String>> {
        let mut in_: HashMap<String, HashSet<String>> = HashMap::new();
        for (citing, cited) in &self.edges {
            in_.entry(cited.clone()).or_default().insert(citing.clone());
        }
        in_
    }

    /// `(a, b)` treated as both `a ~ b` and `b ~ a` — used by clustering.
    pub fn adjacency_undirected(&self) -> UndirectedAdjacency {
        let mut adj: UndirectedAdjacency = HashMap::new();
        for (a, b) in &self.edges {
            if a == b {
                continue;
            }
            adj.entry(a.clone()).or_default().insert(b.clone());
            adj.entry(b.clone()).or_default().insert(a.clone());
        }
        adj
    }
}

/// Clamps a requested depth into the supported range (spec §4.3 step 1).
pub fn clamp_depth(depth: u8) -> u8 {
    depth.clamp(1, 3)
}
