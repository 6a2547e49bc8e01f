pub mod cluster;
pub mod compare;
pub mod error;
pub mod gaps;
pub mod identifier;
pub mod model;
pub mod similarity;
pub mod summary;
pub mod traits;

pub use cluster::{ClusterAnalyser, ClusteringResult, PaperCluster};
pub use compare::{ComparisonAnalyser, PaperComparison};
pub use error::{Error, Result};
pub use gaps::{GapAnalyser, GapAnalysisResult, GapType, ResearchGap};
pub use identifier::normalise_paper_id;
pub use model::{
    clamp_depth, CitationContext, CitationGraph, CitationIntent, CitationRelationship, Direction,
    PaperInfo,
};
pub use similarity::{PaperSimilarity, SimilarityAnalyser, SimilarityMethod};
pub use summary::{ResearchAreaSummary, SummaryGenerator, TimelineEntry};
pub use traits::{MetadataClient, SearchFilters, SearchPage};
