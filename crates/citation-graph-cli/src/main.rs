//! Thin demonstrator: build a graph, run one analysis, print JSON.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use citation_graph_core::{
    ClusterAnalyser, ComparisonAnalyser, Direction, GapAnalyser, MetadataClient,
    SearchFilters, SimilarityAnalyser, SimilarityMethod, SummaryGenerator,
};
use citation_graph_local::{citation_summary, Config, GraphBuilder, SemanticScholarClient};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "citation-graph")]
#[command(about = "Build and analyse scholarly citation graphs")]
#[command(long_about = "Traverses a scholarly citation network via a remote metadata \
service and runs local similarity, clustering, gap, summary, and comparison analyses \
over the resulting graph.")]
#[command(after_help = "Examples:
  citation-graph build 649def34f8be52c8b66281af98ae884c09aef38 --depth 2
  citation-graph similarity 649def34f8be52c8b66281af98ae884c09aef38 --method co_citation
  citation-graph cluster 649def34f8be52c8b66281af98ae884c09aef38
  citation-graph compare paper-a paper-b paper-c")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a citation graph rooted at a paper id and print it as JSON.
    Build {
        paper_id: String,
        #[arg(long, default_value_t = 2)]
        depth: u8,
        #[arg(long, default_value = "both")]
        direction: String,
        #[arg(long)]
        max_per_level: Option<usize>,
    },
    /// Build a graph and rank the most similar papers to the root.
    Similarity {
        paper_id: String,
        #[arg(long, default_value_t = 2)]
        depth: u8,
        #[arg(long, default_value = "bibliographic_coupling")]
        method: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },
    /// Build a graph and detect communities within it.
    Cluster {
        paper_id: String,
        #[arg(long, default_value_t = 2)]
        depth: u8,
        #[arg(long, default_value_t = 3)]
        min_cluster_size: usize,
    },
    /// Build a graph and infer research gaps over its clusters.
    Gaps {
        paper_id: String,
        #[arg(long, default_value_t = 2)]
        depth: u8,
    },
    /// Build a graph and summarise the research area around it.
    Summary {
        paper_id: String,
        #[arg(long, default_value_t = 2)]
        depth: u8,
        #[arg(long)]
        current_year: i32,
    },
    /// Compare 2-5 papers directly, without BFS expansion.
    Compare {
        #[arg(required = true, num_args = 2..=5)]
        paper_ids: Vec<String>,
    },
    /// Fetch a single paper's citation metrics without building a graph.
    Summarize { paper_id: String },
    /// Search for papers by free-text query.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        min_citations: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let client: Arc<dyn MetadataClient> =
        Arc::new(SemanticScholarClient::new(&config).context("constructing metadata client")?);
    let builder = GraphBuilder::new(Arc::clone(&client), &config);

    match cli.command {
        Commands::Build {
            paper_id,
            depth,
            direction,
            max_per_level,
        } => {
            let direction: Direction = direction.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            let max_per_level = max_per_level.unwrap_or(config.max_papers_per_level);
            let graph = builder.build(&paper_id, depth, direction, max_per_level).await?;
            print_json(&graph)
        }
        Commands::Similarity {
            paper_id,
            depth,
            method,
            top_k,
        } => {
            let method: SimilarityMethod = method.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            let graph = builder
                .build(&paper_id, depth, Direction::Both, config.max_papers_per_level)
                .await?;
            let analyser = SimilarityAnalyser::new(&graph);
            let results = analyser.compute_similarity(&graph, &graph.root_paper_id, method, top_k);
            print_json(&results)
        }
        Commands::Cluster {
            paper_id,
            depth,
            min_cluster_size,
        } => {
            let graph = builder
                .build(&paper_id, depth, Direction::Both, config.max_papers_per_level)
                .await?;
            let analyser = ClusterAnalyser::new(min_cluster_size);
            let clustering = analyser.cluster_papers(&graph);
            print_json(&clustering)
        }
        Commands::Gaps { paper_id, depth } => {
            let graph = builder
                .build(&paper_id, depth, Direction::Both, config.max_papers_per_level)
                .await?;
            let clustering = ClusterAnalyser::default().cluster_papers(&graph);
            let gaps = GapAnalyser.analyse(&graph, &clustering, depth);
            print_json(&gaps)
        }
        Commands::Summary {
            paper_id,
            depth,
            current_year,
        } => {
            let graph = builder
                .build(&paper_id, depth, Direction::Both, config.max_papers_per_level)
                .await?;
            let clustering = ClusterAnalyser::default().cluster_papers(&graph);
            let summary = SummaryGenerator.generate_summary(&graph, &clustering, current_year);
            print_json(&summary)
        }
        Commands::Compare { paper_ids } => {
            if paper_ids.len() < 2 || paper_ids.len() > 5 {
                bail!("compare requires 2..5 papers, got {}", paper_ids.len());
            }
            let (graph, resolved_ids) = builder.build_from_papers(&paper_ids, 50).await?;
            let comparison = ComparisonAnalyser.compare(&graph, &resolved_ids)?;
            print_json(&comparison)
        }
        Commands::Summarize { paper_id } => {
            let summary = citation_summary(client.as_ref(), &paper_id).await?;
            match summary {
                Some(s) => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "paper_id": s.paper_id,
                            "title": s.title,
                            "citation_count": s.citation_count,
                            "reference_count": s.reference_count,
                            "influential_citation_count": s.influential_citation_count,
                        })
                    );
                    Ok(())
                }
                None => bail!("paper not found: {paper_id}"),
            }
        }
        Commands::Search {
            query,
            limit,
            min_citations,
        } => {
            let filters = SearchFilters {
                min_citations,
                ..Default::default()
            };
            let page = client.search(&query, limit, filters).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&page.papers).context("serialising search results")?
            );
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serialising result")?);
    Ok(())
}
