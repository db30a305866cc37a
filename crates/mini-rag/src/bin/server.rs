//! RAG Server binary
//!
//! Run with: cargo run -p mini-rag --bin mini-rag-server -- --backend local

use clap::Parser;
use mini_rag::{
    config::{BackendProvider, Credentials, RagConfig},
    server::RagServer,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mini-rag-server", version, about = "Question answering over pasted text")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = "MINI_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Provider set: local or hosted
    #[arg(short, long)]
    backend: Option<BackendProvider>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }

    let credentials = Credentials::from_env();
    config.validate(&credentials)?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {}", config.backend);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!(
        "  - Retrieval: top_k {}, threshold {}, top_n {}",
        config.retrieval.top_k,
        config.retrieval.similarity_threshold,
        config.retrieval.top_n
    );
    if config.backend == BackendProvider::Hosted {
        tracing::info!("  - Embedding model: {}", config.embeddings.model);
        tracing::info!("  - Rerank model: {}", config.reranker.model);
        tracing::info!("  - LLM model: {}", config.llm.model);
    }

    let server = RagServer::new(config, &credentials)?;

    println!("\nServer starting...");
    println!("  UI: http://{}/", server.address());
    println!("  API: POST http://{}/api/rag", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
