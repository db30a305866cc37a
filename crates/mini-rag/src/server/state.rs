//! Application state for the RAG server

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::{Credentials, RagConfig};
use crate::error::Result;
use crate::pipeline::RagPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Pipeline with its injected collaborators
    pipeline: RagPipeline,
    /// Set once warm-up has succeeded
    warmed: OnceCell<()>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create state with the collaborators for the configured backend
    pub fn new(config: RagConfig, credentials: &Credentials) -> Result<Self> {
        tracing::info!("Initializing RAG application state (backend: {})...", config.backend);
        let pipeline = RagPipeline::from_config(&config, credentials)?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create state around an already-built pipeline
    pub fn with_pipeline(config: RagConfig, pipeline: RagPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                warmed: OnceCell::new(),
                ready: RwLock::new(false),
            }),
        }
    }

    /// Warm up the providers exactly once
    ///
    /// Concurrent callers wait on the same attempt. A failed attempt leaves
    /// the cell empty so the next caller retries.
    pub async fn ensure_warm(&self) -> Result<()> {
        self.inner
            .warmed
            .get_or_try_init(|| self.inner.pipeline.warm_up())
            .await?;
        self.set_ready(true);
        Ok(())
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the pipeline
    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::pipeline::Stages;
    use crate::providers::EmbeddingProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingEmbedder {
        warm_ups: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        fn dimensions(&self) -> usize {
            1
        }

        async fn warm_up(&self) -> Result<()> {
            let attempt = self.warm_ups.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && attempt == 0 {
                return Err(Error::embedding("model still loading"));
            }
            Ok(())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn state_with(embedder: Arc<CountingEmbedder>) -> AppState {
        let config = RagConfig::default();
        let stages = Stages {
            embedder,
            ..Stages::local(&config)
        };
        let pipeline = RagPipeline::new(&config, stages);
        AppState::with_pipeline(config, pipeline)
    }

    #[tokio::test]
    async fn test_concurrent_warm_up_runs_once() {
        let embedder = Arc::new(CountingEmbedder {
            warm_ups: AtomicUsize::new(0),
            fail_first: false,
        });
        let state = state_with(embedder.clone());
        assert!(!state.is_ready());

        let (a, b, c) = tokio::join!(state.ensure_warm(), state.ensure_warm(), state.ensure_warm());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(embedder.warm_ups.load(Ordering::SeqCst), 1);
        assert!(state.is_ready());
    }

    #[tokio::test]
    async fn test_failed_warm_up_is_retried() {
        let embedder = Arc::new(CountingEmbedder {
            warm_ups: AtomicUsize::new(0),
            fail_first: true,
        });
        let state = state_with(embedder.clone());

        assert!(state.ensure_warm().await.is_err());
        assert!(!state.is_ready());
        state.ensure_warm().await.unwrap();
        assert_eq!(embedder.warm_ups.load(Ordering::SeqCst), 2);
        assert!(state.is_ready());
    }
}
