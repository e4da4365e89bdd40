use parking_lot::RwLock;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::task::JoinHandle;

use docqa_core::chunker::chunk;
use docqa_core::config::Settings;
use docqa_core::document::extract_text;
use docqa_core::error::{Error, Result};
use docqa_core::traits::{DocumentSource, Generator};
use docqa_text::{IndexSnapshot, Retriever};

use crate::aggregator::{AskOutcome, QueryAggregator, QueryConfig};
use crate::notify::Notifier;

/// One document, one generator, one question at a time.
///
/// Indexing runs extraction, chunking and index building on a blocking
/// thread and swaps the result in whole; a failed indexing leaves the
/// previous document in place. Asking takes a snapshot of the index at the
/// moment the question starts.
pub struct Session {
    retriever: Arc<Retriever>,
    generator: RwLock<Option<Arc<dyn Generator>>>,
    aggregator: QueryAggregator,
    notifier: Notifier,
    chunk_size: NonZeroUsize,
}

impl Session {
    pub fn new(settings: &Settings, notifier: Notifier) -> Result<Self> {
        settings.validate()?;
        let chunk_size = settings.chunking.chunk_size()?;
        Ok(Self::with_config(chunk_size, QueryConfig::from(&settings.query), notifier))
    }

    pub fn with_config(chunk_size: NonZeroUsize, query: QueryConfig, notifier: Notifier) -> Self {
        Self {
            retriever: Arc::new(Retriever::new()),
            generator: RwLock::new(None),
            aggregator: QueryAggregator::new(query, notifier.clone()),
            notifier,
            chunk_size,
        }
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    pub fn aggregator(&self) -> &QueryAggregator {
        &self.aggregator
    }

    pub fn has_generator(&self) -> bool {
        self.generator.read().is_some()
    }

    pub fn set_generator(&self, generator: Arc<dyn Generator>) {
        *self.generator.write() = Some(generator);
    }

    /// Await a generator and install it. `ModelLoading` brackets the wait.
    pub async fn load_generator<F>(&self, loading: F) -> Result<()>
    where
        F: Future<Output = Result<Arc<dyn Generator>>>,
    {
        self.notifier.model_loading(true);
        let result = match loading.await {
            Ok(generator) => {
                self.notifier.log(format!("model loaded: {}", generator.name()));
                self.set_generator(generator);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "model loading failed");
                self.notifier.log(format!("model loading failed: {}", e));
                Err(e)
            }
        };
        self.notifier.model_loading(false);
        result
    }

    /// Extract, chunk and index `source`, replacing the current document.
    /// Returns the number of chunks. Cancels a question still running against
    /// the old document.
    pub async fn index_document(&self, source: Box<dyn DocumentSource>) -> Result<usize> {
        self.notifier.indexing(true);
        let describe = source.describe();
        let chunk_size = self.chunk_size;

        let built = tokio::task::spawn_blocking(move || -> Result<IndexSnapshot> {
            let text = extract_text(source.as_ref())?;
            Ok(IndexSnapshot::build(chunk(&text, chunk_size)))
        })
        .await
        .map_err(|e| Error::Operation(format!("indexing task failed: {}", e)))
        .and_then(|r| r);

        let result = match built {
            Ok(snapshot) => {
                let count = self.aggregator.cancel_with(|| self.retriever.install(snapshot));
                self.notifier.log(format!("indexed {} chunks from {}", count, describe));
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(source = %describe, error = %e, "indexing failed");
                self.notifier.log(format!("extraction failed: {}", e));
                Err(e)
            }
        };
        self.notifier.indexing(false);
        result
    }

    /// Answer `question` from the current document. Starting a question makes
    /// any earlier one stale.
    pub async fn ask(&self, question: &str) -> AskOutcome {
        let generator = self.generator.read().clone();
        self.aggregator.ask_with(question, || self.retriever.snapshot(), generator).await
    }

    pub fn cancel(&self) {
        self.aggregator.cancel();
    }

    pub fn spawn_index(self: &Arc<Self>, source: Box<dyn DocumentSource>) -> JoinHandle<Result<usize>> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.index_document(source).await })
    }

    pub fn spawn_ask(self: &Arc<Self>, question: impl Into<String>) -> JoinHandle<AskOutcome> {
        let session = Arc::clone(self);
        let question = question.into();
        tokio::spawn(async move { session.ask(&question).await })
    }

    pub fn spawn_load_generator<F>(self: &Arc<Self>, loading: F) -> JoinHandle<Result<()>>
    where
        F: Future<Output = Result<Arc<dyn Generator>>> + Send + 'static,
    {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.load_generator(loading).await })
    }
}
