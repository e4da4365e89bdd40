use parking_lot::RwLock;
use std::sync::Arc;

use docqa_core::types::{Chunk, ChunkId, SearchHit};

use crate::tfidf::{cosine_similarity, TfIdfIndex};

/// An immutable chunk set together with the index built from it.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    chunks: Vec<Chunk>,
    index: TfIdfIndex,
}

impl IndexSnapshot {
    pub fn build(chunks: Vec<Chunk>) -> Self {
        let index = TfIdfIndex::build(&chunks);
        Self { chunks, index }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        match self.chunks.get(id) {
            Some(c) if c.id == id => Some(c),
            _ => self.chunks.iter().find(|c| c.id == id),
        }
    }

    pub fn index(&self) -> &TfIdfIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Every chunk scored by cosine similarity against `query`, best first.
    /// Equal scores keep ascending chunk id order.
    pub fn rank(&self, query: &str) -> Vec<SearchHit> {
        let query_vector = self.index.vectorize(query);
        let mut hits: Vec<SearchHit> = self
            .chunks
            .iter()
            .zip(self.index.vectors())
            .map(|(chunk, vector)| SearchHit { id: chunk.id, score: cosine_similarity(&query_vector, vector) })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits
    }
}

/// Owns the current chunk set and its index.
///
/// Readers take an `Arc` snapshot and are never affected by a later rebuild;
/// `build_index` replaces the whole snapshot under a short write lock.
#[derive(Default)]
pub struct Retriever {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl Retriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held chunks and rebuild the index from scratch.
    pub fn build_index(&self, chunks: Vec<Chunk>) -> usize {
        self.install(IndexSnapshot::build(chunks))
    }

    /// Swap in a snapshot built elsewhere (e.g. on a blocking thread).
    pub fn install(&self, snapshot: IndexSnapshot) -> usize {
        let count = snapshot.len();
        tracing::info!(chunks = count, terms = snapshot.index().idf_table().len(), "index swapped in");
        *self.current.write() = Arc::new(snapshot);
        count
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn chunks(&self) -> Vec<Chunk> {
        self.snapshot().chunks().to_vec()
    }

    pub fn chunk(&self, id: ChunkId) -> Option<Chunk> {
        self.snapshot().chunk(id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    pub fn rank(&self, query: &str) -> Vec<SearchHit> {
        self.snapshot().rank(query)
    }
}
