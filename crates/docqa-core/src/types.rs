//! Domain types shared by the indexer, the retriever and the query pipeline.

use serde::{Deserialize, Serialize};

pub type ChunkId = usize;

/// A contiguous slice of a document's words that is indexed and answered
/// against independently.
///
/// - `id`: position in document order, assigned `0, 1, 2, …`
/// - `text`: the chunk's words joined by single spaces
///
/// Chunks are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
}

impl Chunk {
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split(' ')
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }
}

/// A ranked reference to a chunk.
///
/// `id` matches `Chunk::id`. `score` is the cosine similarity between the
/// query and the chunk; higher is always better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
}
