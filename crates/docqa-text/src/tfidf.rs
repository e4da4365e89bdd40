use std::collections::{BTreeMap, BTreeSet};

use docqa_core::types::Chunk;

use crate::tokenize::tokenize;

/// Term → weight. Only terms present in the source text have an entry.
pub type SparseVector = BTreeMap<String, f32>;

/// Term statistics for one chunk set plus one weighted vector per chunk.
///
/// Built in one pass and never updated in place; a new document gets a new
/// index. `vectors()[i]` belongs to the `i`-th chunk handed to `build`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TfIdfIndex {
    chunk_count: usize,
    document_frequency: BTreeMap<String, usize>,
    idf: BTreeMap<String, f32>,
    vectors: Vec<SparseVector>,
}

/// `ln((N + 1) / (df + 1)) + 1`, strictly positive for every `df <= N`.
pub fn smoothed_idf(chunk_count: usize, document_frequency: usize) -> f32 {
    ((chunk_count as f32 + 1.0) / (document_frequency as f32 + 1.0)).ln() + 1.0
}

impl TfIdfIndex {
    pub fn build(chunks: &[Chunk]) -> Self {
        let tokenized: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for tokens in &tokenized {
            let distinct: BTreeSet<&String> = tokens.iter().collect();
            for term in distinct {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let chunk_count = chunks.len();
        let idf: BTreeMap<String, f32> = document_frequency
            .iter()
            .map(|(term, &df)| (term.clone(), smoothed_idf(chunk_count, df)))
            .collect();

        let mut index = Self { chunk_count, document_frequency, idf, vectors: Vec::new() };
        index.vectors = tokenized.iter().map(|tokens| index.weigh(tokens)).collect();
        index
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    /// Idf of `term`; terms never seen in the chunk set get the `df = 0` value.
    pub fn idf(&self, term: &str) -> f32 {
        self.idf
            .get(term)
            .copied()
            .unwrap_or_else(|| smoothed_idf(self.chunk_count, 0))
    }

    pub fn idf_table(&self) -> &BTreeMap<String, f32> {
        &self.idf
    }

    pub fn vectors(&self) -> &[SparseVector] {
        &self.vectors
    }

    pub fn vector(&self, position: usize) -> Option<&SparseVector> {
        self.vectors.get(position)
    }

    /// Weigh arbitrary text against this index, e.g. a query. The text's terms
    /// do not change the index's statistics.
    pub fn vectorize(&self, text: &str) -> SparseVector {
        self.weigh(&tokenize(text))
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for token in tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }
        let total = tokens.len() as f32;
        counts
            .into_iter()
            .map(|(term, count)| (term.to_string(), (count as f32 / total) * self.idf(term)))
            .collect()
    }
}

/// Cosine similarity of two sparse vectors; 0 when either has no weight.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f32 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f32 = small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|v| w * v))
        .sum();
    let norm_a = a.values().map(|w| w * w).sum::<f32>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
