//! docqa-text
//!
//! In-memory TF-IDF indexing and ranking over document chunks. `tfidf` holds
//! the term statistics, `retriever` owns the current chunk set and swaps whole
//! indexes in and out.

pub mod retriever;
pub mod tfidf;
pub mod tokenize;

pub use retriever::{IndexSnapshot, Retriever};
pub use tfidf::{cosine_similarity, smoothed_idf, SparseVector, TfIdfIndex};
pub use tokenize::tokenize;
