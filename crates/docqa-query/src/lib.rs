//! docqa-query
//!
//! Answers a question against the indexed document: one prompt per chunk, sent
//! sequentially to a generator, with the growing answer published on an
//! update channel. `Session` ties the retriever, the generator and the
//! aggregator together.

pub mod aggregator;
pub mod notify;
pub mod session;

pub use aggregator::{
    AskOutcome, ChunkSelection, QueryAggregator, QueryConfig, QueryState, NOT_FOUND_ANSWER,
    NO_DOCUMENT_ANSWER, NO_GENERATOR_ANSWER,
};
pub use notify::{channel, Notifier, Update};
pub use session::Session;
