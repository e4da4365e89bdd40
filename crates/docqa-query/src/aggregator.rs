//! Sequential, per-chunk question answering.
//!
//! One `ask` walks the selected chunks in ascending id order, streams each
//! chunk's answer from the generator and publishes `completed + current` after
//! every token. A chunk whose generation fails contributes nothing; the rest of
//! the run continues.
//!
//! Every `ask` takes a fresh run number. Starting a new run (or `cancel`)
//! makes the previous one stale: it stops publishing at once and returns
//! `AskOutcome::Superseded` at its next token or chunk boundary.

use futures::StreamExt;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use docqa_core::config::QuerySettings;
use docqa_core::error::Error;
use docqa_core::prompt::{build_prompt, DEFAULT_SYSTEM_PROMPT};
use docqa_core::traits::Generator;
use docqa_core::types::{Chunk, ChunkId};
use docqa_text::IndexSnapshot;

use crate::notify::Notifier;

pub const NO_DOCUMENT_ANSWER: &str = "No document has been indexed yet.";
pub const NO_GENERATOR_ANSWER: &str = "No model is loaded.";
pub const NOT_FOUND_ANSWER: &str = "The document does not seem to answer this question.";

const ANSWER_SEPARATOR: &str = "\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Running,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    Completed(String),
    Superseded,
}

/// Which chunks a question is put to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSelection {
    /// Every chunk of the document.
    All,
    /// The `k` chunks ranking best against the question, still answered in
    /// ascending chunk id order.
    TopK(NonZeroUsize),
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub system_prompt: String,
    pub selection: ChunkSelection,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(), selection: ChunkSelection::All }
    }
}

impl From<&QuerySettings> for QueryConfig {
    fn from(settings: &QuerySettings) -> Self {
        let selection = settings
            .top_k
            .and_then(NonZeroUsize::new)
            .map_or(ChunkSelection::All, ChunkSelection::TopK);
        Self { system_prompt: settings.system_prompt.clone(), selection }
    }
}

struct Live {
    run: u64,
    answer: String,
    state: QueryState,
}

enum ChunkAnswer {
    Answered(String),
    Failed(Error),
    Superseded,
}

pub struct QueryAggregator {
    config: QueryConfig,
    notifier: Notifier,
    live: Mutex<Live>,
}

impl QueryAggregator {
    pub fn new(config: QueryConfig, notifier: Notifier) -> Self {
        Self {
            config,
            notifier,
            live: Mutex::new(Live { run: 0, answer: String::new(), state: QueryState::Idle }),
        }
    }

    pub fn state(&self) -> QueryState {
        self.live.lock().state
    }

    /// The answer as last published.
    pub fn answer(&self) -> String {
        self.live.lock().answer.clone()
    }

    /// Make the running question (if any) stale.
    pub fn cancel(&self) {
        self.cancel_with(|| ());
    }

    /// Make the running question stale and run `swap` before any new question
    /// can start. A question started afterwards sees whatever `swap` installed.
    pub fn cancel_with<R>(&self, swap: impl FnOnce() -> R) -> R {
        let mut live = self.live.lock();
        live.run += 1;
        if live.state == QueryState::Running {
            live.state = QueryState::Idle;
            self.notifier.query_state(QueryState::Idle);
        }
        swap()
    }

    /// Answer `question` from the chunks of `snapshot`.
    pub async fn ask(
        &self,
        question: &str,
        snapshot: Arc<IndexSnapshot>,
        generator: Option<Arc<dyn Generator>>,
    ) -> AskOutcome {
        self.ask_with(question, move || snapshot, generator).await
    }

    /// Like `ask`, but the snapshot is taken as the run starts, under the lock
    /// `cancel_with` holds while swapping.
    pub async fn ask_with<F>(&self, question: &str, snapshot: F, generator: Option<Arc<dyn Generator>>) -> AskOutcome
    where
        F: FnOnce() -> Arc<IndexSnapshot>,
    {
        let (run, snapshot) = self.begin(snapshot);

        if snapshot.is_empty() {
            self.notifier.log("question asked with no document indexed");
            return self.finish(run, NO_DOCUMENT_ANSWER.to_string());
        }
        let Some(generator) = generator else {
            self.notifier.log("question asked with no model loaded");
            return self.finish(run, NO_GENERATOR_ANSWER.to_string());
        };

        let chunks = self.select(&snapshot, question);
        tracing::info!(run, chunks = chunks.len(), generator = generator.name(), "answering question");

        let mut completed = String::new();
        for chunk in chunks {
            if !self.is_current(run) {
                return AskOutcome::Superseded;
            }
            match self.answer_chunk(run, question, chunk, &completed, generator.as_ref()).await {
                ChunkAnswer::Answered(text) => {
                    tracing::debug!(run, chunk = chunk.id, chars = text.len(), "chunk answered");
                    if !text.trim().is_empty() {
                        completed.push_str(&text);
                        completed.push_str(ANSWER_SEPARATOR);
                    }
                }
                ChunkAnswer::Failed(e) => {
                    tracing::warn!(run, chunk = chunk.id, error = %e, "chunk generation failed");
                    self.notifier.log(format!("chunk {} skipped: {}", chunk.id, e));
                    if !self.publish(run, completed.clone()) {
                        return AskOutcome::Superseded;
                    }
                }
                ChunkAnswer::Superseded => return AskOutcome::Superseded,
            }
        }

        let answer = completed.trim();
        let answer = if answer.is_empty() { NOT_FOUND_ANSWER } else { answer };
        self.finish(run, answer.to_string())
    }

    fn select<'a>(&self, snapshot: &'a IndexSnapshot, question: &str) -> Vec<&'a Chunk> {
        match self.config.selection {
            ChunkSelection::All => snapshot.chunks().iter().collect(),
            ChunkSelection::TopK(k) => {
                let mut ids: Vec<ChunkId> = snapshot.rank(question).into_iter().take(k.get()).map(|h| h.id).collect();
                ids.sort_unstable();
                ids.into_iter().filter_map(|id| snapshot.chunk(id)).collect()
            }
        }
    }

    async fn answer_chunk(
        &self,
        run: u64,
        question: &str,
        chunk: &Chunk,
        completed: &str,
        generator: &dyn Generator,
    ) -> ChunkAnswer {
        let prompt = build_prompt(&self.config.system_prompt, question, &chunk.text);
        let mut tokens = generator.generate(&prompt);
        let mut current = String::new();
        while let Some(token) = tokens.next().await {
            match token {
                Ok(token) => {
                    current.push_str(&token);
                    if !self.publish(run, format!("{}{}", completed, current)) {
                        return ChunkAnswer::Superseded;
                    }
                }
                Err(e) => return ChunkAnswer::Failed(e),
            }
        }
        ChunkAnswer::Answered(current)
    }

    fn begin<F>(&self, snapshot: F) -> (u64, Arc<IndexSnapshot>)
    where
        F: FnOnce() -> Arc<IndexSnapshot>,
    {
        let mut live = self.live.lock();
        live.run += 1;
        live.answer.clear();
        live.state = QueryState::Running;
        self.notifier.answer(String::new());
        self.notifier.query_state(QueryState::Running);
        (live.run, snapshot())
    }

    fn is_current(&self, run: u64) -> bool {
        self.live.lock().run == run
    }

    /// Publish `text` as the live answer unless `run` went stale.
    fn publish(&self, run: u64, text: String) -> bool {
        let mut live = self.live.lock();
        if live.run != run {
            return false;
        }
        self.notifier.answer(text.clone());
        live.answer = text;
        true
    }

    fn finish(&self, run: u64, answer: String) -> AskOutcome {
        let mut live = self.live.lock();
        if live.run != run {
            return AskOutcome::Superseded;
        }
        self.notifier.answer(answer.clone());
        self.notifier.query_state(QueryState::Completed);
        live.answer = answer.clone();
        live.state = QueryState::Completed;
        AskOutcome::Completed(answer)
    }
}
