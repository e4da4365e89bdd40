use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::aggregator::QueryState;

/// Everything an observer can be told. The core never reads anything back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Indexing(bool),
    ModelLoading(bool),
    /// The full answer text as it currently stands, not a delta.
    Answer(String),
    Query(QueryState),
    Log(String),
}

/// Cloneable sending half of the update channel. Sends never fail: once the
/// receiver is gone, updates are dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<UnboundedSender<Update>>,
}

pub fn channel() -> (Notifier, UnboundedReceiver<Update>) {
    let (tx, rx) = unbounded_channel();
    (Notifier { tx: Some(tx) }, rx)
}

impl Notifier {
    /// A notifier nobody listens to.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, update: Update) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(update);
        }
    }

    pub fn indexing(&self, in_progress: bool) {
        self.send(Update::Indexing(in_progress));
    }

    pub fn model_loading(&self, in_progress: bool) {
        self.send(Update::ModelLoading(in_progress));
    }

    pub fn answer(&self, text: impl Into<String>) {
        self.send(Update::Answer(text.into()));
    }

    pub fn query_state(&self, state: QueryState) {
        self.send(Update::Query(state));
    }

    /// Diagnostic line for the observer; mirrored to `tracing`.
    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "docqa::observer", "{}", line);
        self.send(Update::Log(line));
    }
}
