use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

use docqa_core::error::Error;
use docqa_core::prompt::Prompt;
use docqa_core::traits::{Generator, TokenStream};
use docqa_core::types::Chunk;
use docqa_query::{
    channel, AskOutcome, ChunkSelection, QueryAggregator, QueryConfig, QueryState, Update, NOT_FOUND_ANSWER,
    NO_DOCUMENT_ANSWER, NO_GENERATOR_ANSWER,
};
use docqa_text::IndexSnapshot;

#[derive(Clone, Copy)]
enum Step {
    Token(&'static str),
    Fail(&'static str),
}

/// Replays a fixed token script per excerpt and records which excerpts it saw.
#[derive(Default)]
struct ScriptedGenerator {
    scripts: HashMap<String, Vec<Step>>,
    calls: AtomicUsize,
    seen: parking_lot::Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn with(mut self, excerpt: &str, steps: &[Step]) -> Self {
        self.scripts.insert(excerpt.to_string(), steps.to_vec());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, prompt: &Prompt) -> TokenStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(prompt.excerpt.clone());
        let steps = self.scripts.get(&prompt.excerpt).cloned().unwrap_or_default();
        stream::iter(steps.into_iter().map(|step| match step {
            Step::Token(t) => Ok(t.to_string()),
            Step::Fail(m) => Err(Error::Generation(m.to_string())),
        }))
        .boxed()
    }
}

fn snapshot(texts: &[&str]) -> Arc<IndexSnapshot> {
    let chunks = texts.iter().enumerate().map(|(id, t)| Chunk { id, text: t.to_string() }).collect();
    Arc::new(IndexSnapshot::build(chunks))
}

fn drain(rx: &mut UnboundedReceiver<Update>) -> Vec<Update> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

fn answers(updates: &[Update]) -> Vec<String> {
    updates
        .iter()
        .filter_map(|u| match u {
            Update::Answer(a) => Some(a.clone()),
            _ => None,
        })
        .collect()
}

fn logs(updates: &[Update]) -> Vec<String> {
    updates
        .iter()
        .filter_map(|u| match u {
            Update::Log(l) => Some(l.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn no_document_answers_without_calling_the_generator() {
    let (notifier, mut rx) = channel();
    let aggregator = QueryAggregator::new(QueryConfig::default(), notifier);
    let generator = Arc::new(ScriptedGenerator::default());

    let outcome = aggregator.ask("anything?", snapshot(&[]), Some(generator.clone())).await;

    assert_eq!(outcome, AskOutcome::Completed(NO_DOCUMENT_ANSWER.to_string()));
    assert_eq!(generator.calls(), 0);
    assert_eq!(aggregator.state(), QueryState::Completed);
    let updates = drain(&mut rx);
    assert_eq!(answers(&updates).last().map(String::as_str), Some(NO_DOCUMENT_ANSWER));
    assert_eq!(updates.last(), Some(&Update::Query(QueryState::Completed)));
}

#[tokio::test]
async fn missing_generator_is_reported() {
    let (notifier, _rx) = channel();
    let aggregator = QueryAggregator::new(QueryConfig::default(), notifier);

    let outcome = aggregator.ask("anything?", snapshot(&["some text"]), None).await;

    assert_eq!(outcome, AskOutcome::Completed(NO_GENERATOR_ANSWER.to_string()));
    assert_eq!(aggregator.answer(), NO_GENERATOR_ANSWER);
}

#[tokio::test]
async fn partial_answers_grow_token_by_token() {
    let (notifier, mut rx) = channel();
    let aggregator = QueryAggregator::new(QueryConfig::default(), notifier);
    let generator = Arc::new(ScriptedGenerator::default().with(
        "cats are mammals",
        &[Step::Token("Yes"), Step::Token(","), Step::Token(" cats"), Step::Token(" are"), Step::Token(" mammals")],
    ));

    let outcome = aggregator.ask("Are cats mammals?", snapshot(&["cats are mammals"]), Some(generator)).await;

    assert_eq!(outcome, AskOutcome::Completed("Yes, cats are mammals".to_string()));
    let updates = drain(&mut rx);
    assert_eq!(
        answers(&updates),
        vec!["", "Yes", "Yes,", "Yes, cats", "Yes, cats are", "Yes, cats are mammals", "Yes, cats are mammals"]
    );
    assert_eq!(updates.first(), Some(&Update::Answer(String::new())));
    assert!(updates.contains(&Update::Query(QueryState::Running)));
    assert_eq!(updates.last(), Some(&Update::Query(QueryState::Completed)));
}

#[tokio::test]
async fn chunk_answers_are_joined_in_chunk_order() {
    let (notifier, mut rx) = channel();
    let aggregator = QueryAggregator::new(QueryConfig::default(), notifier);
    let generator = Arc::new(
        ScriptedGenerator::default()
            .with("first chunk", &[Step::Token("a1"), Step::Token(" a2")])
            .with("second chunk", &[Step::Token("b1")]),
    );

    let outcome = aggregator
        .ask("q", snapshot(&["first chunk", "second chunk"]), Some(generator.clone()))
        .await;

    assert_eq!(outcome, AskOutcome::Completed("a1 a2\nb1".to_string()));
    assert_eq!(answers(&drain(&mut rx)), vec!["", "a1", "a1 a2", "a1 a2\nb1", "a1 a2\nb1"]);
    assert_eq!(*generator.seen.lock(), vec!["first chunk".to_string(), "second chunk".to_string()]);
}

#[tokio::test]
async fn failed_chunk_is_skipped_and_logged() {
    let (notifier, mut rx) = channel();
    let aggregator = QueryAggregator::new(QueryConfig::default(), notifier);
    let generator = Arc::new(
        ScriptedGenerator::default()
            .with("chunk zero", &[Step::Fail("model crashed")])
            .with("chunk one", &[Step::Token("42")]),
    );

    let outcome = aggregator.ask("answer?", snapshot(&["chunk zero", "chunk one"]), Some(generator)).await;

    assert_eq!(outcome, AskOutcome::Completed("42".to_string()));
    let updates = drain(&mut rx);
    let logs = logs(&updates);
    assert!(logs.iter().any(|l| l.contains("chunk 0") && l.contains("model crashed")), "logs: {logs:?}");
}

#[tokio::test]
async fn tokens_of_a_failing_chunk_are_retracted() {
    let (notifier, mut rx) = channel();
    let aggregator = QueryAggregator::new(QueryConfig::default(), notifier);
    let generator = Arc::new(
        ScriptedGenerator::default()
            .with("chunk zero", &[Step::Token("partial"), Step::Fail("connection reset")])
            .with("chunk one", &[Step::Token("ok")]),
    );

    let outcome = aggregator.ask("q", snapshot(&["chunk zero", "chunk one"]), Some(generator)).await;

    assert_eq!(outcome, AskOutcome::Completed("ok".to_string()));
    assert_eq!(answers(&drain(&mut rx)), vec!["", "partial", "", "ok", "ok"]);
}

#[tokio::test]
async fn empty_answers_everywhere_means_not_found() {
    let (notifier, _rx) = channel();
    let aggregator = QueryAggregator::new(QueryConfig::default(), notifier);
    let generator = Arc::new(
        ScriptedGenerator::default()
            .with("one", &[])
            .with("two", &[Step::Token("  "), Step::Token("\n")]),
    );

    let outcome = aggregator.ask("q", snapshot(&["one", "two"]), Some(generator.clone())).await;

    assert_eq!(outcome, AskOutcome::Completed(NOT_FOUND_ANSWER.to_string()));
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn top_k_asks_only_the_best_chunks_in_id_order() {
    let (notifier, _rx) = channel();
    let config = QueryConfig {
        selection: ChunkSelection::TopK(NonZeroUsize::new(2).expect("nonzero")),
        ..QueryConfig::default()
    };
    let aggregator = QueryAggregator::new(config, notifier);
    let texts = [
        "whales breathe air through a blowhole",
        "the weather today is mild",
        "whales are large marine mammals",
        "bread needs flour and water",
    ];
    let generator = Arc::new(ScriptedGenerator::default());

    aggregator.ask("whales", snapshot(&texts), Some(generator.clone())).await;

    assert_eq!(generator.calls(), 2);
    assert_eq!(*generator.seen.lock(), vec![texts[0].to_string(), texts[2].to_string()]);
}

#[tokio::test]
async fn cancel_moves_a_finished_aggregator_nowhere() {
    let (notifier, _rx) = channel();
    let aggregator = QueryAggregator::new(QueryConfig::default(), notifier);
    assert_eq!(aggregator.state(), QueryState::Idle);

    aggregator.ask("q", snapshot(&[]), None).await;
    aggregator.cancel();

    assert_eq!(aggregator.state(), QueryState::Completed);
    assert_eq!(aggregator.answer(), NO_DOCUMENT_ANSWER);
}

/// Echoes the excerpt, except for the question "slow": one token, then it
/// waits for the gate before the second.
struct EchoGenerator {
    gate: Arc<Notify>,
}

impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    fn generate(&self, prompt: &Prompt) -> TokenStream {
        if prompt.question == "slow" {
            let gate = Arc::clone(&self.gate);
            stream::once(async { Ok("s1".to_string()) })
                .chain(stream::once(async move {
                    gate.notified().await;
                    Ok("s2".to_string())
                }))
                .boxed()
        } else {
            stream::iter(vec![Ok(prompt.excerpt.clone())]).boxed()
        }
    }
}

#[tokio::test]
async fn swap_under_cancel_supersedes_the_running_question_and_feeds_the_next() {
    let (notifier, mut rx) = channel();
    let aggregator = Arc::new(QueryAggregator::new(QueryConfig::default(), notifier));
    let gate = Arc::new(Notify::new());
    let generator: Arc<dyn Generator> = Arc::new(EchoGenerator { gate: Arc::clone(&gate) });
    let current = Arc::new(parking_lot::RwLock::new(snapshot(&["old document"])));

    let running = {
        let (aggregator, current, generator) = (Arc::clone(&aggregator), Arc::clone(&current), Arc::clone(&generator));
        tokio::spawn(async move { aggregator.ask_with("slow", || current.read().clone(), Some(generator)).await })
    };
    while let Some(update) = rx.recv().await {
        if update == Update::Answer("s1".to_string()) {
            break;
        }
    }

    let swapped = aggregator.cancel_with(|| {
        *current.write() = snapshot(&["new document"]);
        "swapped"
    });
    assert_eq!(swapped, "swapped");
    assert_eq!(aggregator.state(), QueryState::Idle);

    let outcome = aggregator.ask_with("echo", || current.read().clone(), Some(generator)).await;
    assert_eq!(outcome, AskOutcome::Completed("new document".to_string()));

    gate.notify_one();
    assert_eq!(running.await.expect("join"), AskOutcome::Superseded);
    assert_eq!(aggregator.answer(), "new document");
}
