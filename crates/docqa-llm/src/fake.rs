use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;

use docqa_core::prompt::Prompt;
use docqa_core::traits::{Generator, TokenStream};
use docqa_text::tokenize;

/// Offline, deterministic generator. Streams, word by word, the first sentence
/// of the excerpt that shares a term (three letters or longer) with the
/// question, and nothing when no sentence does.
#[derive(Debug, Default)]
pub struct FakeGenerator;

impl FakeGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    fn generate(&self, prompt: &Prompt) -> TokenStream {
        let terms: BTreeSet<String> = tokenize(&prompt.question).into_iter().filter(|t| t.len() > 2).collect();
        let sentence = sentences(&prompt.excerpt).find(|s| tokenize(s).iter().any(|t| terms.contains(t)));
        let tokens: Vec<String> = sentence
            .map(|s| {
                s.split(' ')
                    .filter(|w| !w.is_empty())
                    .enumerate()
                    .map(|(i, w)| if i == 0 { w.to_string() } else { format!(" {}", w) })
                    .collect()
            })
            .unwrap_or_default();
        stream::iter(tokens.into_iter().map(Ok)).boxed()
    }
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '?', '!'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
