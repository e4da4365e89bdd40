//! Shared plumbing for the docqa binaries.

use tracing_subscriber::EnvFilter;

/// Log to stderr so stdout carries only the answer. `RUST_LOG` overrides the
/// default `warn` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Turns the stream of full answer texts into what to append to a terminal.
///
/// Growth prints only the new suffix. When the answer shrinks (tokens of a
/// failed chunk discarded) the text already printed stays and output resumes
/// on a new line; the final trim of trailing whitespace prints nothing.
#[derive(Debug, Default)]
pub struct AnswerPrinter {
    shown: String,
}

impl AnswerPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, answer: &str) -> String {
        let out = if let Some(rest) = answer.strip_prefix(self.shown.as_str()) {
            rest.to_string()
        } else if self.shown.trim_end() == answer {
            String::new()
        } else {
            format!("\n{}", answer.strip_prefix(self.common_prefix(answer)).unwrap_or(answer))
        };
        self.shown = answer.to_string();
        out
    }

    fn common_prefix<'a>(&self, answer: &'a str) -> &'a str {
        let len = self
            .shown
            .char_indices()
            .zip(answer.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, c), _)| i + c.len_utf8());
        &answer[..len]
    }
}
