//! Generation collaborators: a streaming Ollama chat client and an offline
//! fake for development and tests.

use std::sync::Arc;

use docqa_core::config::{Backend, LlmSettings};
use docqa_core::error::Result;
use docqa_core::traits::Generator;

pub mod fake;
pub mod ollama;

pub use fake::FakeGenerator;
pub use ollama::{decode_chat_line, decode_chat_stream, OllamaGenerator};

/// Load the configured generator. `APP_USE_FAKE_GENERATOR=1` forces the fake.
pub async fn load_default_generator(settings: &LlmSettings) -> Result<Arc<dyn Generator>> {
    let use_fake = std::env::var("APP_USE_FAKE_GENERATOR")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake || settings.backend == Backend::Fake {
        tracing::info!("using FakeGenerator");
        return Ok(Arc::new(FakeGenerator::new()));
    }
    Ok(Arc::new(OllamaGenerator::connect(settings).await?))
}
