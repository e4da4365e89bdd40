use futures::stream::BoxStream;

use crate::error::Result;
use crate::prompt::Prompt;

/// Lazy, finite, non-restartable sequence of answer tokens. Any item may be an
/// error, after which the stream should be treated as finished.
pub type TokenStream = BoxStream<'static, Result<String>>;

pub trait Generator: Send + Sync {
    /// Human-readable identity, used in logs.
    fn name(&self) -> &str;
    fn generate(&self, prompt: &Prompt) -> TokenStream;
}

pub trait DocumentSource: Send + Sync {
    fn describe(&self) -> String;
    /// Extracted page texts in document order.
    fn pages(&self) -> Result<Vec<String>>;
}
