pub const DEFAULT_SYSTEM_PROMPT: &str = "You answer questions about a document. \
You are shown one excerpt of the document at a time. Answer using only the excerpt. \
If the excerpt does not contain the answer, reply with an empty message.";

/// Everything a generator needs for one chunk: the system instruction plus the
/// parts of the user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub question: String,
    pub excerpt: String,
}

impl Prompt {
    /// The user turn as sent to a chat model.
    pub fn user_message(&self) -> String {
        format!("Document excerpt:\n{}\n\nQuestion: {}", self.excerpt, self.question)
    }
}

pub fn build_prompt(system: &str, question: &str, excerpt: &str) -> Prompt {
    Prompt {
        system: system.trim().to_string(),
        question: question.trim().to_string(),
        excerpt: excerpt.to_string(),
    }
}
