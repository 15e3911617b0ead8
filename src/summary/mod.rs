/// Natural-language summaries of monitoring results.
///
/// Submodules:
/// - `prompt`: builds prompts and structured data bundles.
/// - `openai`: blocking client for an OpenAI-compatible completions API.

pub mod openai;
pub mod prompt;

use serde_json::Value;

use crate::model::GenerationError;

/// A text-generation backend.
pub trait TextGenerator {
    /// Raw prompt in, generated text out.
    fn complete(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Summary of a structured data bundle, framed by `context_label`.
    fn generate_summary(&self, data: &Value, context_label: &str) -> Result<String, GenerationError> {
        self.complete(&prompt::build_summary_prompt(data, context_label))
    }
}
