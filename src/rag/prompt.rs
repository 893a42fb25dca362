//! Grounded prompt assembly.

use crate::types::{RetrievedChunk, FALLBACK_ANSWER};

/// Render retrieved chunks as labelled context blocks.
pub fn format_context(contexts: &[RetrievedChunk]) -> String {
    contexts
        .iter()
        .map(|c| format!("[Source: {} | Chunk: {}]\n{}", c.source, c.chunk_id, c.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the instruction prompt that restricts the model to `contexts`.
pub fn build_prompt(query: &str, contexts: &[RetrievedChunk]) -> String {
    let context_text = format_context(contexts);

    format!(
        r#"
You are an enterprise personal assistant.
You must answer ONLY using the provided CONTEXT.
If the answer is not in the context, say: "{FALLBACK_ANSWER}"

CONTEXT:
{context_text}

USER QUESTION:
{query}

ANSWER (be clear and concise):
"#
    )
    .trim()
    .to_string()
}
