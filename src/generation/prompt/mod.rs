#[cfg(test)]
mod tests;

use itertools::Itertools;

/// Placed between retrieved passages in the CONTEXTS section
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const NO_CONTEXT_NOTE: &str = "(No relevant course material was found. Answer from general knowledge and say that you did so.)";

/// Build the tutor prompt for `question`, grounded on the retrieved `contexts`.
///
/// Passages are trimmed and joined with [`CONTEXT_SEPARATOR`]. The question is embedded
/// as given.
#[inline]
pub fn build_prompt<S: AsRef<str>>(question: &str, contexts: &[S]) -> String {
    let joined = contexts
        .iter()
        .map(|context| context.as_ref().trim())
        .filter(|context| !context.is_empty())
        .join(CONTEXT_SEPARATOR);

    let contexts_section = if joined.is_empty() {
        NO_CONTEXT_NOTE
    } else {
        joined.as_str()
    };

    format!(
        "You are an experienced college-level teaching assistant.
Answer clearly and step-by-step.

Goals:
1) Explain simply in structured steps.
2) Provide a short example or analogy.
3) End with one quick quiz question.
4) If there are no CONTEXTS, answer from your own knowledge but note that.

CONTEXTS:
{contexts_section}

QUESTION:
{question}
"
    )
}
