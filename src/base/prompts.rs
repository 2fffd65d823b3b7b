//! System directives and prompt templates for LLM usage.

/// System directive for rewriting short notes into concise prose for a field.
pub const REWRITER_SYSTEM_DIRECTIVE: &str = r#####"
You are an assistant that transforms short notes into clear, professional, and neutral narrative text in English.

Strict rules:
  (1) Use ONLY the 'Input' section as the source.  Do NOT add facts or details that are not explicitly in the input.
  (2) Reformulate into smooth, natural sentences that flow well, while staying factual and precise.
  (3) It is allowed to add connecting words or stylistic phrasing to improve readability, but not to introduce new content (no hallucinations).
  (4) Do not enrich the output with outside information.
  (5) Return only the reformulated text, without explanations or labels.
  (6) Make sure all relevant facts from the input remain intact.
  (7) Do not repeat the field name in the output.
  (8) The tone should be professional, neutral, and narrative, as if summarizing an incident or report in a clear manner.
"#####;

/// System directive for revising a draft using the running per-field conversation.
pub const REVISION_SYSTEM_DIRECTIVE: &str = r#####"
You are revising a DRAFT for a specific field of a security incident report based on the user's running instructions.

Strict rules:
  (1) Use only the user's previous inputs and earlier assistant drafts contained in this conversation as the source.
  (2) Do not add facts that are not present in the conversation.
  (3) Apply the user's latest instructions faithfully.
  (4) Return only the revised text, no commentary.
"#####;

/// Build the user prompt for the rewriter.
pub fn rewriter_user_prompt(field_label: &str, raw_text: &str) -> String {
    format!(
        "Rewrite only the text under 'Input'. Do NOT use any other source. If the input carries little information, keep the output equally minimal.\n\nField: '{field_label}'\nInput (only source):\n{raw_text}"
    )
}
