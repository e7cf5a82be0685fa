//! Relevance judgment prompts for academic paper selection.
//!
//! Contains system and user prompt templates for deciding whether a paper
//! aligns with the configured research profile.

/// System prompt for the relevance judgment
pub const SYSTEM_PROMPT: &str = r#"You are an academic assistant who helps users filter papers related to their research interests.

Rules you MUST follow:
- Judge ONLY from the provided title and abstract; do not fabricate paper content.
- "aligned" means the paper's core problem and primary contributions fall directly within the user's specific research subfields, or have clear and direct research value for them.
- A paper that is related only at the broad-field level, or whose connection to the specific subfields is weak or indirect, is "not aligned".
- Output MUST be valid JSON only (no extra text), for machine parsing.

Output format (strict JSON, no markdown):
{
  "aligned": true | false,
  "reason": "Brief explanation in English"
}"#;

/// User prompt template for a single paper judgment
/// Placeholders: {broad_field}, {specific_fields}, {title}, {abstract}
pub const USER_PROMPT_TEMPLATE: &str = r#"My research focuses on {broad_field}.

My specific research subfields are: {specific_fields}.

Please evaluate whether the following paper aligns with my research direction by considering the paper's research question, core concepts and keywords, methods and technical approach, and main contributions and conclusions.

Paper Title: {title}

Paper Abstract: {abstract}

Output strict JSON only (no markdown code blocks, no extra text):
{
  "aligned": true | false,
  "reason": "Brief explanation"
}"#;

/// Build user prompt with the research profile and paper fields
pub fn build_user_prompt(
    broad_field: &str,
    specific_fields: &str,
    title: &str,
    abstract_text: &str,
) -> String {
    USER_PROMPT_TEMPLATE
        .replace("{broad_field}", broad_field)
        .replace("{specific_fields}", specific_fields)
        .replace("{title}", title)
        .replace("{abstract}", abstract_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_user_prompt() {
        let prompt = build_user_prompt(
            "AI for Electronic Design Automation (EDA)",
            "code generation, lint repair",
            "Verilog Copilot",
            "We present a model for RTL completion.",
        );
        assert!(prompt.contains("AI for Electronic Design Automation (EDA)"));
        assert!(prompt.contains("code generation, lint repair"));
        assert!(prompt.contains("Paper Title: Verilog Copilot"));
        assert!(prompt.contains("Paper Abstract: We present a model for RTL completion."));
    }
}
