//! Translation prompt for the Chinese digest fields.

/// System prompt for English-to-Chinese translation.
///
/// The user message is the raw text to translate; no template is needed.
pub const SYSTEM_PROMPT: &str = "You are an experienced translator who can translate English into Chinese. If the input is empty, output 'None'.";
