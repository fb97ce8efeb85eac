//! Prompt construction for both request shapes.

use crate::core::language::{display_name, joined_display_names};
use crate::core::models::Mode;

/// Prompt asking for one JSON object keyed by every requested language code.
pub fn build_combined_prompt(content: &str, languages: &[String], mode: Mode) -> String {
    let languages_str = joined_display_names(languages);
    let json_keys = languages
        .iter()
        .map(|lang| format!("\"{lang}\": \"...\""))
        .collect::<Vec<_>>()
        .join(", ");
    let key_list = languages.join(", ");

    let (task, section, requirement, each_value) = match mode {
        Mode::Translate => (
            format!("Translate the following README content into these languages: {languages_str}"),
            "Original content:",
            "Each value should be the complete translated README content for that language.\n\
             Maintain the original Markdown format and structure in each translation.\n\
             Keep code blocks and inline code exactly as they are.",
            "Each value must contain the complete translated README in that language.",
        ),
        Mode::Generate => (
            format!(
                "Generate README documentation for the following project in these languages: {languages_str}"
            ),
            "Project information:",
            "Each value should be a complete README document for that language.\n\
             Include introduction, features, installation, and usage instructions.",
            "Each value must contain a complete README document in that language.",
        ),
    };

    format!(
        "{task}\n\n\
         {section}\n\
         {content}\n\n\
         IMPORTANT: You MUST return the result as a valid JSON object with language codes as keys.\n\
         {requirement}\n\
         Do not add any commentary outside the JSON object.\n\n\
         Return ONLY a JSON object in this exact format (no other text):\n\
         ```json\n\
         {{\n  {json_keys}\n}}\n\
         ```\n\n\
         The JSON keys must be exactly: {key_list}\n\
         {each_value}"
    )
}

/// Prompt for one language; names the target explicitly to keep other languages out.
pub fn build_single_language_prompt(content: &str, language: &str, mode: Mode) -> String {
    let language_name = display_name(language);

    match mode {
        Mode::Translate => format!(
            "CRITICAL RULES - VIOLATION WILL CAUSE FAILURE:\n\
             - Output ONLY the translated document. Nothing else.\n\
             - Do NOT add language headers like \"### 中文\" or \"### English\".\n\
             - Do NOT add notes, comments, or explanations like \"(Note: ...)\".\n\
             - Do NOT wrap in ```markdown``` code blocks.\n\
             - Do NOT translate code blocks or inline code.\n\
             - Keep exact Markdown formatting, HTML tags, links, symbols.\n\
             - Start directly with the first line of the translated document.\n\n\
             Now Translate this Markdown document into {language_name}:\n\n\
             {content}\n"
        ),
        Mode::Generate => format!(
            "Write a README document in {language_name} ONLY for this project.\n\n\
             PROJECT INFO:\n\
             {content}\n\n\
             STRICT RULES:\n\
             1. Output ONLY in {language_name}. No other languages.\n\
             2. Keep proper Markdown formatting.\n\
             3. Include: introduction, features, installation, usage.\n\
             4. Do NOT add any explanations or notes.\n\
             5. Start directly with the README content."
        ),
    }
}

/// System message for chat-completion backends.
pub fn build_system_prompt(language: &str) -> String {
    format!(
        "You are a Markdown translator. Translate into {}. Output ONLY the translated document. \
         No language headers. No notes. No code block wrappers. Keep all formatting unchanged.",
        display_name(language)
    )
}
