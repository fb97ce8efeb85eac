//! Post-processing of raw model output
//!
//! Backends sometimes echo the prompt back, wrap the answer in a code fence,
//! or fall into repetition loops. [`sanitize`] runs an ordered list of
//! independent text passes over the output until it stops shrinking. Every
//! pass only deletes text, so the result is a fixpoint and running
//! [`sanitize`] again returns it unchanged.
//!
//! Repetition passes only collapse runs of three or more copies; a phrase
//! that appears twice is left alone.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::ops::Range;

use crate::core::language::LANGUAGES;

/// Minimum number of back-to-back copies before a run is collapsed
pub const MIN_REPEATS: usize = 3;

/// Shortest unit the generic substring pass considers, in chars
const MIN_UNIT_CHARS: usize = 2;

/// Longest unit the generic substring pass considers, in chars
const MAX_UNIT_CHARS: usize = 200;

/// Shortest duplicated tail block worth collapsing, in bytes
const MIN_BOILERPLATE_LEN: usize = 20;

/// English names models tend to use in headers, on top of the catalog's native names
const ENGLISH_LANGUAGE_NAMES: &[&str] = &[
    "Chinese",
    "Simplified Chinese",
    "Traditional Chinese",
    "简体中文",
    "Japanese",
    "Korean",
    "French",
    "German",
    "Spanish",
    "Italian",
    "Portuguese",
    "Russian",
    "Vietnamese",
    "Thai",
    "Hindi",
    "Arabic",
    "Turkish",
    "Polish",
    "Dutch",
    "Swedish",
    "Cantonese",
];

/// Particles and connectives that degenerate into loops
const FILLER_WORDS: &[&str] = &["ですが", "しかし", "ます", "です", "However"];

static PLEASE_TRANSLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^Please translate.*?(?:format|日本語)[:\s]*")
        .expect("Should compile: PLEASE_TRANSLATE_RE")
});
static ORIGINAL_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^Original text:\s*").expect("Should compile: ORIGINAL_TEXT_RE")
});
static TRANSLATE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^Translate\b[^\n]*?:\s*").expect("Should compile: TRANSLATE_PREFIX_RE")
});
static LANGUAGE_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    let names = LANGUAGES
        .iter()
        .map(|(_, name)| *name)
        .chain(ENGLISH_LANGUAGE_NAMES.iter().copied())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)^#{{1,3}}\s*(?:{names})\s*(?:[:：(（].*)?$"))
        .expect("Should compile: LANGUAGE_HEADER_RE")
});
static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+").expect("Should compile: WORD_RE"));
static BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\[\]\n]*\]").expect("Should compile: BRACKET_RE"));
static FILLER_RES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    FILLER_WORDS
        .iter()
        .map(|word| {
            let escaped = regex::escape(word);
            let re = Regex::new(&format!(r"{escaped}(?:\s*{escaped}){{{},}}", MIN_REPEATS - 1))
                .expect("Should compile: FILLER_RES");
            (re, *word)
        })
        .collect()
});
static TRAILING_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*```\s*\z").expect("Should compile: TRAILING_FENCE_RE"));
static NOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(Note:[^\n]*?\)").expect("Should compile: NOTE_RE"));
static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^.!?。！？\n]+[.!?。！？]*").expect("Should compile: SENTENCE_RE")
});
static CRITICAL_RULES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ims)^[ \t]*CRITICAL RULES\b.*\z").expect("Should compile: CRITICAL_RULES_RE")
});
static INSTRUCTION_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*•]\s*|\d+\.\s*)?(?:Do NOT|ONLY|Keep exact|Start directly)\b")
        .expect("Should compile: INSTRUCTION_LINE_RE")
});

/// One step of the pipeline
#[derive(Debug, Clone, Copy)]
pub struct SanitizationRule {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

/// Pipeline steps, applied in order
pub const RULES: &[SanitizationRule] = &[
    SanitizationRule {
        name: "prompt_echo",
        apply: strip_prompt_echo,
    },
    SanitizationRule {
        name: "leading_noise",
        apply: strip_leading_noise,
    },
    SanitizationRule {
        name: "repetitions",
        apply: collapse_line_repetitions,
    },
    SanitizationRule {
        name: "trailing_fence",
        apply: strip_trailing_fence,
    },
    SanitizationRule {
        name: "notes",
        apply: strip_notes,
    },
    SanitizationRule {
        name: "duplicate_tail",
        apply: collapse_duplicate_tail,
    },
    SanitizationRule {
        name: "critical_rules",
        apply: truncate_critical_rules,
    },
    SanitizationRule {
        name: "leaked_instructions",
        apply: strip_leaked_instructions,
    },
    SanitizationRule {
        name: "trim",
        apply: trim,
    },
];

/// Clean raw backend output
pub fn sanitize(raw: &str) -> String {
    let mut current = run_pipeline(raw);
    loop {
        let next = run_pipeline(&current);
        // Passes only delete, so equal length means nothing changed
        if next.len() >= current.len() {
            return current;
        }
        current = next;
    }
}

fn run_pipeline(text: &str) -> String {
    RULES
        .iter()
        .fold(text.to_string(), |acc, rule| (rule.apply)(&acc))
}

/// Remove an echoed prompt prefix such as `Original text:` or `Translate ... :`
pub fn strip_prompt_echo(text: &str) -> String {
    let text = PLEASE_TRANSLATE_RE.replace(text, "");
    let text = ORIGINAL_TEXT_RE.replace(&text, "");
    TRANSLATE_PREFIX_RE.replace(&text, "").into_owned()
}

/// Drop blank lines, language headers and code-fence openers before the first real line
pub fn strip_leading_noise(text: &str) -> String {
    let mut lines = text.split('\n').peekable();
    while let Some(line) = lines.peek() {
        let trimmed = line.trim();
        let is_fence = matches!(trimmed, "```" | "```markdown" | "```md");
        if trimmed.is_empty() || is_fence || LANGUAGE_HEADER_RE.is_match(trimmed) {
            lines.next();
        } else {
            break;
        }
    }
    lines.collect::<Vec<_>>().join("\n")
}

/// Apply every in-line repetition collapse to each line
pub fn collapse_line_repetitions(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let line = collapse_repeated_words(line);
            let line = collapse_repeated_brackets(&line);
            let line = collapse_filler_words(&line);
            collapse_repeated_substrings(&line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `debug debug debug` -> `debug`, `a b a b a b` -> `a b`
pub fn collapse_repeated_words(line: &str) -> String {
    let words: Vec<Range<usize>> = WORD_RE.find_iter(line).map(|m| m.range()).collect();
    collapse_token_runs(line, &words, 2)
}

/// `[x] [x] [x]` -> `[x]`
pub fn collapse_repeated_brackets(line: &str) -> String {
    let brackets: Vec<Range<usize>> = BRACKET_RE.find_iter(line).map(|m| m.range()).collect();
    collapse_token_runs(line, &brackets, 1)
}

/// `ますますます` -> `ます`
pub fn collapse_filler_words(line: &str) -> String {
    FILLER_RES.iter().fold(line.to_string(), |acc, (re, word)| {
        re.replace_all(&acc, NoExpand(word)).into_owned()
    })
}

/// Any unit of two or more chars repeated three or more times in a row keeps one copy.
///
/// Units longer than 200 chars are not considered. This also shortens
/// legitimate runs such as `------` or `000000`.
pub fn collapse_repeated_substrings(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    'scan: while i < chars.len() {
        let max_unit = ((chars.len() - i) / MIN_REPEATS).min(MAX_UNIT_CHARS);
        for unit in MIN_UNIT_CHARS..=max_unit {
            let reps = count_repeats(&chars[i..], unit);
            if reps >= MIN_REPEATS {
                out.extend(&chars[i..i + unit]);
                i += unit * reps;
                continue 'scan;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

fn count_repeats(chars: &[char], unit: usize) -> usize {
    let pattern = &chars[..unit];
    let mut reps = 1;
    while chars.len() >= unit * (reps + 1) && chars[unit * reps..unit * (reps + 1)] == *pattern {
        reps += 1;
    }
    reps
}

/// Collapse runs of identical token phrases (up to `max_unit` tokens long)
/// separated only by whitespace.
fn collapse_token_runs(line: &str, tokens: &[Range<usize>], max_unit: usize) -> String {
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    let mut i = 0;

    while i < tokens.len() {
        match repeated_phrase_at(line, tokens, i, max_unit) {
            Some((unit, reps)) => {
                out.push_str(&line[cursor..tokens[i + unit - 1].end]);
                cursor = tokens[i + unit * reps - 1].end;
                i += unit * reps;
            }
            None => i += 1,
        }
    }

    out.push_str(&line[cursor..]);
    out
}

fn repeated_phrase_at(
    line: &str,
    tokens: &[Range<usize>],
    start: usize,
    max_unit: usize,
) -> Option<(usize, usize)> {
    for unit in 1..=max_unit {
        let mut reps = 1;
        while start + unit * (reps + 1) <= tokens.len()
            && same_phrase(line, tokens, start, start + unit * reps, unit)
        {
            reps += 1;
        }
        if reps >= MIN_REPEATS {
            return Some((unit, reps));
        }
    }
    None
}

fn same_phrase(line: &str, tokens: &[Range<usize>], a: usize, b: usize, unit: usize) -> bool {
    let same_tokens = (0..unit).all(|k| line[tokens[a + k].clone()] == line[tokens[b + k].clone()]);
    let joined_by_whitespace = (a..b + unit - 1)
        .all(|j| line[tokens[j].end..tokens[j + 1].start].trim().is_empty());
    same_tokens && joined_by_whitespace
}

/// Remove a closing fence left over after the opening one was stripped
pub fn strip_trailing_fence(text: &str) -> String {
    let fences = text
        .lines()
        .filter(|line| line.trim_start().starts_with("```"))
        .count();
    if fences % 2 == 1 {
        TRAILING_FENCE_RE.replace(text, "").into_owned()
    } else {
        text.to_string()
    }
}

/// Remove `(Note: ...)` annotations
pub fn strip_notes(text: &str) -> String {
    NOTE_RE.replace_all(text, "").into_owned()
}

/// Keep one copy of a sentence block repeated back-to-back at the end
pub fn collapse_duplicate_tail(text: &str) -> String {
    let body = text.trim_end();
    let spans: Vec<Range<usize>> = SENTENCE_RE
        .find_iter(body)
        .filter(|m| !m.as_str().trim().is_empty())
        .map(|m| m.range())
        .collect();

    let mut end = spans.len();
    'search: loop {
        for size in 1..=end / 2 {
            let first = &spans[end - 2 * size..end - size];
            let second = &spans[end - size..end];
            let block_len = first[size - 1].end - first[0].start;
            let identical = first
                .iter()
                .zip(second)
                .all(|(x, y)| body[x.clone()].trim() == body[y.clone()].trim());
            if identical && block_len >= MIN_BOILERPLATE_LEN {
                end -= size;
                continue 'search;
            }
        }
        break;
    }

    if end == spans.len() {
        text.to_string()
    } else {
        body[..spans[end - 1].end].to_string()
    }
}

/// Cut everything from a `CRITICAL RULES` line to the end
pub fn truncate_critical_rules(text: &str) -> String {
    CRITICAL_RULES_RE.replace(text, "").into_owned()
}

/// Drop trailing lines that read like prompt instructions
pub fn strip_leaked_instructions(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut keep = lines.len();
    while keep > 0 {
        let line = lines[keep - 1].trim();
        if line.is_empty() || INSTRUCTION_LINE_RE.is_match(line) {
            keep -= 1;
        } else {
            break;
        }
    }

    if lines[keep..].iter().all(|line| line.trim().is_empty()) {
        return text.to_string();
    }
    lines[..keep].join("\n")
}

/// Trim surrounding whitespace
pub fn trim(text: &str) -> String {
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distinct_chars(len: usize) -> String {
        (0..len as u32).filter_map(|i| char::from_u32(0x4E00 + i)).collect()
    }

    #[test]
    fn test_substring_unit_length_is_bounded() {
        let short = distinct_chars(MAX_UNIT_CHARS);
        assert_eq!(collapse_repeated_substrings(&short.repeat(3)), short);

        let long = distinct_chars(MAX_UNIT_CHARS + 50).repeat(3);
        assert_eq!(collapse_repeated_substrings(&long), long);
    }

    #[test]
    fn test_long_single_line_is_left_intact() {
        let line = distinct_chars(20_000).repeat(3);
        assert_eq!(collapse_repeated_substrings(&line).chars().count(), 60_000);
    }

    #[test]
    fn test_three_repeats_collapse_two_do_not() {
        assert_eq!(collapse_repeated_words("debug debug debug debug"), "debug");
        assert_eq!(collapse_repeated_words("very very good"), "very very good");
        assert_eq!(sanitize("hello world hello world"), "hello world hello world");
    }

    #[test]
    fn test_two_word_phrase_collapses() {
        assert_eq!(collapse_repeated_words("go on a b a b a b now"), "go on a b now");
    }

    #[test]
    fn test_bracket_repetition() {
        assert_eq!(
            collapse_repeated_brackets("usage [-o file.yaml] [-o file.yaml] [-o file.yaml] done"),
            "usage [-o file.yaml] done"
        );
        assert_eq!(collapse_repeated_brackets("[a] [a]"), "[a] [a]");
    }

    #[test]
    fn test_filler_words() {
        assert_eq!(collapse_filler_words("ありますますます。"), "あります。");
        assert_eq!(collapse_filler_words("However However However we"), "However we");
        assert_eq!(collapse_filler_words("しかししかし"), "しかししかし");
    }

    #[test]
    fn test_generic_substring_collapse() {
        assert_eq!(collapse_repeated_substrings("abcabcabc!"), "abc!");
        assert_eq!(collapse_repeated_substrings("run the tests run the tests run the tests now"), "run the tests now");
        assert_eq!(collapse_repeated_substrings("abab"), "abab");
    }

    #[test]
    fn test_strip_prompt_echo() {
        assert_eq!(strip_prompt_echo("Original text:\n# Title"), "# Title");
        assert_eq!(strip_prompt_echo("Translate to French:\n\n# Titre"), "# Titre");
        assert_eq!(strip_prompt_echo("Translator tools"), "Translator tools");
    }

    #[test]
    fn test_strip_leading_noise() {
        let text = "\n### 中文\n```markdown\n# 标题\n\n正文";
        assert_eq!(strip_leading_noise(text), "# 标题\n\n正文");

        let text = "## English (original)\n# Title";
        assert_eq!(strip_leading_noise(text), "# Title");

        let text = "# English Grammar Checker\nbody";
        assert_eq!(strip_leading_noise(text), text);
    }

    #[test]
    fn test_strip_trailing_fence_only_when_unbalanced() {
        assert_eq!(strip_trailing_fence("# Title\ntext\n```\n"), "# Title\ntext");
        let balanced = "# Title\n```rust\nfn main() {}\n```";
        assert_eq!(strip_trailing_fence(balanced), balanced);
    }

    #[test]
    fn test_strip_notes() {
        assert_eq!(
            strip_notes("Install it (Note: translated literally) now."),
            "Install it now."
        );
    }

    #[test]
    fn test_collapse_duplicate_tail() {
        let text = "Intro.\nRequirements: keep the structure. Requirements: keep the structure.";
        assert_eq!(
            collapse_duplicate_tail(text),
            "Intro.\nRequirements: keep the structure."
        );
        assert_eq!(collapse_duplicate_tail("Yes. Yes."), "Yes. Yes.");
    }

    #[test]
    fn test_truncate_critical_rules() {
        let text = "# Title\nbody\n\nCRITICAL RULES - VIOLATION WILL CAUSE FAILURE:\n- Output ONLY";
        assert_eq!(truncate_critical_rules(text).trim_end(), "# Title\nbody");
    }

    #[test]
    fn test_strip_leaked_instructions() {
        let text = "# Title\nbody\n- Do NOT add notes.\n5. Start directly with the README content.\n";
        assert_eq!(strip_leaked_instructions(text), "# Title\nbody");
        assert_eq!(strip_leaked_instructions("ONLYOFFICE support"), "ONLYOFFICE support");
    }

    #[test]
    fn test_full_pipeline() {
        let raw = "Original text: \n\n### 中文\n```markdown\n# 项目\n\n这是 这是 这是 一个工具 (Note: translated)\n```\n\nCRITICAL RULES - VIOLATION\n- Do NOT add";
        assert_eq!(sanitize(raw), "# 项目\n\n这是 一个工具");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "",
            "   plain text   ",
            "Original text: a a a a b a b a b\n```",
            "### English\n\n```\nfoo foo foo [x] [x] [x] ますますます\n```\nDo NOT do this",
            "# Title\n| a | b |\n|---|---|---|---|\nThanks for reading this far. Thanks for reading this far.",
            "line (Note: one) (Note: two)\nCRITICAL RULES\nmore",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_clean_markdown_untouched() {
        let doc = "# Tool\n\nA small utility.\n\n## Usage\n\n```bash\ncargo run -- --help\n```";
        assert_eq!(sanitize(doc), doc);
    }
}
