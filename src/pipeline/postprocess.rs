//! Post-processing: deterministic cleanup of generated narration.
//!
//! Presenter notes are read aloud, so anything a model adds for a renderer
//! rather than a speaker has to go: code fences, markdown emphasis, heading
//! and bullet markers, and "Speaker notes:"-style labels. Prompts ask for
//! plain text already; these rules catch the cases where a model ignores
//! that.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule sees `\n`. Fences
//! are stripped before line-level rules so the fence lines themselves do not
//! survive as text. Blank-line collapsing runs last because the marker rules
//! can leave lines empty.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule to raw backend output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip outer code fences
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Strip a leading "Speaker notes:" / "Script:" label
/// 5. Strip heading markers (`# `, `## `, …)
/// 6. Strip bullet and numbered-list markers
/// 7. Strip markdown emphasis (`**bold**`, `__bold__`)
/// 8. Trim each line, collapse runs of blank lines to one, trim the result
///
/// The result may be empty; callers treat that as a failed generation.
pub fn clean_narration(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_code_fences(&s);
    let s = remove_invisible_chars(&s);
    let s = strip_leading_label(&s);
    let s = strip_heading_markers(&s);
    let s = strip_list_markers(&s);
    let s = strip_emphasis(&s);
    collapse_blank_lines(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*?)\n?```$").unwrap());

fn strip_code_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 3: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Strip a leading label ────────────────────────────────────────────

static RE_LEADING_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:\*\*|__)?(?:speaker notes|presenter notes|notes|script|narration|transcript)(?:\*\*|__)?\s*:(?:\*\*|__)?[ \t]*\n?",
    )
    .unwrap()
});

fn strip_leading_label(input: &str) -> String {
    RE_LEADING_LABEL.replace(input, "").to_string()
}

// ── Rule 5: Strip heading markers ────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").unwrap());

fn strip_heading_markers(input: &str) -> String {
    RE_HEADING.replace_all(input, "").to_string()
}

// ── Rule 6: Strip list markers ───────────────────────────────────────────────

static RE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:[-*•]|\d{1,2}[.)])[ \t]+").unwrap());

fn strip_list_markers(input: &str) -> String {
    RE_BULLET.replace_all(input, "").to_string()
}

// ── Rule 7: Strip emphasis ───────────────────────────────────────────────────

static RE_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\*\*|__)([^\n]+?)(\*\*|__)").unwrap());

fn strip_emphasis(input: &str) -> String {
    let s = RE_EMPHASIS.replace_all(input, "$2");
    s.replace("**", "")
}

// ── Rule 8: Collapse blank lines ─────────────────────────────────────────────

fn collapse_blank_lines(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in input.lines().map(str::trim) {
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let input = "Welcome everyone. Today we look at our third quarter.";
        assert_eq!(clean_narration(input), input);
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_code_fences("```text\nHello there.\n```"), "Hello there.");
        assert_eq!(strip_code_fences("```\nHello there.\n```"), "Hello there.");
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_strip_label() {
        assert_eq!(clean_narration("Speaker Notes: Good morning."), "Good morning.");
        assert_eq!(clean_narration("**Script:**\nGood morning."), "Good morning.");
    }

    #[test]
    fn label_words_inside_text_are_kept() {
        let input = "These notes: they matter.";
        assert_eq!(clean_narration(input), input);
    }

    #[test]
    fn test_markdown_markers_removed() {
        let input = "## Overview\n- **Revenue** grew\n- Costs fell\n1. Next steps";
        assert_eq!(
            clean_narration(input),
            "Overview\nRevenue grew\nCosts fell\nNext steps"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("\n\na  \n\n\n\n b\n\n"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}";
        assert_eq!(remove_invisible_chars(input), "helloworld");
    }

    #[test]
    fn only_markup_cleans_to_empty() {
        assert_eq!(clean_narration("```\n\n```"), "");
        assert_eq!(clean_narration("  \r\n \n"), "");
    }
}
