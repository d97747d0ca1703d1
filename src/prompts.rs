//! Prompts for narration generation.
//!
//! All prompt text lives here so wording changes touch one place and unit
//! tests can inspect the prompts without a live backend.
//!
//! Both prompts ask for the same thing: the words a presenter says out loud,
//! in first person, as plain text. They differ only in what the model is
//! shown (the slide image, or the slide's extracted text).

use crate::config::{NarrationStyle, NarrationTone};

/// System message shared by every narration request.
pub const SYSTEM_PROMPT: &str = "You are an experienced presenter writing the script \
you will speak while a slide is on screen. You reply with the spoken words only.";

/// Shared output rules, appended to both prompts.
const SCRIPT_RULES: &str = r#"Write a natural, conversational script that:
- Flows smoothly and sounds natural when spoken aloud
- Explains the content clearly and concisely
- Takes approximately {duration} to speak ({sentences})
- Is written in first person (as if you are the presenter)
- Uses a tone that is {register}
- Includes no markdown formatting, bullets, or special characters
- Is just plain text that can be read directly

Write ONLY the spoken words - nothing else. No labels, no sections, no formatting.
Just write what needs to be said, as if you're speaking directly to the audience."#;

fn script_rules(style: NarrationStyle, tone: NarrationTone) -> String {
    SCRIPT_RULES
        .replace("{duration}", style.duration())
        .replace("{sentences}", style.sentences())
        .replace("{register}", tone.register())
}

/// Prompt sent alongside a slide image.
pub fn image_prompt(style: NarrationStyle, tone: NarrationTone) -> String {
    format!(
        "Analyze this presentation slide and write exactly what the presenter should say \
when presenting this slide.\n\n{}",
        script_rules(style, tone)
    )
}

/// Prompt built around a slide's extracted text.
pub fn text_prompt(slide_text: &str, style: NarrationStyle, tone: NarrationTone) -> String {
    format!(
        "Based on this slide content, write exactly what the presenter should say when \
presenting this slide.\n\nSlide content:\n{}\n\n{}",
        slide_text.trim(),
        script_rules(style, tone)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_prompt_carries_style_and_tone() {
        let p = image_prompt(NarrationStyle::Brief, NarrationTone::Casual);
        assert!(p.contains("20-30 seconds"));
        assert!(p.contains("2-4 sentences"));
        assert!(p.contains(NarrationTone::Casual.register()));
        assert!(!p.contains('{'), "unfilled placeholder in: {p}");
    }

    #[test]
    fn text_prompt_embeds_slide_text() {
        let p = text_prompt("  Q3 revenue up 12%\n", NarrationStyle::Detailed, NarrationTone::Technical);
        assert!(p.contains("Slide content:\nQ3 revenue up 12%\n"));
        assert!(p.contains("90-120 seconds"));
        assert!(p.contains("8-12 sentences"));
    }
}
