//! Prompt construction for each inference stage.
//!
//! Every prompt carries the same language instruction and, where relevant,
//! the same length target so results across stages stay consistent.

use vinsight_models::{Language, SummaryStyle, MAX_TOPICS};

pub const SUMMARY_SYSTEM: &str =
    "You summarize video content accurately and concisely. Answer with the summary only.";
pub const DESCRIBE_SYSTEM: &str =
    "You describe still frames taken from a video. Be factual and specific.";
pub const TOPICS_SYSTEM: &str = "You identify the main topics of a video.";

/// Sentence telling the model which language to answer in.
///
/// `None` for [`Language::Infer`]: the model picks the language itself.
pub fn language_instruction(language: Language) -> Option<String> {
    language
        .display_name()
        .map(|name| format!("Your response must be in {}.", name))
}

fn with_language(mut prompt: String, language: Language) -> String {
    if let Some(instruction) = language_instruction(language) {
        prompt.push(' ');
        prompt.push_str(&instruction);
    }
    prompt
}

/// Prompt for summarizing a transcript.
pub fn transcript_summary(text: &str, style: SummaryStyle, language: Language) -> String {
    let head = format!(
        "Summarize the following transcript in a {} way, using about {} words.",
        style.as_str(),
        style.target_words()
    );
    let head = with_language(head, language);
    format!(
        "{} Provide the result without introductions.\n\nTranscript:\n{}",
        head, text
    )
}

/// Instructions placed before the labelled frames.
pub fn describe_frames(count: usize, language: Language) -> String {
    let head = format!(
        "Describe each of the following {} video frames in one or two sentences. \
         Frames are labelled with a 0-based index. Return exactly one entry per frame, \
         using that index as frame_index.",
        count
    );
    with_language(head, language)
}

/// Label preceding the image with the given index.
pub fn frame_label(index: usize) -> String {
    format!("Frame {}:", index)
}

fn numbered_descriptions(descriptions: &[String]) -> String {
    if descriptions.is_empty() {
        return "(no keyframes)".to_string();
    }
    descriptions
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{}. {}", i, d))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for a summary of the whole video from transcript and frames.
pub fn holistic_summary(
    text: &str,
    descriptions: &[String],
    style: SummaryStyle,
    language: Language,
) -> String {
    let head = format!(
        "Summarize the whole video in a {} way, using about {} words, combining what is said \
         in the transcript with what is shown in the keyframes.",
        style.as_str(),
        style.target_words()
    );
    let head = with_language(head, language);
    format!(
        "{} Provide the result without introductions.\n\nTranscript:\n{}\n\nKeyframes:\n{}",
        head,
        text,
        numbered_descriptions(descriptions)
    )
}

/// Prompt for topic extraction.
pub fn topics(text: &str, descriptions: &[String], language: Language) -> String {
    let head = format!(
        "List the main topics of this video, {} topics at most, each a short phrase.",
        MAX_TOPICS
    );
    let head = with_language(head, language);
    format!(
        "{}\n\nTranscript:\n{}\n\nKeyframes:\n{}",
        head,
        text,
        numbered_descriptions(descriptions)
    )
}
