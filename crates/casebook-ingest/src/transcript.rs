//! Dialogue transcript parsing.
//!
//! Raw transcripts arrive as `Speaker: text` lines (chat exports, call
//! transcriptions). Lines without a speaker label attach to the previous
//! speaker's turn.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One speaker turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: String,
    pub content: String,
    pub is_question: bool,
}

/// A parsed conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialogue {
    pub participants: Vec<String>,
    pub turns: Vec<Turn>,
}

/// Collapse blank-line spacing so a transcript grounds the model as one
/// compact block.
pub fn normalize_transcript(text: &str) -> String {
    let mut text = text.replace("\r\n", "\n");
    while text.contains("\n\n") {
        text = text.replace("\n\n", "\n");
    }
    text.trim().to_string()
}

/// Parse `Speaker: text` turns out of a raw transcript.
pub fn parse_dialogue(text: &str) -> Dialogue {
    let label = Regex::new(r"^([A-Za-z][A-Za-z0-9 _.-]{0,40}?)\s*:\s*(.*)$").expect("valid regex");

    let mut turns: Vec<Turn> = Vec::new();
    let mut participants: Vec<String> = Vec::new();
    let mut current_speaker = String::new();
    let mut current_content = String::new();

    let flush = |speaker: &str, content: &str, turns: &mut Vec<Turn>| {
        let content = content.trim();
        if !speaker.is_empty() && !content.is_empty() {
            turns.push(Turn {
                speaker: speaker.to_string(),
                content: content.to_string(),
                is_question: content.ends_with('?'),
            });
        }
    };

    for line in text.lines() {
        if let Some(caps) = label.captures(line.trim()) {
            flush(&current_speaker, &current_content, &mut turns);
            current_speaker = caps[1].trim().to_string();
            current_content = caps[2].to_string();
            if !participants.contains(&current_speaker) {
                participants.push(current_speaker.clone());
            }
        } else if !current_speaker.is_empty() {
            current_content.push(' ');
            current_content.push_str(line.trim());
        }
    }
    flush(&current_speaker, &current_content, &mut turns);

    Dialogue {
        participants,
        turns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labelled_turns() {
        let text = "\
Agent: Thanks for calling, how can I help?
Customer: My order A-1009 never arrived.
Agent: I'm sorry about that, let me check.";
        let dialogue = parse_dialogue(text);
        assert_eq!(dialogue.participants, vec!["Agent", "Customer"]);
        assert_eq!(dialogue.turns.len(), 3);
        assert!(dialogue.turns[0].is_question);
        assert_eq!(dialogue.turns[1].content, "My order A-1009 never arrived.");
    }

    #[test]
    fn continuation_lines_attach_to_previous_turn() {
        let text = "\
Customer: The package was supposed to arrive Monday
and it still has not shown up.";
        let dialogue = parse_dialogue(text);
        assert_eq!(dialogue.turns.len(), 1);
        assert!(dialogue.turns[0].content.ends_with("has not shown up."));
    }

    #[test]
    fn normalize_collapses_blank_lines() {
        let text = "Agent: hi\r\n\r\n\r\nCustomer: hello\n\n";
        assert_eq!(normalize_transcript(text), "Agent: hi\nCustomer: hello");
    }
}
