//! Transcript acquisition and parsing.
//!
//! A transcript source owns ordering and batching; callers just ask for the
//! next bounded batch of raw text. Parsing is deliberately tolerant — real
//! chat exports are messy — and nothing here talks to the model or the store.

mod source;
mod transcript;

pub use source::{DirSource, MemorySource, TranscriptSource};
pub use transcript::{normalize_transcript, parse_dialogue, Dialogue, Turn};
