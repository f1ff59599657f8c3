//! Character-window chunker that snaps to paragraph, sentence and word
//! boundaries.
//!
//! # Boundary rule
//!
//! For a window starting at `start` with `end_max = start + chunk_size`:
//!
//! 1. If the rest of the text fits, it becomes the final chunk.
//! 2. Break points must lie in `(start + overlap, end_max]` so every chunk
//!    moves past the overlap it inherited.
//! 3. Paragraph breaks and sentence ends in the second half of the window are
//!    preferred; the one closest to `end_max` wins, and a paragraph break wins
//!    an exact tie.
//! 4. Otherwise the chunk ends at the last whitespace in range.
//! 5. Otherwise the chunk ends at the last whitespace after `start`, giving
//!    up part of the overlap instead of splitting a word.
//! 6. Otherwise (one token longer than the window) it is cut at `end_max`.
//!
//! The next chunk starts `overlap` characters before the previous end, but
//! never before `start + 1`, and moves forward to the next word start.

use super::ChunkingConfig;
use crate::course::{CourseChunk, ParsedDocument};
use crate::error::Result;
use tracing::debug;

/// Splits text into overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    /// Create a chunker, rejecting an overlap that is not smaller than the
    /// chunk size.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Split a block of text into chunks. Blank text yields no chunks.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.trim().chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let size = self.config.chunk_size;
        let overlap = self.config.overlap;

        if chars.len() <= size {
            return vec![chars.iter().collect()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end_max = start + size;
            if end_max >= chars.len() {
                push_trimmed(&mut chunks, &chars[start..]);
                break;
            }

            let end = find_break(&chars, start, end_max, overlap, size);
            push_trimmed(&mut chunks, &chars[start..end]);

            start = next_start(&chars, start, end, overlap);
            while start < chars.len() && chars[start].is_whitespace() {
                start += 1;
            }
            if start >= chars.len() {
                break;
            }
        }

        chunks
    }

    /// Chunk every section of a parsed document.
    ///
    /// Chunk indices are contiguous across the course. The first chunk of
    /// each section carries a course/lesson prefix.
    pub fn chunk_document(&self, doc: &ParsedDocument) -> Vec<CourseChunk> {
        let title = &doc.course.title;
        let mut chunks = Vec::new();
        let mut chunk_index = 0u32;

        for section in &doc.sections {
            let prefix = match section.lesson_number {
                Some(n) => format!("Course {} Lesson {} content: ", title, n),
                None => format!("Course {} content: ", title),
            };

            for (i, piece) in self.chunk_text(&section.text).into_iter().enumerate() {
                let content = if i == 0 {
                    format!("{}{}", prefix, piece)
                } else {
                    piece
                };

                chunks.push(CourseChunk {
                    course_title: title.clone(),
                    lesson_number: section.lesson_number,
                    chunk_index,
                    content,
                });
                chunk_index += 1;
            }
        }

        debug!("Chunked '{}' into {} chunks", title, chunks.len());
        chunks
    }
}

fn push_trimmed(chunks: &mut Vec<String>, window: &[char]) {
    let text: String = window.iter().collect();
    let text = text.trim();
    if !text.is_empty() {
        chunks.push(text.to_string());
    }
}

fn is_paragraph_break(chars: &[char], at: usize) -> bool {
    chars[at] == '\n' && chars.get(at + 1) == Some(&'\n')
}

fn is_sentence_end(chars: &[char], at: usize) -> bool {
    at > 0 && matches!(chars[at - 1], '.' | '!' | '?') && chars[at].is_whitespace()
}

/// Pick the end (exclusive) of the chunk starting at `start`.
fn find_break(chars: &[char], start: usize, end_max: usize, overlap: usize, size: usize) -> usize {
    let lo = start + overlap + 1;
    let preferred_lo = lo.max(start + size / 2);

    for at in (preferred_lo..=end_max).rev() {
        if is_paragraph_break(chars, at) || is_sentence_end(chars, at) {
            return at;
        }
    }

    if let Some(at) = last_whitespace(chars, lo, end_max) {
        return at;
    }

    last_whitespace(chars, start + 1, end_max).unwrap_or(end_max)
}

fn last_whitespace(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    (lo..=hi).rev().find(|&at| chars[at].is_whitespace())
}

/// Start of the next chunk: `overlap` characters back from `end`, at least
/// one past `start`, moved forward out of any partial word.
fn next_start(chars: &[char], start: usize, end: usize, overlap: usize) -> usize {
    let mut at = end.saturating_sub(overlap).max(start + 1);
    if at == 0 || chars[at - 1].is_whitespace() {
        return at;
    }
    while at < end && !chars[at].is_whitespace() {
        at += 1;
    }
    at
}
