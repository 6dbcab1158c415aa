//! Overlapping window text chunker.
//!
//! Splits each row's flattened text into windows of at most `chunk_size`
//! characters, each starting `chunk_overlap` characters before the previous
//! one ended. A window that would end mid-text is pulled back to the last
//! whitespace it contains so words are not cut, unless that would leave it
//! no longer than the overlap.
//!
//! Windows are produced lazily by [`TextWindows`]; the iterator is `Clone`,
//! so a sequence can be restarted from any point without re-splitting.

use crate::config::ChunkingConfig;
use crate::models::{Chunk, RowRecord};

/// Window size and overlap, in characters.
#[derive(Debug, Clone, Copy)]
pub struct Splitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Splitter {
    /// `chunk_overlap` is clamped below `chunk_size` and `chunk_size` to at least 1.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn split<'a>(&self, text: &'a str) -> TextWindows<'a> {
        TextWindows {
            text,
            boundaries: text
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(text.len()))
                .collect(),
            start: 0,
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            done: text.is_empty(),
        }
    }
}

impl Default for Splitter {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Lazy iterator over the windows of one text.
#[derive(Debug, Clone)]
pub struct TextWindows<'a> {
    text: &'a str,
    /// Byte offset of every char start, plus `text.len()`.
    boundaries: Vec<usize>,
    /// Current window start, in chars.
    start: usize,
    chunk_size: usize,
    chunk_overlap: usize,
    done: bool,
}

impl<'a> TextWindows<'a> {
    fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    fn slice(&self, from: usize, to: usize) -> &'a str {
        &self.text[self.boundaries[from]..self.boundaries[to]]
    }

    /// Window end (in chars) for a window starting at `self.start`.
    fn window_end(&self) -> usize {
        let len = self.char_len();
        let hard_end = (self.start + self.chunk_size).min(len);
        if hard_end == len {
            return hard_end;
        }
        let window = self.slice(self.start, hard_end);
        let min_len = self.chunk_overlap + 1;
        window
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(byte_pos, _)| window[..byte_pos].chars().count() + 1)
            .filter(|&chars| chars > min_len)
            .map(|chars| self.start + chars)
            .unwrap_or(hard_end)
    }
}

impl<'a> Iterator for TextWindows<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }
        let end = self.window_end();
        let piece = self.slice(self.start, end);
        if end >= self.char_len() {
            self.done = true;
        } else {
            // end > start + overlap, so the window always advances
            self.start = end - self.chunk_overlap;
        }
        Some(piece)
    }
}

/// Chunk every row, tagging each window with a copy of its row's metadata.
pub fn chunk_rows<'a>(
    rows: &'a [RowRecord],
    splitter: &Splitter,
) -> impl Iterator<Item = Chunk> + Clone + 'a {
    let splitter = *splitter;
    rows.iter().enumerate().flat_map(move |(row_index, row)| {
        splitter
            .split(&row.text)
            .enumerate()
            .map(move |(window_index, text)| Chunk {
                row_index,
                window_index,
                text: text.to_string(),
                metadata: row.metadata.clone(),
            })
    })
}
