//! Fixed-size word chunking.

use std::num::NonZeroUsize;

use crate::types::Chunk;

pub const DEFAULT_WORDS_PER_CHUNK: usize = 250;

/// Split `text` into chunks of exactly `size` words; the last chunk holds the
/// remainder.
///
/// Words are separated by spaces and newlines only. Runs of those two
/// characters collapse, any other whitespace (tabs, carriage returns) stays
/// part of a word. Empty text yields no chunks.
pub fn chunk(text: &str, size: NonZeroUsize) -> Vec<Chunk> {
    let words: Vec<&str> = text.split([' ', '\n']).filter(|w| !w.is_empty()).collect();
    words
        .chunks(size.get())
        .enumerate()
        .map(|(id, group)| Chunk { id, text: group.join(" ") })
        .collect()
}
