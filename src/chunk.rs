//! Recursive separator-based text chunker with overlap.
//!
//! Splits page text into [`Chunk`]s that respect a `chunk_size` limit.
//! Splitting walks an ordered separator list (paragraph break, line
//! break, sentence period, space, character level): the chunker cuts at
//! the coarsest separator whose pieces fit, and recurses into oversized
//! pieces with the finer separators. Adjacent chunks within a page
//! share up to `chunk_overlap` trailing/leading characters, aligned to
//! separator boundaries when possible.
//!
//! Each chunk inherits its page's provenance metadata, extended with a
//! per-page sequence number, and receives a UUID plus a SHA-256 hash of
//! its text.
//!
//! # Guarantees
//!
//! - No chunk exceeds `chunk_size` bytes.
//! - Every chunk is a non-empty contiguous substring of the page text.
//! - Dropping each chunk's overlap prefix and concatenating the rest
//!   reconstructs the page text exactly.
//! - Deterministic: identical input and configuration yield the same
//!   chunk sequence (chunk UUIDs aside).
//! - An empty page yields no chunks; a page within `chunk_size` yields
//!   exactly one.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::models::{Chunk, ChunkMetadata, Page};

/// Split a sequence of pages into chunks using the given configuration.
///
/// Chunk sequence numbers restart at 0 on each page.
pub fn split_pages(pages: &[Page], config: &ChunkingConfig) -> Vec<Chunk> {
    let separators: Vec<&str> = config.separators.iter().map(String::as_str).collect();
    let mut chunks = Vec::new();

    for page in pages {
        let pieces = split_text(
            &page.text,
            config.chunk_size,
            config.chunk_overlap,
            &separators,
        );
        for (chunk_index, text) in pieces.into_iter().enumerate() {
            chunks.push(make_chunk(page, chunk_index, text));
        }
    }

    chunks
}

/// Split raw text into overlapping pieces of at most `chunk_size` bytes.
///
/// `separators` are tried in order; an empty separator means
/// character-level splitting and is always used as the final fallback
/// even when absent from the list.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let units = split_units(text, chunk_size, separators);
    merge_units(units, chunk_size, overlap)
}

/// Recursively cut `text` into ordered units of at most `chunk_size`
/// bytes. Each unit keeps its trailing separator so that concatenating
/// all units reproduces `text`.
fn split_units(text: &str, chunk_size: usize, separators: &[&str]) -> Vec<String> {
    let (sep, rest) = match separators.split_first() {
        Some((sep, rest)) => (*sep, rest),
        None => ("", &[][..]),
    };

    if sep.is_empty() {
        return char_slices(text, chunk_size);
    }

    let mut units = Vec::new();
    for piece in split_keeping_separator(text, sep) {
        if piece.len() <= chunk_size {
            units.push(piece);
        } else {
            units.extend(split_units(&piece, chunk_size, rest));
        }
    }
    units
}

/// Split on `sep`, retaining the separator at the end of each piece.
fn split_keeping_separator(text: &str, sep: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(sep) {
        let end = start + pos + sep.len();
        pieces.push(text[start..end].to_string());
        start = end;
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }

    pieces
}

/// Hard-split into consecutive slices of at most `chunk_size` bytes,
/// snapped to UTF-8 character boundaries. Always advances by at least
/// one character.
fn char_slices(text: &str, chunk_size: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size.max(1)).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            end = text[start..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| start + i)
                .unwrap_or(text.len());
        }
        out.push(text[start..end].to_string());
        start = end;
    }

    out
}

/// Greedily merge units into chunks, carrying a separator-aligned
/// overlap of at most `overlap` bytes from each emitted chunk into the
/// next.
fn merge_units(units: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf: Vec<String> = Vec::new();
    let mut buf_len = 0;

    for unit in units {
        if buf_len + unit.len() > chunk_size && !buf.is_empty() {
            chunks.push(buf.concat());

            let (mut kept, mut kept_len) = overlap_tail(&buf, overlap);
            // Keep the hard size bound: shed overlap from the front if
            // the incoming unit would not fit next to it.
            while kept_len + unit.len() > chunk_size && !kept.is_empty() {
                let removed = kept.remove(0);
                kept_len -= removed.len();
            }
            buf = kept;
            buf_len = kept_len;
        }

        buf_len += unit.len();
        buf.push(unit);
    }

    // The final buffer always ends in at least one fresh unit, so it
    // never duplicates the previous chunk's tail.
    if !buf.is_empty() {
        chunks.push(buf.concat());
    }

    chunks
}

/// Trailing units of `buf` totalling at most `overlap` bytes. When even
/// the last unit is too large, fall back to a raw character tail of the
/// final unit.
fn overlap_tail(buf: &[String], overlap: usize) -> (Vec<String>, usize) {
    let mut kept: Vec<String> = Vec::new();
    let mut kept_len = 0;

    for unit in buf.iter().rev() {
        if kept_len + unit.len() > overlap {
            break;
        }
        kept_len += unit.len();
        kept.push(unit.clone());
    }
    kept.reverse();

    if kept.is_empty() && overlap > 0 {
        if let Some(last) = buf.last() {
            let tail = char_tail(last, overlap);
            if !tail.is_empty() {
                kept_len = tail.len();
                kept.push(tail.to_string());
            }
        }
    }

    (kept, kept_len)
}

/// The last at-most-`len` bytes of `s`, snapped to a char boundary.
fn char_tail(s: &str, len: usize) -> &str {
    if s.len() <= len {
        return s;
    }
    let mut start = s.len() - len;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

fn make_chunk(page: &Page, chunk_index: usize, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        text,
        metadata: ChunkMetadata {
            source: page.metadata.source.clone(),
            page_index: page.metadata.page_index,
            chunk_index,
        },
        hash,
    }
}
