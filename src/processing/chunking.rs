//! Recursive character splitting with bounded chunks and controlled overlap.
//!
//! The splitter works in two phases:
//!
//! 1. Recursively break the text into fragments no longer than `target_size`
//!    characters, trying separators from coarsest to finest (paragraph break,
//!    sentence break, word boundary) with a character-level fallback that
//!    always terminates. Separators stay attached to the preceding fragment,
//!    so concatenating fragments reproduces the input exactly.
//! 2. Greedily merge adjacent fragments up to `target_size`; whenever a chunk
//!    boundary is finalized, the next chunk is seeded with the trailing
//!    `overlap` characters of the previous chunk so context survives the cut.
//!
//! The function is pure: identical inputs always produce identical chunks.

use super::types::ChunkingError;

/// Separators tried in priority order before the character fallback.
const SEPARATORS: [&str; 3] = ["\n\n", ". ", " "];

/// Split `text` into ordered, non-empty chunks of at most `target_size`
/// characters (overlap seeds may push a chunk slightly past the budget when a
/// single fragment is near the limit).
///
/// Returns an empty vector for empty input. An input shorter than
/// `target_size` yields exactly one chunk equal to the whole input.
pub fn split_text(
    text: &str,
    target_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if target_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let fragments = split_recursive(text, target_size, &SEPARATORS);
    Ok(merge_fragments(fragments, target_size, overlap))
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Break text into fragments of at most `target_size` characters, trying the
/// coarsest separator first and re-splitting oversized pieces with the next
/// separator in priority order.
fn split_recursive(text: &str, target_size: usize, separators: &[&str]) -> Vec<String> {
    if char_len(text) <= target_size {
        return vec![text.to_string()];
    }

    let Some((separator, finer)) = separators.split_first() else {
        return split_characters(text, target_size);
    };

    let mut fragments = Vec::new();
    for piece in text.split_inclusive(*separator) {
        if char_len(piece) > target_size {
            fragments.extend(split_recursive(piece, target_size, finer));
        } else {
            fragments.push(piece.to_string());
        }
    }
    fragments
}

/// Character-level fallback: fixed-size slices on char boundaries.
fn split_characters(text: &str, target_size: usize) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == target_size {
            fragments.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }
    fragments
}

/// Greedily merge fragments into chunks, seeding each new chunk with the
/// trailing `overlap` characters of the previous one.
fn merge_fragments(fragments: Vec<String>, target_size: usize, overlap: usize) -> Vec<String> {
    let overlap = overlap.min(target_size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut seed_len = 0;
    let mut body_len = 0;

    for fragment in fragments {
        let fragment_len = char_len(&fragment);
        if body_len > 0 && seed_len + body_len + fragment_len > target_size {
            let seed = overlap_tail(&current, overlap).to_string();
            chunks.push(std::mem::replace(&mut current, seed));
            seed_len = char_len(&current);
            body_len = 0;
        }
        current.push_str(&fragment);
        body_len += fragment_len;
    }

    if body_len > 0 {
        chunks.push(current);
    }
    chunks
}

/// Trailing `overlap` characters of `text`, on a char boundary.
fn overlap_tail(text: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    let total = char_len(text);
    if total <= overlap {
        return text;
    }
    let start = text
        .char_indices()
        .nth(total - overlap)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_yields_one_chunk_equal_to_input() {
        let text = "a".repeat(50);
        let chunks = split_text(&text, 600, 100).expect("chunking succeeded");
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks = split_text("", 600, 100).expect("chunking succeeded");
        assert!(chunks.is_empty());
    }

    #[test]
    fn rejects_zero_target_size() {
        let error = split_text("hello", 0, 0).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn concatenation_reconstructs_input_without_overlap() {
        let text = "First paragraph about storage.\n\nSecond paragraph goes further. \
                    It has two sentences. Third paragraph closes the argument with \
                    several words strung together for length.";
        let chunks = split_text(text, 40, 0).expect("chunking succeeded");
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.chars().count() <= 40);
        }
    }

    #[test]
    fn overlap_seeds_next_chunk_with_previous_tail() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let overlap = 8;
        let chunks = split_text(text, 20, overlap).expect("chunking succeeded");
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let seed = overlap_tail(&pair[0], overlap);
            assert!(
                pair[1].starts_with(seed),
                "chunk {:?} does not start with seed {:?}",
                pair[1],
                seed
            );
        }
    }

    #[test]
    fn stripping_overlap_seeds_reconstructs_input() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let overlap = 6;
        let chunks = split_text(text, 24, overlap).expect("chunking succeeded");
        assert!(chunks.len() > 1);

        let mut rebuilt = chunks[0].clone();
        for pair in chunks.windows(2) {
            let seed = overlap_tail(&pair[0], overlap);
            rebuilt.push_str(&pair[1][seed.len()..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn unbroken_run_falls_back_to_character_splitting() {
        let text = "x".repeat(45);
        let chunks = split_text(&text, 10, 0).expect("chunking succeeded");
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
    }

    #[test]
    fn prefers_paragraph_breaks_over_finer_separators() {
        let text = "short one\n\nshort two\n\nshort three";
        let chunks = split_text(text, 12, 0).expect("chunking succeeded");
        assert_eq!(chunks, vec!["short one\n\n", "short two\n\n", "short three"]);
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = "Determinism matters. The same input must always yield the same chunks. \
                    Otherwise re-ingestion would scatter vectors.";
        let first = split_text(text, 30, 5).expect("chunking succeeded");
        let second = split_text(text, 30, 5).expect("chunking succeeded");
        assert_eq!(first, second);
    }

    #[test]
    fn multibyte_input_splits_on_char_boundaries() {
        let text = "äöü ".repeat(20);
        let chunks = split_text(&text, 10, 3).expect("chunking succeeded");
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.is_empty());
        }
    }
}
