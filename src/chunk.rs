//! Word-window text chunker.
//!
//! Splits document text into overlapping [`Chunk`]s of a fixed word count.
//! Splitting is purely on whitespace word boundaries; each window advances
//! by `chunk_words - overlap_words` so consecutive chunks share an overlap
//! and no mention is lost at a window edge.
//!
//! The function is pure: empty text yields no chunks, text shorter than one
//! window yields exactly one, and the final chunk may be shorter than the
//! nominal size.

use crate::models::Chunk;

/// Split `text` into overlapping windows of `chunk_words` words.
/// Returns chunks with contiguous indices starting at 0.
///
/// Callers must ensure `overlap_words < chunk_words` (enforced by config
/// validation); equal or larger overlaps would never advance.
pub fn chunk_text(text: &str, chunk_words: usize, overlap_words: usize) -> Vec<Chunk> {
    debug_assert!(chunk_words > 0 && overlap_words < chunk_words);

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let step = chunk_words - overlap_words;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_words).min(words.len());
        chunks.push(Chunk {
            index: chunks.len(),
            text: words[start..end].join(" "),
        });
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_count(chunk: &Chunk) -> usize {
        chunk.text.split_whitespace().count()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 400, 50).is_empty());
        assert!(chunk_text("   \n\t ", 400, 50).is_empty());
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunks = chunk_text("just a few words here", 400, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "just a few words here");
    }

    #[test]
    fn final_chunk_may_be_short() {
        let text = (0..10).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 4, 1);
        let last = chunks.last().unwrap();
        assert!(word_count(last) <= 4);
        assert!(last.text.ends_with("w9"));
    }

    #[test]
    fn chunk_count_matches_formula() {
        // count = ceil((N - overlap) / (chunk - overlap)), min 1
        for (n, chunk, overlap) in [(10usize, 4usize, 2usize), (100, 30, 10), (7, 7, 3), (8, 7, 3), (1, 5, 2)] {
            let text = (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
            let chunks = chunk_text(&text, chunk, overlap);
            let step = chunk - overlap;
            let expected = if n <= chunk {
                1
            } else {
                (n - overlap + step - 1) / step
            };
            assert_eq!(chunks.len(), expected, "N={} chunk={} overlap={}", n, chunk, overlap);
        }
    }

    #[test]
    fn indices_are_contiguous() {
        let text = (0..57).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 10, 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }

    #[test]
    fn non_overlapping_tails_reconstruct_original() {
        let text = (0..53).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let overlap = 4;
        let chunks = chunk_text(&text, 12, overlap);

        // Each chunk repeats the previous window's tail; dropping the words
        // already rebuilt must reconstruct the exact original sequence.
        let mut rebuilt: Vec<String> = Vec::new();
        for c in &chunks {
            let words: Vec<&str> = c.text.split_whitespace().collect();
            let already = words
                .iter()
                .position(|w| w[1..].parse::<usize>().unwrap() == rebuilt.len())
                .unwrap_or(words.len());
            assert!(
                already == 0 || already == overlap,
                "chunks overlap by exactly the configured word count"
            );
            rebuilt.extend(words[already..].iter().map(|w| w.to_string()));
        }
        assert_eq!(rebuilt.join(" "), text);
    }

    #[test]
    fn consecutive_chunks_share_overlap() {
        let text = (0..40).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 10, 3);
        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].text.split_whitespace().collect();
            let next: Vec<&str> = pair[1].text.split_whitespace().collect();
            if next.len() >= 3 {
                assert_eq!(&prev[prev.len() - 3..], &next[..3]);
            }
        }
    }

    #[test]
    fn deterministic() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let a = chunk_text(text, 4, 1);
        let b = chunk_text(text, 4, 1);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.text, y.text);
        }
    }
}
