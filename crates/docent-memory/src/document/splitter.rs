use super::types::{Chunk, Document};

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Candidate cut points, coarsest first. A hard character cut is the
    /// implicit terminal strategy, so splitting always converges.
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: vec!["\n\n".to_owned(), "\n".to_owned(), " ".to_owned()],
        }
    }
}

/// Splits a document into chunks of at most `chunk_size` characters, with
/// exactly `chunk_overlap` characters shared between consecutive chunks.
///
/// Every chunk is a contiguous character span of the source text, so
/// concatenating the first chunk with each later chunk's non-overlapping
/// suffix reconstructs the document exactly.
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.content.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let chunk_size = self.config.chunk_size.max(1);
        let overlap = self.config.chunk_overlap.min(chunk_size - 1);

        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            let window_end = (start + chunk_size).min(chars.len());
            if window_end == chars.len() {
                spans.push((start, chars.len()));
                break;
            }
            let end = self.cut_point(&chars, start, window_end, overlap);
            spans.push((start, end));
            start = end - overlap;
        }

        spans
            .into_iter()
            .enumerate()
            .map(|(i, (s, e))| Chunk {
                content: chars[s..e].iter().collect(),
                metadata: document.metadata.clone(),
                chunk_index: i,
            })
            .collect()
    }

    /// Pick where the chunk starting at `start` ends. Tries the latest
    /// occurrence of each separator (coarsest first) within the window; any
    /// cut must leave the next start past `start`, so candidates at or before
    /// `start + overlap` are rejected. Falls back to the full window: a hard
    /// character cut.
    fn cut_point(&self, chars: &[char], start: usize, window_end: usize, overlap: usize) -> usize {
        let min_end = start + overlap + 1;
        for sep in &self.config.separators {
            if let Some(end) = last_separator_end(chars, min_end, window_end, sep) {
                return end;
            }
        }
        window_end
    }
}

/// Latest `end` in `[min_end, window_end]` where `sep` immediately precedes
/// `end`, i.e. the chunk would close just after the separator.
fn last_separator_end(chars: &[char], min_end: usize, window_end: usize, sep: &str) -> Option<usize> {
    let sep_chars: Vec<char> = sep.chars().collect();
    if sep_chars.is_empty() || window_end < min_end {
        return None;
    }

    let mut end = window_end;
    while end >= min_end && end >= sep_chars.len() {
        if chars[end - sep_chars.len()..end] == sep_chars[..] {
            return Some(end);
        }
        end -= 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::types::DocumentMetadata;

    fn make_doc(content: &str) -> Document {
        Document {
            content: content.to_owned(),
            metadata: DocumentMetadata {
                source: "test".to_owned(),
                content_type: "text/plain".to_owned(),
                page: None,
            },
        }
    }

    fn reassemble(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let chars: Vec<char> = chunk.content.chars().collect();
            let skip = if i == 0 { 0 } else { overlap };
            out.extend(&chars[skip..]);
        }
        out
    }

    #[test]
    fn empty_document() {
        let splitter = TextSplitter::new(SplitterConfig::default());
        assert!(splitter.split(&make_doc("")).is_empty());
    }

    #[test]
    fn document_smaller_than_chunk_size() {
        let splitter = TextSplitter::new(SplitterConfig::default());
        let chunks = splitter.split(&make_doc("Short text."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Short text.");
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn prefers_paragraph_break_over_word_break() {
        let text = "first paragraph here.\n\nsecond part continues with more words";
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 30,
            chunk_overlap: 0,
            ..SplitterConfig::default()
        });
        let chunks = splitter.split(&make_doc(text));
        assert!(chunks[0].content.ends_with("\n\n"));
    }

    #[test]
    fn falls_back_to_word_break() {
        let text = "no paragraph breaks just a single long run of words in here";
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 20,
            chunk_overlap: 0,
            ..SplitterConfig::default()
        });
        let chunks = splitter.split(&make_doc(text));
        assert!(chunks.len() > 1);
        assert!(chunks[0].content.ends_with(' '));
    }

    #[test]
    fn hard_cut_when_no_separator_fits() {
        let text = "a".repeat(25);
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 10,
            chunk_overlap: 0,
            ..SplitterConfig::default()
        });
        let chunks = splitter.split(&make_doc(&text));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content.len(), 10);
        assert_eq!(chunks[2].content.len(), 5);
    }

    #[test]
    fn exact_overlap_between_consecutive_chunks() {
        let text = "word ".repeat(100);
        let overlap = 12;
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 60,
            chunk_overlap: overlap,
            ..SplitterConfig::default()
        });
        let chunks = splitter.split(&make_doc(&text));
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].content.chars().collect();
            let next: Vec<char> = pair[1].content.chars().collect();
            assert_eq!(prev[prev.len() - overlap..], next[..overlap]);
        }
    }

    #[test]
    fn reassembly_reproduces_source_text() {
        let text = "Lorem ipsum dolor sit amet.\n\nConsectetur adipiscing elit. ".repeat(10);
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 80,
            chunk_overlap: 20,
            ..SplitterConfig::default()
        });
        let chunks = splitter.split(&make_doc(&text));
        assert_eq!(reassemble(&chunks, 20), text);
    }

    #[test]
    fn metadata_and_indices_carried_to_chunks() {
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 10,
            chunk_overlap: 2,
            ..SplitterConfig::default()
        });
        let chunks = splitter.split(&make_doc(&"x ".repeat(30)));
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.metadata.source, "test");
        }
    }

    #[test]
    fn fifteen_hundred_chars_at_default_config() {
        let text: String = "Alpha Beta Gamma ".repeat(100).chars().take(1500).collect();
        assert_eq!(text.chars().count(), 1500);

        let splitter = TextSplitter::new(SplitterConfig::default());
        let chunks = splitter.split(&make_doc(&text));

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 1000);
        }
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].content.chars().collect();
            let next: Vec<char> = pair[1].content.chars().collect();
            assert_eq!(prev[prev.len() - 200..], next[..200]);
        }
        assert_eq!(reassemble(&chunks, 200), text);
    }

    #[test]
    fn overlap_larger_than_chunk_size_still_converges() {
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 5,
            chunk_overlap: 50,
            ..SplitterConfig::default()
        });
        let chunks = splitter.split(&make_doc("abcdefghijklmnop"));
        assert!(!chunks.is_empty());
    }

    mod proptest_splitter {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn split_never_panics(
                content in "\\PC{0,2000}",
                chunk_size in 1usize..500,
                chunk_overlap in 0usize..300,
            ) {
                let splitter = TextSplitter::new(SplitterConfig {
                    chunk_size,
                    chunk_overlap,
                    ..SplitterConfig::default()
                });
                let _ = splitter.split(&make_doc(&content));
            }

            #[test]
            fn chunks_respect_size_bound(
                content in "[a-z \\n]{0,1500}",
                chunk_size in 1usize..200,
                chunk_overlap in 0usize..100,
            ) {
                let splitter = TextSplitter::new(SplitterConfig {
                    chunk_size,
                    chunk_overlap,
                    ..SplitterConfig::default()
                });
                let chunks = splitter.split(&make_doc(&content));
                for chunk in &chunks {
                    prop_assert!(chunk.content.chars().count() <= chunk_size);
                }
            }

            #[test]
            fn reassembly_is_lossless(
                content in "\\PC{0,1500}",
                chunk_size in 2usize..200,
                chunk_overlap in 0usize..100,
            ) {
                let effective_overlap = chunk_overlap.min(chunk_size.max(1) - 1);
                let splitter = TextSplitter::new(SplitterConfig {
                    chunk_size,
                    chunk_overlap,
                    ..SplitterConfig::default()
                });
                let chunks = splitter.split(&make_doc(&content));
                prop_assert_eq!(reassemble(&chunks, effective_overlap), content);
            }

            #[test]
            fn chunk_indices_sequential(
                content in "[a-z. ]{0,800}",
                chunk_size in 5usize..100,
            ) {
                let splitter = TextSplitter::new(SplitterConfig {
                    chunk_size,
                    chunk_overlap: 0,
                    ..SplitterConfig::default()
                });
                let chunks = splitter.split(&make_doc(&content));
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert_eq!(chunk.chunk_index, i);
                }
            }
        }
    }
}
