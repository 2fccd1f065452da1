use super::types::{Chunk, PageText};
use anyhow::{Context, Result};
use text_splitter::{Characters, ChunkConfig, TextSplitter};

/// Sliding-window splitter measured in characters. Prefers paragraph, sentence,
/// then word boundaries, and repeats up to `chunk_overlap` characters between
/// neighbouring chunks.
pub struct Chunker {
    splitter: TextSplitter<Characters>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let chunk_config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .with_context(|| {
                format!(
                    "Invalid chunking config: size {} overlap {}",
                    chunk_size, chunk_overlap
                )
            })?;
        Ok(Self {
            splitter: TextSplitter::new(chunk_config),
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_text(&self, text: &str) -> Vec<Chunk> {
        self.splitter
            .chunks(text)
            .enumerate()
            .map(|(index, chunk)| Chunk {
                index,
                text: chunk.to_string(),
                page: None,
            })
            .collect()
    }

    /// Splits each page on its own so every chunk keeps its page number.
    pub fn split_pages(&self, pages: &[PageText]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in pages {
            for chunk in self.splitter.chunks(&page.text) {
                chunks.push(Chunk {
                    index: chunks.len(),
                    text: chunk.to_string(),
                    page: Some(page.page_number),
                });
            }
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text(words: usize) -> String {
        (0..words)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        assert!(Chunker::new(100, 100).is_err());
        assert!(Chunker::new(100, 150).is_err());
        assert!(Chunker::new(100, 20).is_ok());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = Chunker::new(1000, 200).unwrap();
        let chunks = chunker.split_text("Rust is a systems programming language.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].page, None);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        let chunker = Chunker::new(1000, 200).unwrap();
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let chunker = Chunker::new(60, 20).unwrap();
        let chunks = chunker.split_text(&long_text(100));

        assert!(chunks.len() > 2);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 60, "chunk too long: {:?}", chunk.text);
        }
        for pair in chunks.windows(2) {
            let first_word = pair[1].text.split_whitespace().next().unwrap();
            assert!(
                pair[0].text.contains(first_word),
                "expected {:?} to repeat the start of {:?}",
                pair[0].text,
                pair[1].text
            );
        }
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn page_chunks_carry_page_numbers() {
        let chunker = Chunker::new(60, 10).unwrap();
        let pages = vec![
            PageText {
                page_number: 1,
                text: "First page text.".to_string(),
            },
            PageText {
                page_number: 3,
                text: long_text(30),
            },
        ];

        let chunks = chunker.split_pages(&pages);

        assert_eq!(chunks[0].page, Some(1));
        assert!(chunks[1..].iter().all(|c| c.page == Some(3)));
        assert!(chunks.len() > 2);
        assert_eq!(chunks.last().unwrap().index, chunks.len() - 1);
    }
}
