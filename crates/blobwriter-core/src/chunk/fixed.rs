use crate::chunk::ChunkBudget;
use crate::types::BlobHandle;

/// A byte range of a blob, at most one chunk budget long.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub offset: u64,
    pub data: BlobHandle,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Splits a blob front to back into budget-sized chunks.
///
/// Only the final chunk may be shorter than the budget. Chunks are slices of
/// the original buffer, so memory stays bounded by what the caller already
/// holds plus one encoded chunk at a time.
pub struct FixedSizeChunker {
    remaining: BlobHandle,
    offset: u64,
    chunk_size: usize,
}

impl FixedSizeChunker {
    pub fn new(blob: &BlobHandle, budget: ChunkBudget) -> Self {
        Self {
            remaining: blob.clone(),
            offset: 0,
            chunk_size: budget.get(),
        }
    }

    /// Bytes not yet handed out.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl Iterator for FixedSizeChunker {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.remaining.is_empty() {
            return None;
        }

        let take = self.chunk_size.min(self.remaining.len());
        let data = self.remaining.slice(0..take);
        self.remaining = self.remaining.slice(take..self.remaining.len());

        let chunk = Chunk {
            offset: self.offset,
            data,
        };
        self.offset += take as u64;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(size: usize) -> ChunkBudget {
        ChunkBudget::new(size).unwrap()
    }

    #[test]
    fn fixed_chunks_exact_multiple() {
        let blob = BlobHandle::from(vec![0xABu8; 2048 * 3]);
        let chunks: Vec<Chunk> = FixedSizeChunker::new(&blob, budget(3072)).collect();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 3072);
        assert_eq!(chunks[1].len(), 3072);
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[1].offset, 3072);
    }

    #[test]
    fn fixed_chunks_with_remainder() {
        let blob = BlobHandle::from(vec![0xABu8; 1500]);
        let chunks: Vec<Chunk> = FixedSizeChunker::new(&blob, budget(1023)).collect();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 1023);
        assert_eq!(chunks[1].len(), 477);
        assert_eq!(chunks[1].offset, 1023);
    }

    #[test]
    fn fixed_empty_blob() {
        let blob = BlobHandle::default();
        let mut chunker = FixedSizeChunker::new(&blob, budget(3));
        assert!(chunker.next().is_none());
    }

    #[test]
    fn non_final_chunks_are_whole_groups_of_three() {
        let blob = BlobHandle::from((0..=255u8).cycle().take(5 * 12 + 7).collect::<Vec<u8>>());
        let chunks: Vec<Chunk> = FixedSizeChunker::new(&blob, budget(12)).collect();

        let (last, rest) = chunks.split_last().unwrap();
        assert!(rest.iter().all(|c| c.len() % 3 == 0));
        assert_eq!(last.len(), 7);

        let joined: Vec<u8> = chunks
            .iter()
            .flat_map(|c| c.data.as_bytes().to_vec())
            .collect();
        assert_eq!(joined, blob.as_bytes());
    }

    #[test]
    fn remaining_tracks_progress() {
        let blob = BlobHandle::from(vec![1u8; 10]);
        let mut chunker = FixedSizeChunker::new(&blob, budget(6));
        assert_eq!(chunker.remaining(), 10);
        chunker.next();
        assert_eq!(chunker.remaining(), 4);
        chunker.next();
        assert_eq!(chunker.remaining(), 0);
    }
}
