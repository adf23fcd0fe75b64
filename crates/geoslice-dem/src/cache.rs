//! LRU cache of decoded TIFF chunks.

use std::collections::HashMap;
use std::sync::Arc;

/// One decoded strip or tile.
#[derive(Debug)]
pub(crate) struct DecodedChunk {
    /// Width of the decoded data (edge tiles may be narrower).
    pub width: u32,
    /// Height of the decoded data (the last strip may be shorter).
    pub height: u32,
    /// Samples in row-major order.
    pub data: Vec<f32>,
}

impl DecodedChunk {
    fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// LRU cache for decoded chunks, bounded by total decoded size.
///
/// Sectors in the same latitude band read the same strips, so keeping a few
/// hundred megabytes of decoded data avoids decompressing each strip once per
/// sector.
#[derive(Debug)]
pub(crate) struct ChunkCache {
    /// Decoded chunks indexed by TIFF chunk index.
    chunks: HashMap<u32, Arc<DecodedChunk>>,
    /// Access order for LRU eviction (most recently used at the back).
    access_order: Vec<u32>,
    /// Bytes currently held.
    size_bytes: usize,
    /// Upper bound on bytes held.
    max_bytes: usize,
}

impl ChunkCache {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            chunks: HashMap::new(),
            access_order: Vec::new(),
            size_bytes: 0,
            max_bytes,
        }
    }

    pub fn get(&mut self, index: u32) -> Option<Arc<DecodedChunk>> {
        let chunk = self.chunks.get(&index)?.clone();
        self.touch(index);
        Some(chunk)
    }

    /// Mark a key as recently used (move to back of access order).
    fn touch(&mut self, index: u32) {
        if let Some(pos) = self.access_order.iter().position(|k| *k == index) {
            self.access_order.remove(pos);
            self.access_order.push(index);
        }
    }

    /// Insert a chunk, evicting the oldest ones to stay within budget.
    ///
    /// A chunk larger than the whole budget is not cached at all.
    pub fn insert(&mut self, index: u32, chunk: Arc<DecodedChunk>) {
        if self.chunks.contains_key(&index) {
            self.touch(index);
            return;
        }

        let size = chunk.size_bytes();
        if size > self.max_bytes {
            return;
        }

        while self.size_bytes + size > self.max_bytes && !self.access_order.is_empty() {
            let oldest = self.access_order.remove(0);
            if let Some(evicted) = self.chunks.remove(&oldest) {
                self.size_bytes -= evicted.size_bytes();
            }
        }

        self.size_bytes += size;
        self.chunks.insert(index, chunk);
        self.access_order.push(index);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.access_order.clear();
        self.size_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(samples: usize) -> Arc<DecodedChunk> {
        Arc::new(DecodedChunk {
            width: samples as u32,
            height: 1,
            data: vec![0.0; samples],
        })
    }

    #[test]
    fn test_evicts_least_recently_used() {
        // Room for three 4-sample chunks.
        let mut cache = ChunkCache::new(48);
        cache.insert(0, chunk(4));
        cache.insert(1, chunk(4));
        cache.insert(2, chunk(4));
        assert_eq!(cache.len(), 3);

        // Touch 0 so 1 becomes the oldest.
        assert!(cache.get(0).is_some());
        cache.insert(3, chunk(4));

        assert!(cache.get(1).is_none());
        assert!(cache.get(0).is_some());
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
        assert_eq!(cache.size_bytes(), 48);
    }

    #[test]
    fn test_oversized_chunk_not_cached() {
        let mut cache = ChunkCache::new(16);
        cache.insert(0, chunk(8));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn test_clear() {
        let mut cache = ChunkCache::new(1024);
        cache.insert(7, chunk(4));
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.size_bytes(), 0);
        assert!(cache.get(7).is_none());
    }
}
