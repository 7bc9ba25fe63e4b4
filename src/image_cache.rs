//! Decoded image cache shared between overlay instances.
//!
//! The host owns the cache and lends it to each load, so reuse across
//! overlays is explicit and the memory is released when the host drops or
//! clears it.

use std::collections::{HashMap, VecDeque};

use lexi_draw::ImageHandle;

use crate::error::ImageLoadError;
use crate::loader::{ImageFetcher, decode_image};

/// URL-keyed cache of decoded images with least-recently-used eviction.
#[derive(Debug)]
pub struct ImageCache {
    capacity: usize,
    entries: HashMap<String, ImageHandle>,
    /// URLs from least to most recently used
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl ImageCache {
    /// Create a cache holding at most `capacity` images. Zero disables
    /// caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// (hits, misses) since creation or the last `clear`.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn get(&mut self, url: &str) -> Option<ImageHandle> {
        let handle = self.entries.get(url)?.clone();
        self.touch(url);
        Some(handle)
    }

    pub fn insert(&mut self, url: &str, handle: ImageHandle) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(url.to_string(), handle).is_some() {
            self.touch(url);
            return;
        }
        self.order.push_back(url.to_string());
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            log::debug!("evicting cached image {}", oldest);
            self.entries.remove(&oldest);
        }
    }

    /// Return the cached image for `url`, fetching and decoding it on a miss.
    pub fn get_or_load(
        &mut self,
        url: &str,
        fetcher: &dyn ImageFetcher,
    ) -> Result<ImageHandle, ImageLoadError> {
        if let Some(handle) = self.get(url) {
            self.hits += 1;
            log::trace!("image cache hit for {}", url);
            return Ok(handle);
        }
        self.misses += 1;
        let bytes = fetcher.fetch(url)?;
        let handle = decode_image(url, &bytes)?;
        self.insert(url, handle.clone());
        Ok(handle)
    }

    pub fn remove(&mut self, url: &str) -> Option<ImageHandle> {
        self.order.retain(|u| u != url);
        self.entries.remove(url)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }

    fn touch(&mut self, url: &str) {
        if let Some(pos) = self.order.iter().position(|u| u == url) {
            if let Some(entry) = self.order.remove(pos) {
                self.order.push_back(entry);
            }
        }
    }
}
