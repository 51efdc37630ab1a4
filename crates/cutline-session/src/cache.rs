//! Bounded LRU cache of generated contours.
//!
//! Keys are SipHash-1-3 fingerprints of the input: raw pixel bytes,
//! dimensions, and the serialized configuration. Any change to pixels
//! or parameters produces a different key, so stale hits cannot occur
//! short of a hash collision. The cache lives on the controller side
//! only; worker threads never touch it.

use std::collections::VecDeque;
use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use cutline_pipeline::{ContourConfig, RgbaImage};

/// Default number of cached results.
pub const CACHE_CAPACITY: usize = 20;

/// Fingerprint an image + config pair for cache lookup.
#[must_use]
pub fn fingerprint(image: &RgbaImage, config: &ContourConfig) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write_u32(image.width());
    hasher.write_u32(image.height());
    hasher.write(image.as_raw());
    hasher.write(&serde_json::to_vec(config).unwrap_or_default());
    hasher.finish()
}

/// A most-recently-used-first cache with a fixed capacity.
///
/// `get` refreshes recency; inserting past capacity evicts the least
/// recently used entry.
#[derive(Debug)]
pub struct ResultCache<V> {
    capacity: usize,
    entries: VecDeque<(u64, V)>,
}

impl<V: Clone> ResultCache<V> {
    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::new(),
        }
    }

    /// Look up a fingerprint, refreshing its recency on a hit.
    pub fn get(&mut self, key: u64) -> Option<V> {
        let index = self.entries.iter().position(|(k, _)| *k == key)?;
        let entry = self.entries.remove(index)?;
        let value = entry.1.clone();
        self.entries.push_front(entry);
        Some(value)
    }

    /// Insert a result, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: u64, value: V) {
        if let Some(index) = self.entries.iter().position(|(k, _)| *k == key) {
            self.entries.remove(index);
        }
        self.entries.push_front((key, value));
        self.entries.truncate(self.capacity);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new(CACHE_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut cache: ResultCache<u32> = ResultCache::new(3);
        for key in 0..3 {
            cache.insert(key, u32::try_from(key).unwrap());
        }
        // Touch key 0 so key 1 becomes the eviction candidate.
        assert_eq!(cache.get(0), Some(0));
        cache.insert(3, 3);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(0), Some(0));
        assert_eq!(cache.get(3), Some(3));
    }

    #[test]
    fn reinsert_updates_in_place() {
        let mut cache: ResultCache<u32> = ResultCache::new(2);
        cache.insert(7, 1);
        cache.insert(7, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(7), Some(2));
    }

    #[test]
    fn clear_empties_the_cache() {
        let mut cache: ResultCache<u32> = ResultCache::new(2);
        cache.insert(1, 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(1), None);
    }

    #[test]
    fn fingerprint_tracks_pixels_and_config() {
        let a = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let mut b = a.clone();
        b.put_pixel(0, 0, Rgba([254, 0, 0, 255]));
        let config = ContourConfig::default();
        let tweaked = ContourConfig {
            offset_inches: 0.25,
            ..ContourConfig::default()
        };

        assert_eq!(fingerprint(&a, &config), fingerprint(&a, &config));
        assert_ne!(fingerprint(&a, &config), fingerprint(&b, &config));
        assert_ne!(fingerprint(&a, &config), fingerprint(&a, &tweaked));
    }

    #[test]
    fn fingerprint_distinguishes_dimensions() {
        // Same raw byte count, different shape.
        let wide = RgbaImage::from_pixel(8, 2, Rgba([0, 0, 0, 255]));
        let tall = RgbaImage::from_pixel(2, 8, Rgba([0, 0, 0, 255]));
        let config = ContourConfig::default();
        assert_ne!(fingerprint(&wide, &config), fingerprint(&tall, &config));
    }
}
