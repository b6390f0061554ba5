//! Session-owned caches: the loaded model and recent inference results.

use std::collections::{HashMap, VecDeque};

use sha2::{Digest, Sha256};

use crate::catalog::Dataset;
use crate::detection::Detection;
use crate::error::Result;
use crate::model::ModelType;

pub type ModelKey = (ModelType, Dataset);

/// Holds the model for one `(model type, dataset)` pair.
///
/// Asking for another pair drops the cached model before loading the new one.
pub struct ModelCache<M> {
    entry: Option<(ModelKey, M)>,
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<M> ModelCache<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<&ModelKey> {
        self.entry.as_ref().map(|(key, _)| key)
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }

    pub fn invalidate(&mut self) {
        if let Some((key, _)) = self.entry.take() {
            log::debug!("Dropped cached model yolov5{} / {}", key.0, key.1.name());
        }
    }

    /// Cached model for `key`, or the result of `load` which then becomes the cached model.
    pub fn get_or_load<F>(&mut self, key: ModelKey, load: F) -> Result<&M>
    where
        F: FnOnce() -> Result<M>,
    {
        let entry = match self.entry.take() {
            Some((cached, model)) if cached == key => (cached, model),
            stale => {
                if let Some((old, _)) = stale {
                    log::debug!("Dropped cached model yolov5{} / {}", old.0, old.1.name());
                }
                (key, load()?)
            }
        };
        let (_, model) = self.entry.insert(entry);
        Ok(model)
    }
}

/// SHA-256 of the raw image bytes, hex encoded.
pub fn content_key(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub const DEFAULT_RESULT_ENTRIES: usize = 10;

/// Bounded map from image content hash to detections. When full, the oldest
/// insertion is evicted first.
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    entries: HashMap<String, Vec<Detection>>,
    order: VecDeque<String>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_ENTRIES)
    }
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
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

    pub fn get(&self, key: &str) -> Option<&[Detection]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Existing keys keep their age; only the value is replaced.
    pub fn insert(&mut self, key: String, detections: Vec<Detection>) {
        if self.capacity == 0 {
            return;
        }
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = detections;
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    log::debug!("Evicting cached result {}", &oldest[..12.min(oldest.len())]);
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, detections);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn det(class_index: usize) -> Vec<Detection> {
        vec![Detection::new(0.0, 0.0, 1.0, 1.0, 0.5, class_index)]
    }

    #[test]
    fn test_content_key_is_stable_hex() {
        let key = content_key(b"abc");
        assert_eq!(key, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_ne!(key, content_key(b"abd"));
    }

    #[test]
    fn test_result_cache_evicts_oldest() {
        let mut cache = ResultCache::new(2);
        cache.insert("a".to_string(), det(0));
        cache.insert("b".to_string(), det(1));
        cache.insert("c".to_string(), det(2));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert_eq!(cache.get("b").unwrap()[0].class_index, 1);
        assert_eq!(cache.get("c").unwrap()[0].class_index, 2);
    }

    #[test]
    fn test_reinsert_keeps_age() {
        let mut cache = ResultCache::new(2);
        cache.insert("a".to_string(), det(0));
        cache.insert("b".to_string(), det(1));
        cache.insert("a".to_string(), det(5));
        cache.insert("c".to_string(), det(2));
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = ResultCache::new(0);
        cache.insert("a".to_string(), det(0));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_model_cache_loads_once_per_key() {
        let mut cache: ModelCache<u32> = ModelCache::new();
        let mut loads = 0;
        let key = (ModelType::S, Dataset::Yolov5);
        for _ in 0..3 {
            let model = cache
                .get_or_load(key.clone(), || {
                    loads += 1;
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*model, 7);
        }
        assert_eq!(loads, 1);
    }

    #[test]
    fn test_model_cache_reloads_on_key_change() {
        let mut cache: ModelCache<&str> = ModelCache::new();
        cache.get_or_load((ModelType::S, Dataset::Yolov5), || Ok("coco")).unwrap();
        let model = cache.get_or_load((ModelType::S, Dataset::Animals), || Ok("animals")).unwrap();
        assert_eq!(*model, "animals");
        assert_eq!(cache.key(), Some(&(ModelType::S, Dataset::Animals)));
    }

    #[test]
    fn test_model_cache_failed_load_leaves_empty() {
        let mut cache: ModelCache<u8> = ModelCache::new();
        cache.get_or_load((ModelType::S, Dataset::Yolov5), || Ok(1)).unwrap();
        let result = cache.get_or_load((ModelType::M, Dataset::Yolov5), || Err(Error::Config("boom".to_string())));
        assert!(result.is_err());
        assert!(!cache.is_loaded());
    }
}
