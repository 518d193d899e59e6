use isolink_common::Resource;
use isolink_utils::indexmap::FxIndexMap;

use super::CacheKey;

/// Least-recently-used entries are at the front.
pub struct MemoryCache {
  entries: FxIndexMap<CacheKey, (Vec<Resource>, usize)>,
  size: usize,
  max_size: usize,
}

impl MemoryCache {
  pub fn new(max_size: usize) -> Self {
    Self { entries: FxIndexMap::default(), size: 0, max_size }
  }

  pub fn get(&mut self, key: &CacheKey) -> Option<Vec<Resource>> {
    let idx = self.entries.get_index_of(key)?;
    let last = self.entries.len() - 1;
    self.entries.move_index(idx, last);
    self.entries.get_index(last).map(|(_, (resources, _))| resources.clone())
  }

  /// Entries larger than the whole cache are not stored.
  pub fn insert(&mut self, key: CacheKey, resources: Vec<Resource>) {
    let size = resources.iter().map(Resource::size).sum::<usize>();
    if size > self.max_size {
      return;
    }
    if let Some((_, old_size)) = self.entries.shift_remove(&key) {
      self.size -= old_size;
    }
    self.entries.insert(key, (resources, size));
    self.size += size;

    while self.size > self.max_size {
      let Some((_, (_, evicted))) = self.entries.shift_remove_index(0) else { break };
      self.size -= evicted;
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn size(&self) -> usize {
    self.size
  }
}

#[cfg(test)]
fn resource_of_size(size: usize) -> Vec<Resource> {
  vec![Resource {
    r#type: isolink_common::ResourceType::Js,
    data: vec![b'x'; size].into(),
    serve_path: None,
    source_path: None,
    target_path: None,
    hash: String::new(),
    source_map: None,
  }]
}

#[cfg(test)]
fn key(name: &str) -> CacheKey {
  use crate::{link_stage::LinkerOptions, types::scanned_file::ScannedFile};

  let options = LinkerOptions { name: Some(name.to_string()), ..LinkerOptions::default() };
  CacheKey::new(&Vec::<ScannedFile>::new(), &options)
}

#[test]
fn test_evicts_least_recently_used() {
  let mut cache = MemoryCache::new(10);
  cache.insert(key("a"), resource_of_size(4));
  cache.insert(key("b"), resource_of_size(4));
  assert!(cache.get(&key("a")).is_some());

  cache.insert(key("c"), resource_of_size(4));
  assert_eq!(cache.len(), 2);
  assert!(cache.get(&key("b")).is_none());
  assert!(cache.get(&key("a")).is_some());
  assert!(cache.get(&key("c")).is_some());
  assert_eq!(cache.size(), 8);
}

#[test]
fn test_skips_oversized_entries() {
  let mut cache = MemoryCache::new(10);
  cache.insert(key("a"), resource_of_size(11));
  assert_eq!(cache.len(), 0);
  assert_eq!(cache.size(), 0);
}
