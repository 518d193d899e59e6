mod cache_key;
mod disk_cache;
mod memory_cache;

use std::{
  path::PathBuf,
  sync::{Mutex, PoisonError},
};

use isolink_common::{NormalizedBundlerOptions, Resource};
use isolink_error::Diagnostics;
use isolink_fs::SharedFileSystem;
use tracing::debug;

pub use self::cache_key::CacheKey;
use self::{disk_cache::DiskCache, memory_cache::MemoryCache};

/// Link results by [`CacheKey`]: a size-bounded in-memory LRU in front of an optional directory
/// of JSON entries.
pub struct LinkerCache {
  memory: Mutex<MemoryCache>,
  disk: Option<DiskCache>,
}

impl LinkerCache {
  pub fn new(max_size: usize, dir: Option<PathBuf>, fs: SharedFileSystem) -> Self {
    Self {
      memory: Mutex::new(MemoryCache::new(max_size)),
      disk: dir.map(|dir| DiskCache::new(dir, fs)),
    }
  }

  pub fn from_options(options: &NormalizedBundlerOptions, fs: SharedFileSystem) -> Self {
    Self::new(options.linker_cache_size, options.linker_cache_dir.clone(), fs)
  }

  pub fn get(&self, key: &CacheKey, diagnostics: &mut Diagnostics) -> Option<Vec<Resource>> {
    if let Some(resources) = self.memory().get(key) {
      debug!("linker memory cache hit {}", key.file_name());
      return Some(resources);
    }

    let resources = self.disk.as_ref()?.read(key, diagnostics)?;
    debug!("linker disk cache hit {}", key.file_name());
    self.memory().insert(key.clone(), resources.clone());
    Some(resources)
  }

  pub fn insert(&self, key: CacheKey, resources: &[Resource]) {
    if let Some(disk) = &self.disk {
      disk.write(&key, resources);
    }
    self.memory().insert(key, resources.to_vec());
  }

  /// Blocks until every background disk write has finished.
  pub fn flush(&self) {
    if let Some(disk) = &self.disk {
      disk.flush();
    }
  }

  fn memory(&self) -> std::sync::MutexGuard<'_, MemoryCache> {
    self.memory.lock().unwrap_or_else(PoisonError::into_inner)
  }
}
