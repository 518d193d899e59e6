use std::{
  io,
  path::{Path, PathBuf},
  sync::{Arc, Condvar, Mutex, PoisonError},
};

use isolink_common::{Resource, ResourceType};
use isolink_error::{BuildDiagnostic, Diagnostics};
use isolink_fs::SharedFileSystem;
use isolink_utils::base64::{from_standard_base64, to_standard_base64};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CacheKey;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedResource {
  r#type: ResourceType,
  /// Base64 of the resource bytes.
  data: String,
  serve_path: Option<String>,
  source_path: Option<String>,
  target_path: Option<String>,
  hash: String,
  source_map: Option<String>,
}

impl From<&Resource> for CachedResource {
  fn from(resource: &Resource) -> Self {
    Self {
      r#type: resource.r#type,
      data: to_standard_base64(&resource.data),
      serve_path: resource.serve_path.clone(),
      source_path: resource.source_path.clone(),
      target_path: resource.target_path.clone(),
      hash: resource.hash.clone(),
      source_map: resource.source_map.as_ref().map(ToString::to_string),
    }
  }
}

impl CachedResource {
  fn into_resource(self) -> Option<Resource> {
    Some(Resource {
      r#type: self.r#type,
      data: from_standard_base64(&self.data)?.into(),
      serve_path: self.serve_path,
      source_path: self.source_path,
      target_path: self.target_path,
      hash: self.hash,
      source_map: self.source_map.map(Into::into),
    })
  }
}

/// Number of writes still in flight.
#[derive(Default)]
struct PendingWrites {
  count: Mutex<usize>,
  done: Condvar,
}

impl PendingWrites {
  fn start(&self) {
    *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
  }

  fn finish(&self) {
    let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
    *count = count.saturating_sub(1);
    self.done.notify_all();
  }

  fn wait(&self) {
    let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
    while *count > 0 {
      count = self.done.wait(count).unwrap_or_else(PoisonError::into_inner);
    }
  }
}

/// One JSON file per key under `dir`.
pub struct DiskCache {
  dir: PathBuf,
  fs: SharedFileSystem,
  pending: Arc<PendingWrites>,
}

impl DiskCache {
  pub fn new(dir: PathBuf, fs: SharedFileSystem) -> Self {
    Self { dir, fs, pending: Arc::default() }
  }

  /// A missing entry is a miss. An unreadable one is a miss plus a warning.
  pub fn read(&self, key: &CacheKey, diagnostics: &mut Diagnostics) -> Option<Vec<Resource>> {
    let path = self.dir.join(key.file_name());
    let content = match self.fs.read_to_string(&path) {
      Ok(content) => content,
      Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
      Err(err) => {
        debug!("failed to read linker cache entry {}: {err}", path.display());
        return None;
      }
    };

    let parsed = serde_json::from_str::<Vec<CachedResource>>(&content)
      .map_err(|err| err.to_string())
      .and_then(|entries| {
        entries
          .into_iter()
          .map(CachedResource::into_resource)
          .collect::<Option<Vec<_>>>()
          .ok_or_else(|| "invalid base64 data".to_string())
      });

    match parsed {
      Ok(resources) => Some(resources),
      Err(message) => {
        warn!("ignoring unreadable linker cache entry {}: {message}", path.display());
        diagnostics.push(BuildDiagnostic::CacheCorruption { path: path.display().to_string(), message });
        None
      }
    }
  }

  /// Writes in the background. Entries sharing the key's prefix are replaced.
  pub fn write(&self, key: &CacheKey, resources: &[Resource]) {
    let entries = resources.iter().map(CachedResource::from).collect::<Vec<_>>();
    let content = match serde_json::to_vec(&entries) {
      Ok(content) => content,
      Err(err) => {
        debug!("failed to serialize linker cache entry: {err}");
        return;
      }
    };

    let fs = Arc::clone(&self.fs);
    let dir = self.dir.clone();
    let prefix = key.prefix().to_string();
    let file_name = key.file_name();
    let pending = Arc::clone(&self.pending);

    pending.start();
    rayon::spawn(move || {
      if let Err(err) = write_entry(&fs, &dir, &prefix, &file_name, &content) {
        debug!("failed to write linker cache entry {file_name}: {err}");
      }
      pending.finish();
    });
  }

  pub fn flush(&self) {
    self.pending.wait();
  }
}

fn write_entry(
  fs: &SharedFileSystem,
  dir: &Path,
  prefix: &str,
  file_name: &str,
  content: &[u8],
) -> io::Result<()> {
  fs.create_dir_all(dir)?;
  let stale_prefix = format!("{prefix}_");
  for path in fs.read_dir(dir)? {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else { continue };
    if name.starts_with(&stale_prefix) && name.ends_with(".cache") && name != file_name {
      fs.remove_file(&path)?;
    }
  }
  fs.write_atomic(&dir.join(file_name), content)
}
