use std::{
  io,
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
  File,
  Dir,
}

pub type SharedFileSystem = Arc<dyn FileSystem>;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The file system operations the build needs: reading sources and `package.json` files during
/// resolution, and persisting linker cache entries.
pub trait FileSystem: Send + Sync {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  fn kind(&self, path: &Path) -> io::Result<FileKind>;

  fn write(&self, path: &Path, content: &[u8]) -> io::Result<()>;

  fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

  fn remove_file(&self, path: &Path) -> io::Result<()>;

  fn create_dir_all(&self, path: &Path) -> io::Result<()>;

  fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    String::from_utf8(self.read(path)?)
      .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
  }

  fn is_file(&self, path: &Path) -> bool {
    matches!(self.kind(path), Ok(FileKind::File))
  }

  fn is_dir(&self, path: &Path) -> bool {
    matches!(self.kind(path), Ok(FileKind::Dir))
  }

  /// Writes through a sibling temp file and a rename so readers never observe a partial file.
  fn write_atomic(&self, path: &Path, content: &[u8]) -> io::Result<()> {
    let file_name = path
      .file_name()
      .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(format!(
      ".tmp{}.{}",
      std::process::id(),
      TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let temp_path = path.with_file_name(temp_name);
    self.write(&temp_path, content)?;
    self.rename(&temp_path, path).inspect_err(|_| {
      let _ = self.remove_file(&temp_path);
    })
  }
}
