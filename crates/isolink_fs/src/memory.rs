use std::{
  io::{self, Read, Write},
  path::{Path, PathBuf},
};

use vfs::{MemoryFS, VfsError, VfsFileType, VfsPath};

use crate::{FileKind, FileSystem};

/// In-memory file system for tests. Paths are treated as absolute `/`-separated paths.
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
  root: VfsPath,
}

impl Default for MemoryFileSystem {
  fn default() -> Self {
    Self { root: VfsPath::new(MemoryFS::new()) }
  }
}

fn to_io_error(err: VfsError) -> io::Error {
  io::Error::other(err.to_string())
}

impl MemoryFileSystem {
  pub fn new(files: &[(&str, &str)]) -> Self {
    let fs = Self::default();
    for (path, content) in files {
      fs.add_file(Path::new(path), content.as_bytes()).expect("Failed to seed memory file system");
    }
    fs
  }

  /// Creates `path` with `content`, creating missing parent directories.
  pub fn add_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
      self.create_dir_all(parent)?;
    }
    self.write(path, content)
  }

  fn vfs_path(&self, path: &Path) -> io::Result<VfsPath> {
    let path = path
      .to_str()
      .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "non utf8 path"))?
      .trim_start_matches('/')
      .trim_end_matches('/');
    if path.is_empty() {
      return Ok(self.root.clone());
    }
    self.root.join(path).map_err(to_io_error)
  }

  fn existing(&self, path: &Path) -> io::Result<VfsPath> {
    let vfs_path = self.vfs_path(path)?;
    if vfs_path.exists().map_err(to_io_error)? {
      Ok(vfs_path)
    } else {
      Err(io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())))
    }
  }
}

impl FileSystem for MemoryFileSystem {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    let mut content = Vec::new();
    self.existing(path)?.open_file().map_err(to_io_error)?.read_to_end(&mut content)?;
    Ok(content)
  }

  fn kind(&self, path: &Path) -> io::Result<FileKind> {
    let metadata = self.existing(path)?.metadata().map_err(to_io_error)?;
    Ok(match metadata.file_type {
      VfsFileType::File => FileKind::File,
      VfsFileType::Directory => FileKind::Dir,
    })
  }

  fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = self.vfs_path(path)?.create_file().map_err(to_io_error)?;
    file.write_all(content)?;
    file.flush()
  }

  fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
    let content = self.read(from)?;
    self.write(to, &content)?;
    self.remove_file(from)
  }

  fn remove_file(&self, path: &Path) -> io::Result<()> {
    self.existing(path)?.remove_file().map_err(to_io_error)
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    self.vfs_path(path)?.create_dir_all().map_err(to_io_error)
  }

  fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = self.existing(path)?.read_dir().map_err(to_io_error)?;
    Ok(entries.map(|entry| PathBuf::from(entry.as_str())).collect())
  }
}

#[test]
fn test_memory_file_system() {
  let fs = MemoryFileSystem::new(&[("/app/main.js", "console.log(1)"), ("/app/lib/a.js", "")]);

  assert!(fs.is_file(Path::new("/app/main.js")));
  assert!(fs.is_dir(Path::new("/app/lib")));
  assert!(!fs.is_file(Path::new("/app/missing.js")));
  assert_eq!(fs.kind(Path::new("/nope")).unwrap_err().kind(), io::ErrorKind::NotFound);
  assert_eq!(fs.read_to_string(Path::new("/app/main.js")).unwrap(), "console.log(1)");

  fs.write_atomic(Path::new("/app/lib/b.js"), b"b").unwrap();
  let mut entries = fs.read_dir(Path::new("/app/lib")).unwrap();
  entries.sort();
  assert_eq!(entries, [PathBuf::from("/app/lib/a.js"), PathBuf::from("/app/lib/b.js")]);
}
