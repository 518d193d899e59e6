use std::{
  fs, io,
  path::{Path, PathBuf},
};

use crate::{FileKind, FileSystem};

#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
  }

  fn kind(&self, path: &Path) -> io::Result<FileKind> {
    let metadata = fs::metadata(path)?;
    Ok(if metadata.is_dir() { FileKind::Dir } else { FileKind::File })
  }

  fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
    fs::write(path, content)
  }

  fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
  }

  fn remove_file(&self, path: &Path) -> io::Result<()> {
    fs::remove_file(path)
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
  }

  fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
    fs::read_dir(path)?.map(|entry| entry.map(|entry| entry.path())).collect()
  }
}

#[test]
fn test_write_atomic_replaces_existing_file() {
  let dir = std::env::temp_dir().join(format!("isolink-fs-{}", std::process::id()));
  let fs = OsFileSystem;
  fs.create_dir_all(&dir).unwrap();
  let path = dir.join("entry.cache");

  fs.write_atomic(&path, b"first").unwrap();
  fs.write_atomic(&path, b"second").unwrap();
  assert_eq!(fs.read_to_string(&path).unwrap(), "second");
  assert_eq!(fs.read_dir(&dir).unwrap(), [path.clone()]);

  fs.remove_file(&path).unwrap();
  let _ = std::fs::remove_dir(&dir);
}
