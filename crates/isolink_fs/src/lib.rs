mod file_system;
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "os")]
mod os;

pub use crate::file_system::{FileKind, FileSystem, SharedFileSystem};
#[cfg(feature = "memory")]
pub use memory::MemoryFileSystem;
#[cfg(feature = "os")]
pub use os::OsFileSystem;
