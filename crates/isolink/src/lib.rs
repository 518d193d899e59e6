mod bundler;
mod cache;
mod compiler;
mod link_stage;
mod scan_stage;
mod types;
mod utils;

use std::sync::Arc;

pub use crate::{
  bundler::Bundler,
  cache::{CacheKey, LinkerCache},
  compiler::{CompilerOrchestrator, resource_slot::ResourceSlot, source_batch::SourceBatch},
  link_stage::{GLOBAL_IMPORTS_SERVE_PATH, InstallOptions, Linker, LinkerOptions},
  scan_stage::{
    ScanOutput,
    import_scanner::{ImportScanner, ImportScannerOptions, MissingImport, MissingModules},
    scan_batches,
  },
  types::{
    bundle_output::{BundleOutput, PackageBundle},
    js_output::JsOutput,
    scanned_file::{ImportStatus, ScannedFile, ScannedFileIdx, static_deps},
  },
  utils::normalize_options::normalize_options,
};
pub use isolink_common::*;
pub use isolink_error::{BuildDiagnostic, BuildError, BuildResult, Diagnostics, Severity};
pub use isolink_fs::{FileSystem, OsFileSystem, SharedFileSystem};
pub use isolink_plugin::*;

pub(crate) type SharedOptions = Arc<NormalizedBundlerOptions>;
