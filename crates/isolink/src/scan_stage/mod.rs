pub mod import_scanner;
pub mod install_path;

use std::sync::Arc;

use arcstr::ArcStr;
use isolink_error::{BuildDiagnostic, BuildResult, Diagnostics};
use isolink_fs::SharedFileSystem;
use isolink_utils::{concat_string, indexmap::FxIndexMap};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, instrument, warn};

use self::import_scanner::{
  ImportScanner, ImportScannerOptions, MissingImport, MissingModules, merge_missing,
};
use crate::{SharedOptions, compiler::source_batch::SourceBatch, types::scanned_file::ScannedFile};

#[derive(Debug, Default)]
pub struct ScanOutput {
  /// One entry per batch, in batch order.
  pub files: Vec<Vec<ScannedFile>>,
  /// Ids no scanner could resolve.
  pub missing: MissingModules,
}

/// A missing id retried in another scanner under a rewritten id.
struct Relocation {
  original_id: String,
  id: String,
  imports: Vec<MissingImport>,
}

#[instrument(level = "debug", skip_all, fields(batches = batches.len()))]
pub fn scan_batches(
  batches: &[SourceBatch],
  fs: &SharedFileSystem,
  options: &SharedOptions,
  diagnostics: &mut Diagnostics,
) -> BuildResult<ScanOutput> {
  let known_packages: Arc<FxHashSet<ArcStr>> =
    Arc::new(batches.iter().filter_map(|batch| batch.name.clone()).collect());

  let mut scanners = Vec::with_capacity(batches.len());
  for batch in batches {
    let mut scanner = ImportScanner::new(
      ImportScannerOptions {
        name: batch.name.clone(),
        arch: options.arch.clone(),
        source_root: batch.source_root.clone(),
        node_modules_paths: batch.node_modules_paths.clone(),
        extensions: batch.import_extensions.clone(),
        known_packages: Arc::clone(&known_packages),
        uses_modules: batch.uses_modules,
      },
      Arc::clone(fs),
    );
    scanner.add_input_files(batch.js_outputs().cloned())?;
    if scanner.resolves_imports() {
      scanner.scan_imports(diagnostics)?;
    } else {
      debug!("{} does not use modules, skipping import scan", batch.name.as_deref().unwrap_or_default());
    }
    scanners.push(scanner);
  }

  let missing = relocate_missing_modules(&mut scanners, diagnostics)?;
  report_missing_modules(&missing, diagnostics);

  let files = scanners.iter_mut().map(|scanner| scanner.get_output_files(diagnostics)).collect();
  Ok(ScanOutput { files, missing })
}

/// Retries every unresolved id in the scanner that may own it until nothing new goes missing:
/// `meteor/<pkg>/<path>` in `<pkg>`, `meteor/<pkg>` as `<pkg>`'s main module, anything else in
/// the app. Packages outside the module system never take part. Returns the original misses
/// that no retry resolved.
fn relocate_missing_modules(
  scanners: &mut [ImportScanner],
  diagnostics: &mut Diagnostics,
) -> BuildResult<MissingModules> {
  let package_index: FxHashMap<ArcStr, usize> = scanners
    .iter()
    .enumerate()
    .filter(|(_, scanner)| scanner.resolves_imports())
    .filter_map(|(idx, scanner)| scanner.name().map(|name| (name.clone(), idx)))
    .collect();
  let app_index = scanners.iter().position(|scanner| scanner.name().is_none());

  let mut unresolved = MissingModules::default();
  for scanner in scanners.iter() {
    merge_missing(&mut unresolved, scanner.missing());
  }

  // Scanners drop ids they already missed unless requested with a higher status, so this
  // terminates.
  let mut relocated: FxHashSet<String> = FxHashSet::default();
  let mut missing = unresolved.clone();
  while !missing.is_empty() {
    let mut by_scanner: FxIndexMap<usize, Vec<Relocation>> = FxIndexMap::default();
    for (original_id, imports) in missing.drain(..) {
      if let Some((idx, id)) = relocation_target(&original_id, &package_index, app_index, scanners) {
        by_scanner.entry(idx).or_default().push(Relocation { original_id, id, imports });
      }
    }

    let mut next = MissingModules::default();
    for (idx, relocations) in by_scanner {
      let mut ids = MissingModules::default();
      for relocation in &relocations {
        ids.entry(relocation.id.clone()).or_default().extend(relocation.imports.iter().cloned());
      }
      let (added, newly_missing) = scanners[idx].scan_missing_modules(&ids, diagnostics)?;
      debug!("resolved {} of {} missing modules in another scanner", added.len(), ids.len());

      relocated.extend(
        relocations
          .into_iter()
          .filter(|relocation| added.contains(&relocation.id))
          .map(|relocation| relocation.original_id),
      );
      merge_missing(&mut next, &newly_missing);
    }
    missing = next;
  }

  unresolved.retain(|id, _| !relocated.contains(id));
  Ok(unresolved)
}

fn relocation_target(
  id: &str,
  package_index: &FxHashMap<ArcStr, usize>,
  app_index: Option<usize>,
  scanners: &[ImportScanner],
) -> Option<(usize, String)> {
  let Some(rest) = id.strip_prefix("meteor/") else {
    return app_index.map(|idx| (idx, id.to_string()));
  };
  let (package, path) = match rest.split_once('/') {
    Some((package, path)) => (package, Some(path)),
    None => (rest, None),
  };
  let idx = *package_index.get(package)?;
  match path {
    Some(path) => Some((idx, concat_string!("./", path))),
    None => scanners[idx].main_module_id().map(|main| (idx, main)),
  }
}

/// One warning per id. Ids under `meteor/` and ids only packages asked for are left to the
/// packages' own builds. Requests through a shadowed `require` stay silent.
fn report_missing_modules(missing: &MissingModules, diagnostics: &mut Diagnostics) {
  for (id, imports) in missing {
    if id.starts_with("meteor/") {
      continue;
    }
    let Some(import) = imports.iter().find(|import| import.package_name.is_none() && !import.possibly_spurious) else {
      continue;
    };
    warn!("unable to resolve {id:?} from {}", import.parent_path);
    diagnostics.push(BuildDiagnostic::MissingModule {
      id: id.clone(),
      parent_path: import.parent_path.clone(),
      arch: import.bundle_arch.to_string(),
    });
  }
}
