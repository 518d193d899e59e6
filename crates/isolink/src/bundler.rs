use std::sync::Arc;

use isolink_common::{BundlerOptions, NormalizedBundlerOptions, PackageUnit};
use isolink_error::{BuildResult, Diagnostics};
use isolink_fs::SharedFileSystem;
use isolink_plugin::CompilerRegistry;
use tracing::instrument;

use crate::{
  SharedOptions,
  cache::LinkerCache,
  compiler::CompilerOrchestrator,
  link_stage::{GLOBAL_IMPORTS_SERVE_PATH, Linker},
  scan_stage::scan_batches,
  types::bundle_output::{BundleOutput, PackageBundle},
  utils::normalize_options::normalize_options,
};

pub struct Bundler {
  pub(crate) options: SharedOptions,
  pub(crate) registry: CompilerRegistry,
  pub(crate) fs: SharedFileSystem,
  pub(crate) linker: Linker,
}

impl Bundler {
  pub fn new(options: BundlerOptions, registry: CompilerRegistry, fs: SharedFileSystem) -> Self {
    let options = Arc::new(normalize_options(options));
    let linker = Linker::new(LinkerCache::from_options(&options, Arc::clone(&fs)));
    Bundler { options, registry, fs, linker }
  }

  pub fn options(&self) -> &NormalizedBundlerOptions {
    &self.options
  }

  pub fn linker(&self) -> &Linker {
    &self.linker
  }

  /// Compiles, scans and links `units`. Output keeps the order of `units`, after the app's
  /// global imports.
  #[instrument(level = "debug", skip_all, fields(arch = %self.options.arch))]
  pub fn build(&self, units: Vec<PackageUnit>) -> BuildResult<BundleOutput> {
    let mut diagnostics = Diagnostics::default();

    let batches = CompilerOrchestrator::new(&self.registry, &self.options).run(units, &mut diagnostics)?;
    let scanned = scan_batches(&batches, &self.fs, &self.options, &mut diagnostics)?;

    let mut global_imports = Vec::new();
    let packages = batches
      .iter()
      .zip(scanned.files)
      .map(|(batch, files)| {
        let (stubs, resources): (Vec<_>, Vec<_>) = batch
          .get_resources(&files, &self.linker, &self.options, &mut diagnostics)
          .into_iter()
          .partition(|resource| resource.serve_path.as_deref() == Some(GLOBAL_IMPORTS_SERVE_PATH));
        global_imports.extend(stubs);
        PackageBundle { name: batch.name.clone(), resources }
      })
      .collect();

    Ok(BundleOutput { global_imports, packages, diagnostics: diagnostics.into_vec() })
  }
}
