pub mod resource_slot;
pub mod source_batch;

use std::panic::{AssertUnwindSafe, catch_unwind};

use isolink_common::{NormalizedBundlerOptions, PackageUnit};
use isolink_error::{BuildDiagnostic, BuildResult, Diagnostics};
use isolink_plugin::{CompilerIdx, CompilerRegistry, InputFile};
use isolink_utils::indexmap::FxIndexMap;
use tracing::{debug, error, instrument};

use self::{resource_slot::ResourceSlot, source_batch::SourceBatch};

/// Routes every input resource to its compiler and runs each compiler once over all the files it
/// owns across packages.
pub struct CompilerOrchestrator<'a> {
  registry: &'a CompilerRegistry,
  options: &'a NormalizedBundlerOptions,
}

impl<'a> CompilerOrchestrator<'a> {
  pub fn new(registry: &'a CompilerRegistry, options: &'a NormalizedBundlerOptions) -> Self {
    Self { registry, options }
  }

  #[instrument(level = "debug", skip_all, fields(packages = units.len()))]
  pub fn run(
    &self,
    units: Vec<PackageUnit>,
    diagnostics: &mut Diagnostics,
  ) -> BuildResult<Vec<SourceBatch>> {
    let mut batches = units
      .into_iter()
      .map(|unit| SourceBatch::new(unit, self.options, self.registry, diagnostics))
      .collect::<Vec<_>>();

    let mut jobs: FxIndexMap<CompilerIdx, Vec<&mut ResourceSlot>> = FxIndexMap::default();
    for slot in batches.iter_mut().flat_map(|batch| batch.slots.iter_mut()) {
      if let Some(idx) = slot.compiler.as_ref().map(|matched| matched.idx) {
        jobs.entry(idx).or_default().push(slot);
      }
    }

    for (idx, slots) in jobs {
      self.run_job(idx, slots, diagnostics);
    }

    let mut violations = Vec::new();
    for slot in batches.iter_mut().flat_map(|batch| batch.slots.iter_mut()) {
      violations.append(&mut slot.contract_violations);
      slot.settle_errors(diagnostics);
    }
    if !violations.is_empty() {
      return Err(violations.into());
    }

    Ok(batches)
  }

  /// A failing compiler is reported against its own job only.
  fn run_job(&self, idx: CompilerIdx, slots: Vec<&mut ResourceSlot>, diagnostics: &mut Diagnostics) {
    let plugin = self.registry.plugin(idx);
    let job = format!("processing files with {}", plugin.name());
    debug!("{job} ({} files)", slots.len());

    let mut input_files = slots.into_iter().map(|slot| slot as &mut dyn InputFile).collect::<Vec<_>>();
    let result = catch_unwind(AssertUnwindSafe(|| plugin.process_files_for_target(&mut input_files)));

    let message = match result {
      Ok(Ok(())) => return,
      Ok(Err(err)) => format!("{err:#}"),
      Err(payload) => payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "compiler panicked".to_string()),
    };
    error!("{job} failed: {message}");
    diagnostics.push(BuildDiagnostic::CompilerException { job, message });
  }
}
