mod bundler_options;
mod types;

pub use bundler_options::{BundlerOptions, normalized_bundler_options::NormalizedBundlerOptions};

pub use crate::types::{
  arch::Arch,
  file_options::FileOptions,
  input_resource::InputResource,
  package_json::PackageJson,
  package_unit::{Dependency, PackageExport, PackageUnit},
  resource::{Resource, ResourceType},
};
