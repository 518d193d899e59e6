use std::borrow::Cow;

use crate::InputFile;

/// A compiler turns source files into JS, CSS, assets or HTML by calling the `add_*` methods of
/// each [`InputFile`] it is given. One call receives every file the compiler owns in the build.
pub trait CompilerPlugin: Send + Sync {
  fn name(&self) -> Cow<'static, str>;

  fn process_files_for_target(&self, input_files: &mut [&mut dyn InputFile])
  -> anyhow::Result<()>;
}
