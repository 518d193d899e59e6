mod compiler_plugin;
mod compiler_registry;
mod input_file;
mod types;

pub use crate::{
  compiler_plugin::CompilerPlugin,
  compiler_registry::{CompilerIdx, CompilerMatch, CompilerRegistry, file_extension},
  input_file::InputFile,
  types::{
    AddAssetOptions, AddHtmlOptions, AddJavaScriptOptions, AddStylesheetOptions, HtmlSection,
    SourceMapInput,
  },
};
