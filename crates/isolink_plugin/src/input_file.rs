use isolink_common::{Arch, FileOptions, PackageExport};

use crate::{AddAssetOptions, AddHtmlOptions, AddJavaScriptOptions, AddStylesheetOptions};

pub trait InputFile {
  fn contents(&self) -> &[u8];

  fn contents_as_string(&self) -> anyhow::Result<&str> {
    std::str::from_utf8(self.contents())
      .map_err(|err| anyhow::anyhow!("{} is not valid UTF-8: {err}", self.path_in_package()))
  }

  fn package_name(&self) -> Option<&str>;

  fn path_in_package(&self) -> &str;

  /// The registered extension that routed this file to its compiler, if any.
  fn extension(&self) -> Option<&str>;

  fn basename(&self) -> &str {
    let path = self.path_in_package();
    path.rsplit('/').next().unwrap_or(path)
  }

  fn arch(&self) -> &Arch;

  fn source_hash(&self) -> &str;

  fn declared_exports(&self) -> &[PackageExport];

  fn file_options(&self) -> &FileOptions;

  fn add_javascript(&mut self, options: AddJavaScriptOptions) -> anyhow::Result<()>;

  fn add_stylesheet(&mut self, options: AddStylesheetOptions) -> anyhow::Result<()>;

  fn add_asset(&mut self, options: AddAssetOptions) -> anyhow::Result<()>;

  fn add_html(&mut self, options: AddHtmlOptions) -> anyhow::Result<()>;

  /// Records a compile error for this file. Line is 1-based, column 0-based.
  fn error(&mut self, message: String, line: Option<u32>, column: Option<u32>);
}
