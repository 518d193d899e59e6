use std::{path::Path, sync::Arc};

use arcstr::ArcStr;
use isolink_common::{Arch, FileOptions, InputResource, PackageExport, Resource, ResourceType};
use isolink_error::{BuildDiagnostic, SourceLocation};
use isolink_plugin::{
  AddAssetOptions, AddHtmlOptions, AddJavaScriptOptions, AddStylesheetOptions, CompilerMatch,
  HtmlSection, InputFile, SourceMapInput,
};
use isolink_utils::{ecmascript::to_js_string_literal, path_ext::PathExt, xxhash::xxhash_hex};

use crate::{types::js_output::JsOutput, utils::serve_path::resource_serve_path};

const APPLIED_STYLES_STUB: &str = "// These styles have already been applied to the document.\n";

/// What every slot of one batch needs to know about the batch.
#[derive(Debug)]
pub struct SlotContext {
  pub package_name: Option<ArcStr>,
  pub arch: Arch,
  pub uses_modules: bool,
  pub declared_exports: Vec<PackageExport>,
}

/// One input resource and everything compiled from it.
pub struct ResourceSlot {
  pub input: InputResource,
  pub compiler: Option<CompilerMatch>,
  pub output_resources: Vec<Resource>,
  pub js_outputs: Vec<JsOutput>,
  pub(crate) errors: Vec<BuildDiagnostic>,
  pub(crate) contract_violations: Vec<anyhow::Error>,
  context: Arc<SlotContext>,
}

impl ResourceSlot {
  pub fn new(
    input: InputResource,
    compiler: Option<CompilerMatch>,
    context: Arc<SlotContext>,
  ) -> Self {
    let mut slot = Self {
      input,
      compiler,
      output_resources: Vec::new(),
      js_outputs: Vec::new(),
      errors: Vec::new(),
      contract_violations: Vec::new(),
      context,
    };

    if slot.compiler.is_none() {
      match slot.input.r#type {
        // Plain `.js` sources need no compiler.
        ResourceType::Source | ResourceType::Js => slot.pass_through_javascript(),
        _ => slot.pass_through_resource(),
      }
    }

    slot
  }

  pub fn package_name(&self) -> Option<&str> {
    self.context.package_name.as_deref()
  }

  fn pass_through_javascript(&mut self) {
    let data = String::from_utf8_lossy(&self.input.data).into_owned();
    let lazy = self.is_lazy(None, true, None);
    self.push_js(JsOutput {
      source_path: self.input.path.clone(),
      target_path: None,
      data,
      hash: self.input.hash.clone(),
      source_map: None,
      lazy,
      bare: self.input.file_options.bare.unwrap_or(false),
      main_module: self.input.file_options.main_module == Some(true),
      implicit: false,
      pending_errors: Vec::new(),
    });
  }

  fn pass_through_resource(&mut self) {
    self.output_resources.push(Resource {
      r#type: self.input.r#type,
      data: Arc::clone(&self.input.data),
      serve_path: Some(resource_serve_path(self.package_name(), &self.input.path)),
      source_path: Some(self.input.path.clone()),
      target_path: None,
      hash: self.input.hash.clone(),
      source_map: None,
    });
  }

  /// Explicit option, then file options; packages are eager, and so are apps without the module
  /// system. Otherwise a JS main module flag decides, then an `imports` path segment.
  fn is_lazy(&self, lazy: Option<bool>, is_javascript: bool, main_module: Option<bool>) -> bool {
    if let Some(lazy) = lazy.or(self.input.file_options.lazy) {
      return lazy;
    }
    if self.context.package_name.is_some() || !self.context.uses_modules {
      return false;
    }
    if is_javascript {
      if let Some(main_module) = main_module.or(self.input.file_options.main_module) {
        return !main_module;
      }
    }
    Path::new(&self.input.path).has_segment("imports")
  }

  fn push_js(&mut self, output: JsOutput) {
    if !output.implicit {
      self.js_outputs.retain(|existing| !(existing.implicit && existing.path() == output.path()));
    }
    self.js_outputs.push(output);
  }

  fn violation(&mut self, message: String) -> anyhow::Error {
    self.contract_violations.push(anyhow::anyhow!("{message}"));
    anyhow::anyhow!("{message}")
  }

  fn target_path(&self, path: Option<String>) -> Option<String> {
    path.map(|path| path.trim_start_matches('/').to_string()).filter(|path| *path != self.input.path)
  }

  /// Moves reported errors either into the diagnostics or, for files whose JS is all lazy, onto
  /// the JS so they surface only if the file is imported.
  pub(crate) fn settle_errors(&mut self, diagnostics: &mut isolink_error::Diagnostics) {
    if self.errors.is_empty() {
      return;
    }
    let errors = std::mem::take(&mut self.errors);
    let all_lazy = self.js_outputs.iter().all(|output| output.lazy);
    match self.js_outputs.first_mut() {
      Some(first) if all_lazy => first.pending_errors.extend(errors),
      _ => diagnostics.extend(errors),
    }
  }
}

impl InputFile for ResourceSlot {
  fn contents(&self) -> &[u8] {
    &self.input.data
  }

  fn package_name(&self) -> Option<&str> {
    self.context.package_name.as_deref()
  }

  fn path_in_package(&self) -> &str {
    &self.input.path
  }

  fn extension(&self) -> Option<&str> {
    self.compiler.as_ref().and_then(|matched| matched.extension.as_deref())
  }

  fn arch(&self) -> &Arch {
    &self.context.arch
  }

  fn source_hash(&self) -> &str {
    &self.input.hash
  }

  fn declared_exports(&self) -> &[PackageExport] {
    &self.context.declared_exports
  }

  fn file_options(&self) -> &FileOptions {
    &self.input.file_options
  }

  fn add_javascript(&mut self, options: AddJavaScriptOptions) -> anyhow::Result<()> {
    let lazy = self.is_lazy(options.lazy, true, options.main_module);
    let hash = options.hash.unwrap_or_else(|| xxhash_hex(options.data.as_bytes()));
    self.push_js(JsOutput {
      source_path: self.input.path.clone(),
      target_path: self.target_path(options.path),
      data: options.data,
      hash,
      source_map: options.source_map.map(|map| SourceMapInput::into_json_string(map).into()),
      lazy,
      bare: options.bare.or(self.input.file_options.bare).unwrap_or(false),
      main_module: options.main_module.or(self.input.file_options.main_module) == Some(true),
      implicit: false,
      pending_errors: Vec::new(),
    });
    Ok(())
  }

  fn add_stylesheet(&mut self, options: AddStylesheetOptions) -> anyhow::Result<()> {
    if self.input.r#type != ResourceType::Source {
      return Err(self.violation(format!(
        "addStylesheet called on non-source resource {}",
        self.input.path
      )));
    }

    let lazy = self.is_lazy(options.lazy, false, None);
    let target_path = self.target_path(options.path);

    if self.context.uses_modules && lazy {
      let data = css_to_commonjs(&options.data);
      self.push_js(JsOutput {
        source_path: self.input.path.clone(),
        target_path,
        hash: xxhash_hex(data.as_bytes()),
        data,
        source_map: None,
        lazy: true,
        bare: false,
        main_module: false,
        implicit: false,
        pending_errors: Vec::new(),
      });
      return Ok(());
    }

    let path = target_path.clone().unwrap_or_else(|| self.input.path.clone());
    self.output_resources.push(Resource {
      r#type: ResourceType::Css,
      hash: options.hash.unwrap_or_else(|| xxhash_hex(options.data.as_bytes())),
      data: options.data.into_bytes().into(),
      serve_path: Some(resource_serve_path(self.package_name(), &path)),
      source_path: Some(self.input.path.clone()),
      target_path: target_path.clone(),
      source_map: options.source_map.map(|map| map.into_json_string().into()),
    });

    if self.context.uses_modules {
      self.push_js(JsOutput {
        source_path: self.input.path.clone(),
        target_path,
        data: APPLIED_STYLES_STUB.to_string(),
        hash: xxhash_hex(APPLIED_STYLES_STUB.as_bytes()),
        source_map: None,
        lazy: true,
        bare: false,
        main_module: false,
        implicit: true,
        pending_errors: Vec::new(),
      });
    }
    Ok(())
  }

  fn add_asset(&mut self, options: AddAssetOptions) -> anyhow::Result<()> {
    let path = options.path.trim_start_matches('/').to_string();
    self.output_resources.push(Resource {
      r#type: ResourceType::Asset,
      hash: options.hash.unwrap_or_else(|| xxhash_hex(&options.data)),
      data: options.data,
      serve_path: Some(resource_serve_path(self.package_name(), &path)),
      source_path: Some(self.input.path.clone()),
      target_path: Some(path),
      source_map: None,
    });
    Ok(())
  }

  fn add_html(&mut self, options: AddHtmlOptions) -> anyhow::Result<()> {
    if !self.context.arch.is_web() {
      return Err(self.violation(format!(
        "Document sections can only be emitted to web targets: {}",
        self.input.path
      )));
    }
    let Some(section) = HtmlSection::parse(&options.section) else {
      return Err(self.violation(format!(
        "'section' must be 'head' or 'body', got {:?} for {}",
        options.section, self.input.path
      )));
    };

    let data = options.data.replace("\r\n", "\n").replace('\r', "\n");
    self.output_resources.push(Resource {
      r#type: match section {
        HtmlSection::Head => ResourceType::Head,
        HtmlSection::Body => ResourceType::Body,
      },
      hash: xxhash_hex(data.as_bytes()),
      data: data.into_bytes().into(),
      serve_path: None,
      source_path: Some(self.input.path.clone()),
      target_path: None,
      source_map: None,
    });
    Ok(())
  }

  fn error(&mut self, message: String, line: Option<u32>, column: Option<u32>) {
    let location = line.map(|line| SourceLocation {
      file: self.input.path.clone(),
      line,
      column: column.unwrap_or(0),
    });
    self.errors.push(BuildDiagnostic::InputFile { message, location });
  }
}

/// A lazy stylesheet as a module that injects it when required.
pub fn css_to_commonjs(css: &str) -> String {
  format!("module.exports = registerStyles({});\n", to_js_string_literal(css))
}

#[cfg(test)]
fn slot(path: &str, package_name: Option<&str>, uses_modules: bool, arch: &str) -> ResourceSlot {
  let context = Arc::new(SlotContext {
    package_name: package_name.map(ArcStr::from),
    arch: Arch::new(arch),
    uses_modules,
    declared_exports: Vec::new(),
  });
  let compiler = CompilerMatch { idx: isolink_plugin::CompilerIdx::from_usize(0), extension: None };
  ResourceSlot::new(InputResource::source(path, "a {}"), Some(compiler), context)
}

#[test]
fn test_lazy_stylesheet_becomes_module() {
  let mut slot = slot("imports/theme.css", None, true, "web.browser");
  slot
    .add_stylesheet(AddStylesheetOptions { data: "a { color: red }".to_string(), ..Default::default() })
    .unwrap();
  assert!(slot.output_resources.is_empty());
  assert_eq!(slot.js_outputs.len(), 1);
  assert!(slot.js_outputs[0].lazy);
  assert_eq!(slot.js_outputs[0].data, "module.exports = registerStyles(\"a { color: red }\");\n");
}

#[test]
fn test_eager_stylesheet_adds_implicit_stub() {
  let mut slot = slot("client/theme.css", None, true, "web.browser");
  slot.add_stylesheet(AddStylesheetOptions { data: "a {}".to_string(), ..Default::default() }).unwrap();
  assert_eq!(slot.output_resources.len(), 1);
  assert_eq!(slot.output_resources[0].serve_path.as_deref(), Some("/client/theme.css"));
  assert!(slot.js_outputs[0].implicit && slot.js_outputs[0].lazy);

  slot.add_javascript(AddJavaScriptOptions { data: "x();".to_string(), ..Default::default() }).unwrap();
  assert_eq!(slot.js_outputs.len(), 1);
  assert!(!slot.js_outputs[0].implicit);
}

#[test]
fn test_laziness_defaults() {
  let app_slot = slot("imports/lib.js", None, true, "os");
  assert!(app_slot.is_lazy(None, true, None));
  assert!(!app_slot.is_lazy(None, true, Some(true)));
  assert!(app_slot.is_lazy(None, true, Some(false)));
  assert!(!app_slot.is_lazy(Some(false), true, None));
  assert!(!slot("client/lib.js", None, true, "os").is_lazy(None, true, None));
  assert!(!slot("imports/lib.js", None, false, "os").is_lazy(None, true, None));
  assert!(!slot("imports/lib.js", Some("core"), true, "os").is_lazy(None, true, None));
}

#[test]
fn test_html_only_on_web() {
  let mut server = slot("head.html", None, true, "os.linux");
  let options = AddHtmlOptions { section: "head".to_string(), data: "<title>x</title>".to_string() };
  assert!(server.add_html(options.clone()).is_err());
  assert_eq!(server.contract_violations.len(), 1);

  let mut web = slot("head.html", None, true, "web.browser");
  web.add_html(options).unwrap();
  assert_eq!(web.output_resources[0].r#type, ResourceType::Head);
  assert!(
    web.add_html(AddHtmlOptions { section: "footer".to_string(), data: String::new() }).is_err()
  );
}

#[test]
fn test_errors_on_lazy_files_are_deferred() {
  let mut slot = slot("imports/broken.js", None, true, "web.browser");
  slot.add_javascript(AddJavaScriptOptions { data: String::new(), ..Default::default() }).unwrap();
  slot.error("Unexpected token".to_string(), Some(1), Some(2));

  let mut diagnostics = isolink_error::Diagnostics::default();
  slot.settle_errors(&mut diagnostics);
  assert!(diagnostics.is_empty());
  assert_eq!(slot.js_outputs[0].pending_errors.len(), 1);
}
