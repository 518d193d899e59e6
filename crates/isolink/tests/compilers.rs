mod common;

use std::{borrow::Cow, sync::Arc};

use common::{UpperCaseCompiler, app, build, memory_fs, options, source};
use isolink::{
  AddHtmlOptions, AddStylesheetOptions, BuildDiagnostic, Bundler, CompilerPlugin,
  CompilerRegistry, InputFile, ResourceType,
};

struct FailingCompiler;

impl CompilerPlugin for FailingCompiler {
  fn name(&self) -> Cow<'static, str> {
    "failing".into()
  }

  fn process_files_for_target(&self, _input_files: &mut [&mut dyn InputFile]) -> anyhow::Result<()> {
    anyhow::bail!("cannot compile")
  }
}

struct PanickingCompiler;

impl CompilerPlugin for PanickingCompiler {
  fn name(&self) -> Cow<'static, str> {
    "panicking".into()
  }

  fn process_files_for_target(&self, _input_files: &mut [&mut dyn InputFile]) -> anyhow::Result<()> {
    panic!("compiler bug")
  }
}

struct StylesheetCompiler;

impl CompilerPlugin for StylesheetCompiler {
  fn name(&self) -> Cow<'static, str> {
    "css".into()
  }

  fn process_files_for_target(&self, input_files: &mut [&mut dyn InputFile]) -> anyhow::Result<()> {
    for file in input_files.iter_mut() {
      let data = file.contents_as_string()?.to_string();
      file.add_stylesheet(AddStylesheetOptions { data, ..AddStylesheetOptions::default() })?;
    }
    Ok(())
  }
}

struct HeadCompiler;

impl CompilerPlugin for HeadCompiler {
  fn name(&self) -> Cow<'static, str> {
    "head".into()
  }

  fn process_files_for_target(&self, input_files: &mut [&mut dyn InputFile]) -> anyhow::Result<()> {
    for file in input_files.iter_mut() {
      let data = file.contents_as_string()?.to_string();
      file.add_html(AddHtmlOptions { section: "head".to_string(), data })?;
    }
    Ok(())
  }
}

#[test]
fn compiler_failures_stay_in_their_job() {
  let mut registry = CompilerRegistry::default();
  registry.register(Arc::new(FailingCompiler), &["fail"], &[]);
  registry.register(Arc::new(PanickingCompiler), &["boom"], &[]);
  registry.register(Arc::new(UpperCaseCompiler), &["up"], &[]);

  let output = build(
    vec![app(vec![source("a.fail", ""), source("b.boom", ""), source("c.up", "shout();")])],
    registry,
    memory_fs(&[]),
  );

  let jobs = output
    .diagnostics
    .iter()
    .filter_map(|diagnostic| match diagnostic {
      BuildDiagnostic::CompilerException { job, message } => Some((job.as_str(), message.as_str())),
      _ => None,
    })
    .collect::<Vec<_>>();
  assert_eq!(jobs, [
    ("processing files with failing", "cannot compile"),
    ("processing files with panicking", "compiler bug")
  ]);
  assert!(output.js_code().contains("SHOUT();"));
}

#[test]
fn files_without_a_compiler_are_reported() {
  let output = build(
    vec![app(vec![source("style.less", "a { b: c }"), source("main.js", "run();")])],
    CompilerRegistry::default(),
    memory_fs(&[]),
  );

  assert_eq!(output.diagnostics.len(), 1);
  assert_eq!(
    output.diagnostics[0].to_string(),
    "no plugin found for style.less in the app; a plugin for *.less was active when it was published but none is now"
  );
  assert!(!output.js_code().contains("a { b: c }"));
}

#[test]
fn stylesheets_become_resources_or_modules() {
  let mut registry = CompilerRegistry::default();
  registry.register(Arc::new(StylesheetCompiler), &["css"], &[]);

  let output = Bundler::new(options("web.browser"), registry, memory_fs(&[]))
    .build(vec![app(vec![
      source("client/main.css", "body { margin: 0 }"),
      source("imports/theme.css", "a { color: red }"),
      source("client/main.js", "import '../imports/theme.css';"),
    ])])
    .unwrap();
  assert!(output.diagnostics.is_empty());

  let css = output.resources().filter(|resource| resource.r#type == ResourceType::Css).collect::<Vec<_>>();
  assert_eq!(css.len(), 1);
  assert_eq!(css[0].serve_path.as_deref(), Some("/client/main.css"));

  let code = output.js_code();
  assert!(code.contains("module.exports = registerStyles(\"a { color: red }\");"));
  assert!(!code.contains("These styles have already been applied"));
}

#[test]
fn html_on_server_targets_is_fatal() {
  let mut registry = CompilerRegistry::default();
  registry.register(Arc::new(HeadCompiler), &["html"], &[]);

  let result = Bundler::new(options("os"), registry, memory_fs(&[]))
    .build(vec![app(vec![source("head.html", "<title>x</title>")])]);
  let err = result.err().unwrap();
  assert_eq!(err.len(), 1);
  assert!(err.to_string().contains("Document sections can only be emitted to web targets"));
}
