use std::{borrow::Cow, sync::LazyLock};

use isolink_ecmascript::EcmaCompiler;
use isolink_error::{BuildDiagnostic, Diagnostics, SourceLocation};
use isolink_sourcemap::{CombinedSource, SourceMap, original_position};
use isolink_utils::{concat_string, indexmap::FxIndexSet, path_ext::path_segments};
use regex::Regex;

use crate::{types::scanned_file::ScannedFile, utils::serve_path::display_path};

pub const MIN_BANNER_WIDTH: usize = 80;

/// Checked in order. The first name found fixes the parameter list up to and including it.
static CLOSURE_PARAMS: LazyLock<[(Regex, &str); 5]> = LazyLock::new(|| {
  [
    (r"\b__dirname\b", "require,exports,module,__filename,__dirname"),
    (r"\b__filename\b", "require,exports,module,__filename"),
    (r"\bmodule\b", "require,exports,module"),
    (r"\bexports\b", "require,exports"),
    (r"\brequire\b", "require"),
  ]
  .map(|(pattern, params)| (Regex::new(pattern).expect("Invalid closure parameter regex"), params))
});

pub fn divider_line(width: usize) -> String {
  concat_string!("/".repeat(width), "\n")
}

/// Frames `lines` in `//` comments, at least [`MIN_BANNER_WIDTH`] wide.
pub fn banner(lines: &[&str]) -> String {
  let longest = lines.iter().map(|line| line.chars().count()).max().unwrap_or_default();
  let width = (longest + 6).max(MIN_BANNER_WIDTH);
  let divider = divider_line(width);
  let spacer = concat_string!("// ", " ".repeat(width - 6), " //\n");

  let mut buf = concat_string!(divider, spacer);
  for line in lines {
    buf.push_str(&format!("// {line:<inner$} //\n", inner = width - 6));
  }
  buf.push_str(&spacer);
  buf.push_str(&divider);
  buf
}

fn closure_params(code: &str) -> &'static str {
  CLOSURE_PARAMS.iter().find(|(re, _)| re.is_match(code)).map_or("", |(_, params)| params)
}

/// How a file is wrapped in the linked output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
  /// `(function(){ ... }).call(this);`
  Closure,
  /// `function module(require,exports,...){ ... }` inside the install tree.
  Module,
}

/// One scanned file on its way into the linked output. Its code may be replaced when static
/// analysis fails.
pub struct LinkFile<'a> {
  pub file: &'a ScannedFile,
  pub code: Cow<'a, str>,
  pub map: Option<SourceMap>,
  pub display_path: String,
}

impl<'a> LinkFile<'a> {
  pub fn new(file: &'a ScannedFile, package_name: Option<&str>) -> Self {
    Self {
      file,
      code: Cow::Borrowed(&file.data),
      map: file.source_map.as_deref().and_then(|map| SourceMap::from_json_string(map).ok()),
      display_path: display_path(package_name, &file.source_path),
    }
  }

  /// Globals the file assigns without declaring. Files from npm packages are skipped. Code that
  /// fails to parse is reported and dropped from the output.
  pub fn assigned_globals(&mut self, diagnostics: &mut Diagnostics) -> FxIndexSet<String> {
    if self.is_npm_module() {
      return FxIndexSet::default();
    }

    match EcmaCompiler::parse(self.code.as_ref()) {
      Ok(ast) => ast.assigned_globals(),
      Err(err) => {
        let mut location =
          SourceLocation { file: self.display_path.clone(), line: err.line, column: err.column };
        let original = self
          .map
          .as_ref()
          .and_then(|map| original_position(map, err.line.saturating_sub(1), err.column));
        if let Some(position) = original {
          if let Some(source) = position.source {
            location = SourceLocation { file: source, line: position.line + 1, column: position.column };
          }
        }
        diagnostics.push(BuildDiagnostic::Parse { message: err.message, location });

        self.code = Cow::Borrowed("");
        self.map = None;
        FxIndexSet::default()
      }
    }
  }

  fn is_npm_module(&self) -> bool {
    let Some(install_path) = &self.file.install_path else { return false };
    let mut segments = path_segments(install_path).skip_while(|segment| *segment != "node_modules");
    segments.next().is_some() && segments.next() != Some("meteor")
  }

  /// Appends the wrapped file. Bare files get the banner only.
  pub fn write_to(&self, combined: &mut CombinedSource, wrapper: Wrapper) {
    let bare = self.file.bare;
    let mut header = String::new();
    if !bare {
      match wrapper {
        Wrapper::Closure => header.push_str("(function(){"),
        Wrapper::Module => {
          header.push_str("function module(");
          header.push_str(closure_params(&self.code));
          header.push_str("){");
        }
      }
      header.push_str("\n\n");
    }

    let mut banner_lines = vec![self.display_path.as_str()];
    if bare {
      banner_lines.push("This file is in bare mode and is not in its own closure.");
    }
    header.push_str(&banner(&banner_lines));
    header.push('\n');
    combined.add_generated_code(&header);

    if !self.code.is_empty() {
      combined.add_code_with_map(&self.display_path, &self.code, self.map.clone());
      if !self.code.ends_with('\n') {
        combined.add_generated_code("\n");
      }
    }

    let mut footer = concat_string!(divider_line(MIN_BANNER_WIDTH), "\n");
    if !bare {
      footer.push_str(match wrapper {
        Wrapper::Closure => "}).call(this);\n",
        Wrapper::Module => "}",
      });
    }
    combined.add_generated_code(&footer);
  }
}

#[test]
fn test_banner() {
  let text = banner(&["packages/core/greet.js"]);
  let lines = text.lines().collect::<Vec<_>>();
  assert_eq!(lines.len(), 5);
  assert_eq!(lines[0], "/".repeat(80));
  assert_eq!(lines[2], format!("// {:<74} //", "packages/core/greet.js"));
  assert!(lines.iter().all(|line| line.len() == 80));

  let long = "x".repeat(90);
  assert_eq!(banner(&[&long]).lines().next().map(str::len), Some(96));
}

#[test]
fn test_closure_params() {
  assert_eq!(closure_params("console.log(1)"), "");
  assert_eq!(closure_params("require('./a')"), "require");
  assert_eq!(closure_params("exports.a = 1"), "require,exports");
  assert_eq!(closure_params("module.exports = __filename"), "require,exports,module,__filename");
  assert_eq!(closure_params("modules.length"), "");
}
