use std::path::{Path, PathBuf};

use serde::Deserialize;

/// The subset of `package.json` module resolution cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageJson {
  pub path: PathBuf,
  pub name: Option<String>,
  pub version: Option<String>,
  pub main: Option<String>,
  /// Only the string form of `browser` replaces `main`.
  pub browser: Option<String>,
}

#[derive(Deserialize)]
struct RawPackageJson {
  name: Option<serde_json::Value>,
  version: Option<serde_json::Value>,
  main: Option<serde_json::Value>,
  browser: Option<serde_json::Value>,
}

fn as_string(value: Option<serde_json::Value>) -> Option<String> {
  match value {
    Some(serde_json::Value::String(s)) => Some(s),
    _ => None,
  }
}

impl PackageJson {
  pub fn parse(path: &Path, content: &str) -> serde_json::Result<Self> {
    let raw: RawPackageJson = serde_json::from_str(content)?;
    Ok(Self {
      path: path.to_path_buf(),
      name: as_string(raw.name),
      version: as_string(raw.version),
      main: as_string(raw.main),
      browser: as_string(raw.browser),
    })
  }

  pub fn main_field(&self, is_web: bool) -> Option<&str> {
    if is_web {
      if let Some(browser) = &self.browser {
        return Some(browser);
      }
    }
    self.main.as_deref()
  }

  /// `exports.<key> = <value>;` lines for the keys runtime code may read.
  pub fn to_stub_module(&self) -> String {
    let mut code = String::new();
    for (key, value) in [("name", &self.name), ("version", &self.version), ("main", &self.main)] {
      if let Some(value) = value {
        code.push_str("exports.");
        code.push_str(key);
        code.push_str(" = ");
        code.push_str(&isolink_utils::ecmascript::to_js_string_literal(value));
        code.push_str(";\n");
      }
    }
    code
  }
}

#[test]
fn test_package_json_stub() {
  let pkg = PackageJson::parse(
    Path::new("/app/node_modules/lib/package.json"),
    r#"{ "name": "lib", "main": "dist/lib.js", "browser": { "fs": false }, "private": true }"#,
  )
  .unwrap();
  assert_eq!(pkg.main_field(true), Some("dist/lib.js"));
  assert_eq!(pkg.to_stub_module(), "exports.name = \"lib\";\nexports.main = \"dist/lib.js\";\n");
}
