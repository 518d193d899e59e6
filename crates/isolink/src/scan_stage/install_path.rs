use std::path::{Component, Path};

use isolink_common::Arch;
use isolink_utils::{concat_string, path_ext::PathExt};

const EXCLUDED_TOP_LEVEL_DIRS: [&str; 4] = ["private", "packages", "programs", "cordova-build-override"];

/// Decides where files are registered with the runtime module system.
pub struct InstallPathRules<'a> {
  pub package_name: Option<&'a str>,
  pub arch: &'a Arch,
  pub source_root: &'a Path,
  pub node_modules_paths: &'a [std::path::PathBuf],
}

impl InstallPathRules<'_> {
  pub fn install_path(&self, abs_path: &Path) -> Option<String> {
    for node_modules in self.node_modules_paths {
      if let Ok(rel) = abs_path.strip_prefix(node_modules) {
        return Some(self.with_package_prefix(&concat_string!("node_modules/", rel.expect_to_slash())));
      }
    }

    let rel = abs_path.strip_prefix(self.source_root).ok()?;
    let mut segments = rel.components().filter_map(|component| match component {
      Component::Normal(segment) => segment.to_str(),
      _ => None,
    });
    let first = segments.next()?;

    if first != "node_modules" {
      if self.package_name.is_none() && EXCLUDED_TOP_LEVEL_DIRS.contains(&first) {
        return None;
      }
      let dirs = rel.parent().map(|parent| parent.components().count()).unwrap_or_default();
      if rel.components().take(dirs).any(|c| c.as_os_str().to_string_lossy().starts_with('.')) {
        return None;
      }
      if self.package_name.is_none() {
        let excluded_dir = if self.arch.is_web() { "server" } else { "client" };
        if rel.parent().is_some_and(|parent| parent.has_segment(excluded_dir)) {
          return None;
        }
      }
    }

    Some(self.with_package_prefix(&rel.expect_to_slash()))
  }

  fn with_package_prefix(&self, path: &str) -> String {
    match self.package_name {
      Some(name) => concat_string!("node_modules/meteor/", name, "/", path),
      None => path.to_string(),
    }
  }
}

#[cfg(test)]
fn install_path(package_name: Option<&str>, arch: &str, abs_path: &str) -> Option<String> {
  let arch = Arch::new(arch);
  let node_modules_paths = [std::path::PathBuf::from("/npm/node_modules")];
  InstallPathRules {
    package_name,
    arch: &arch,
    source_root: Path::new("/app"),
    node_modules_paths: &node_modules_paths,
  }
  .install_path(Path::new(abs_path))
}

#[test]
fn test_app_install_paths() {
  assert_eq!(install_path(None, "web.browser", "/app/client/main.js").as_deref(), Some("client/main.js"));
  assert_eq!(install_path(None, "web.browser", "/app/server/main.js"), None);
  assert_eq!(install_path(None, "os", "/app/client/main.js"), None);
  assert_eq!(install_path(None, "os", "/app/server/main.js").as_deref(), Some("server/main.js"));
  assert_eq!(install_path(None, "os", "/app/private/data.js"), None);
  assert_eq!(install_path(None, "os", "/app/.hidden/x.js"), None);
  assert_eq!(install_path(None, "os", "/app/.eslintrc.js").as_deref(), Some(".eslintrc.js"));
  assert_eq!(install_path(None, "os", "/elsewhere/x.js"), None);
  assert_eq!(
    install_path(None, "web.browser", "/app/node_modules/lib/server/index.js").as_deref(),
    Some("node_modules/lib/server/index.js")
  );
}

#[test]
fn test_package_install_paths() {
  assert_eq!(
    install_path(Some("core"), "web.browser", "/app/greet.js").as_deref(),
    Some("node_modules/meteor/core/greet.js")
  );
  assert_eq!(
    install_path(Some("core"), "os", "/npm/node_modules/dep/index.js").as_deref(),
    Some("node_modules/meteor/core/node_modules/dep/index.js")
  );
}
