use isolink_utils::concat_string;

/// `acme:ui` is served as `acme_ui`.
pub fn package_serve_name(name: &str) -> String {
  name.replace(':', "_")
}

/// Where a resource emitted for `path` is served from.
pub fn resource_serve_path(package_name: Option<&str>, path: &str) -> String {
  let path = path.trim_start_matches('/');
  match package_name {
    Some(name) => concat_string!("/packages/", package_serve_name(name), "/", path),
    None => concat_string!("/", path),
  }
}

/// The path shown in file banners and used as source map source name.
pub fn display_path(package_name: Option<&str>, source_path: &str) -> String {
  let source_path = source_path.trim_start_matches('/');
  match package_name {
    Some(name) => concat_string!("packages/", package_serve_name(name), "/", source_path),
    None => source_path.to_string(),
  }
}

/// Serve path of the single JS file a batch links into.
pub fn combined_serve_path(package_name: Option<&str>) -> String {
  match package_name {
    Some(name) => concat_string!("/packages/", package_serve_name(name), ".js"),
    None => "/app.js".to_string(),
  }
}

#[test]
fn test_serve_paths() {
  assert_eq!(resource_serve_path(Some("acme:ui"), "img/logo.png"), "/packages/acme_ui/img/logo.png");
  assert_eq!(resource_serve_path(None, "/client/style.css"), "/client/style.css");
  assert_eq!(display_path(Some("core"), "greet.js"), "packages/core/greet.js");
  assert_eq!(combined_serve_path(Some("acme:ui")), "/packages/acme_ui.js");
  assert_eq!(combined_serve_path(None), "/app.js");
}
