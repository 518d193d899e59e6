use std::fmt;

use arcstr::ArcStr;

/// Build target architecture such as `os.linux.x86_64` or `web.browser`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arch(ArcStr);

impl Arch {
  pub fn new(arch: impl Into<ArcStr>) -> Self {
    Self(arch.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Prefix match on whole `.`-separated parts: `web.browser` matches `web`, never `web.brow`.
  pub fn matches(&self, prefix: &str) -> bool {
    self.0.strip_prefix(prefix).is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
  }

  pub fn is_web(&self) -> bool {
    self.matches("web")
  }

  pub fn is_server(&self) -> bool {
    self.matches("os")
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl Default for Arch {
  fn default() -> Self {
    Self(arcstr::literal!("os"))
  }
}

#[test]
fn test_arch_matches() {
  let arch = Arch::new("web.browser.legacy");
  assert!(arch.matches("web"));
  assert!(arch.matches("web.browser"));
  assert!(!arch.matches("web.browser.leg"));
  assert!(!Arch::new("webx").is_web());
  assert!(Arch::new("os.linux.x86_64").is_server());
}
