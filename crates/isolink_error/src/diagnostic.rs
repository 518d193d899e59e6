use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Error,
  Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
  pub file: String,
  /// 1-based
  pub line: u32,
  /// 0-based
  pub column: u32,
}

impl fmt::Display for SourceLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}:{}", self.file, self.line, self.column)
  }
}

/// A recoverable problem found while building. Fatal conditions travel as `BuildError` instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildDiagnostic {
  #[error(
    "no plugin found for {path} in {package}; a plugin for *.{extension} was active when it was published but none is now"
  )]
  UnresolvablePlugin { path: String, package: String, extension: String },

  #[error("{job}: {message}")]
  CompilerException { job: String, message: String },

  #[error("{}{message}", .location.as_ref().map(|loc| format!("{loc}: ")).unwrap_or_default())]
  InputFile { message: String, location: Option<SourceLocation> },

  #[error("{location}: {message}")]
  Parse { message: String, location: SourceLocation },

  #[error("Unable to resolve some modules:\n\n  \"{id}\" in {parent_path} ({arch})")]
  MissingModule { id: String, parent_path: String, arch: String },

  #[error("ignoring unreadable linker cache entry {path}: {message}")]
  CacheCorruption { path: String, message: String },
}

impl BuildDiagnostic {
  pub fn severity(&self) -> Severity {
    match self {
      Self::MissingModule { .. } | Self::CacheCorruption { .. } => Severity::Warning,
      Self::UnresolvablePlugin { .. }
      | Self::CompilerException { .. }
      | Self::InputFile { .. }
      | Self::Parse { .. } => Severity::Error,
    }
  }

  pub fn is_error(&self) -> bool {
    self.severity() == Severity::Error
  }
}

/// Opaque position in a [`Diagnostics`] list, see [`Diagnostics::mark`].
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsMark(usize);

/// Diagnostics accumulated over one build.
#[derive(Debug, Default)]
pub struct Diagnostics {
  messages: Vec<BuildDiagnostic>,
}

impl Diagnostics {
  pub fn push(&mut self, diagnostic: BuildDiagnostic) {
    self.messages.push(diagnostic);
  }

  pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = BuildDiagnostic>) {
    self.messages.extend(diagnostics);
  }

  pub fn mark(&self) -> DiagnosticsMark {
    DiagnosticsMark(self.messages.len())
  }

  pub fn has_errors_since(&self, mark: DiagnosticsMark) -> bool {
    self.messages[mark.0..].iter().any(BuildDiagnostic::is_error)
  }

  pub fn has_errors(&self) -> bool {
    self.messages.iter().any(BuildDiagnostic::is_error)
  }

  pub fn errors(&self) -> impl Iterator<Item = &BuildDiagnostic> {
    self.messages.iter().filter(|d| d.is_error())
  }

  pub fn warnings(&self) -> impl Iterator<Item = &BuildDiagnostic> {
    self.messages.iter().filter(|d| !d.is_error())
  }

  pub fn iter(&self) -> std::slice::Iter<'_, BuildDiagnostic> {
    self.messages.iter()
  }

  pub fn len(&self) -> usize {
    self.messages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.messages.is_empty()
  }

  pub fn into_vec(self) -> Vec<BuildDiagnostic> {
    self.messages
  }
}

impl<'a> IntoIterator for &'a Diagnostics {
  type Item = &'a BuildDiagnostic;
  type IntoIter = std::slice::Iter<'a, BuildDiagnostic>;

  fn into_iter(self) -> Self::IntoIter {
    self.messages.iter()
  }
}

#[test]
fn test_has_errors_since_ignores_earlier_messages() {
  let mut diagnostics = Diagnostics::default();
  diagnostics.push(BuildDiagnostic::CompilerException {
    job: "babel".to_string(),
    message: "boom".to_string(),
  });
  let mark = diagnostics.mark();
  assert!(!diagnostics.has_errors_since(mark));

  diagnostics.push(BuildDiagnostic::MissingModule {
    id: "fs".to_string(),
    parent_path: "/app/main.js".to_string(),
    arch: "web.browser".to_string(),
  });
  assert!(!diagnostics.has_errors_since(mark));
  assert_eq!(diagnostics.warnings().count(), 1);

  diagnostics.push(BuildDiagnostic::Parse {
    message: "Unexpected token".to_string(),
    location: SourceLocation { file: "a.js".to_string(), line: 3, column: 4 },
  });
  assert!(diagnostics.has_errors_since(mark));
  assert_eq!(diagnostics.errors().count(), 2);
}

#[test]
fn test_unresolvable_plugin_message() {
  let diagnostic = BuildDiagnostic::UnresolvablePlugin {
    path: "style.less".to_string(),
    package: "the app".to_string(),
    extension: "less".to_string(),
  };
  assert_eq!(
    diagnostic.to_string(),
    "no plugin found for style.less in the app; a plugin for *.less was active when it was published but none is now"
  );
}
