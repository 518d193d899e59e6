mod build_error;
mod diagnostic;

pub use crate::{
  build_error::{BuildError, BuildResult},
  diagnostic::{BuildDiagnostic, Diagnostics, DiagnosticsMark, Severity, SourceLocation},
};
