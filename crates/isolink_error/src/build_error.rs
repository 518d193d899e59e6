use std::ops::{Deref, DerefMut};

#[derive(Debug)]
pub struct BuildError(pub Vec<anyhow::Error>);

impl Deref for BuildError {
  type Target = Vec<anyhow::Error>;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl DerefMut for BuildError {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.0
  }
}

impl From<anyhow::Error> for BuildError {
  fn from(error: anyhow::Error) -> Self {
    Self(vec![error])
  }
}

impl From<Vec<anyhow::Error>> for BuildError {
  fn from(errors: Vec<anyhow::Error>) -> Self {
    Self(errors)
  }
}

impl std::fmt::Display for BuildError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for (i, error) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("\n")?;
      }
      write!(f, "{error:#}")?;
    }
    Ok(())
  }
}

pub type BuildResult<T> = anyhow::Result<T, BuildError>;

#[test]
fn test_display_joins_errors() {
  let error = BuildError::from(vec![anyhow::anyhow!("first"), anyhow::anyhow!("second")]);
  assert_eq!(error.len(), 2);
  assert_eq!(error.to_string(), "first\nsecond");
}
