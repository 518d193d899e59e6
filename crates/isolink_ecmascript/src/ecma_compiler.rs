use arcstr::ArcStr;
use oxc::{
  parser::{ParseOptions, Parser},
  span::SourceType,
};

use crate::ecma_ast::{
  EcmaAst,
  program_cell::{ProgramCell, ProgramCellDependent, ProgramCellOwner},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
  pub message: String,
  /// 1-based
  pub line: u32,
  /// 0-based
  pub column: u32,
}

impl ParseError {
  fn at_offset(message: String, source: &str, offset: usize) -> Self {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(before.len(), |i| before.len() - i - 1);
    Self {
      message,
      line: u32::try_from(line).unwrap_or(u32::MAX),
      column: u32::try_from(column).unwrap_or(u32::MAX),
    }
  }
}

pub struct EcmaCompiler;

impl EcmaCompiler {
  /// Parses CommonJS or ES module code. Top-level `return` is accepted since installed modules
  /// run inside a function.
  pub fn parse(source: impl Into<ArcStr>) -> Result<EcmaAst, ParseError> {
    let source_type = SourceType::default().with_module(true);
    let allocator = oxc::allocator::Allocator::default();
    let owner = ProgramCellOwner { source: source.into(), allocator };
    let program = ProgramCell::try_new(owner, |owner| {
      let ret = Parser::new(&owner.allocator, &owner.source, source_type)
        .with_options(ParseOptions { allow_return_outside_function: true, ..ParseOptions::default() })
        .parse();
      match ret.errors.into_iter().next() {
        None => Ok(ProgramCellDependent { program: ret.program }),
        Some(error) => {
          let offset = error
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map_or(0, oxc::diagnostics::LabeledSpan::offset);
          Err(ParseError::at_offset(error.message.to_string(), &owner.source, offset))
        }
      }
    })?;

    Ok(EcmaAst { program, source_type })
  }
}

#[test]
fn test_parse_accepts_commonjs_and_esm() {
  assert!(EcmaCompiler::parse("import a from 'a';\nmodule.exports = a;\nreturn;").is_ok());
}

#[test]
fn test_parse_error_location() {
  let error = EcmaCompiler::parse("var a = 1;\nvar b = ;\n").unwrap_err();
  assert_eq!(error.line, 2);
  assert_eq!(error.column, 8);
}
