mod assigned_globals;
mod ecma_ast;
mod ecma_compiler;
mod imported_modules;

pub use crate::{
  ecma_ast::EcmaAst,
  ecma_compiler::{EcmaCompiler, ParseError},
  imported_modules::ImportedModule,
};
