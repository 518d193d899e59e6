use isolink_utils::indexmap::FxIndexMap;
use oxc::{
  ast::ast::{
    Argument, CallExpression, ExportAllDeclaration, ExportNamedDeclaration, Expression,
    ImportDeclaration, ImportExpression,
  },
  ast_visit::{Visit, walk},
  semantic::{Scoping, SemanticBuilder},
};

use crate::EcmaAst;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportedModule {
  /// Only ever requested through `import()`.
  pub dynamic: bool,
  /// Only ever requested through a `require` that is not the free variable, as in bundles that
  /// ship their own module system.
  pub possibly_spurious: bool,
}

struct ImportedModulesCollector<'s> {
  scoping: &'s Scoping,
  modules: FxIndexMap<String, ImportedModule>,
}

impl ImportedModulesCollector<'_> {
  fn add(&mut self, specifier: &str, dynamic: bool, possibly_spurious: bool) {
    self
      .modules
      .entry(specifier.to_string())
      .and_modify(|module| {
        module.dynamic &= dynamic;
        module.possibly_spurious &= possibly_spurious;
      })
      .or_insert(ImportedModule { dynamic, possibly_spurious });
  }
}

impl<'a> Visit<'a> for ImportedModulesCollector<'_> {
  fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
    self.add(&decl.source.value, false, false);
  }

  fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
    self.add(&decl.source.value, false, false);
  }

  fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
    if let Some(source) = &decl.source {
      self.add(&source.value, false, false);
    }
    walk::walk_export_named_declaration(self, decl);
  }

  fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
    if let Expression::StringLiteral(source) = &expr.source {
      self.add(&source.value, true, false);
    }
    walk::walk_import_expression(self, expr);
  }

  fn visit_call_expression(&mut self, expr: &CallExpression<'a>) {
    if let (Expression::Identifier(callee), [Argument::StringLiteral(source)]) =
      (&expr.callee, expr.arguments.as_slice())
    {
      if callee.name == "require" {
        let require_is_bound = callee
          .reference_id
          .get()
          .is_some_and(|reference_id| self.scoping.get_reference(reference_id).symbol_id().is_some());
        self.add(&source.value, false, require_is_bound);
      }
    }
    walk::walk_call_expression(self, expr);
  }
}

impl EcmaAst {
  /// Module specifiers this file requests through `import`, `export ... from`, `import()` or
  /// `require("...")`, in source order.
  pub fn imported_modules(&self) -> FxIndexMap<String, ImportedModule> {
    let program = self.program();
    let scoping = SemanticBuilder::new().build(program).semantic.into_scoping();
    let mut collector = ImportedModulesCollector { scoping: &scoping, modules: FxIndexMap::default() };
    collector.visit_program(program);
    collector.modules
  }
}

#[test]
fn test_imported_modules_in_source_order() {
  let ast = crate::EcmaCompiler::parse(
    r#"
      import a from "./a";
      const b = require("./b");
      export * from "./c";
      export { d } from "./d";
      import("./lazy").then(() => require("./a"));
      require(dynamicName);
      function load() { return import("./b"); }
    "#,
  )
  .unwrap();

  let modules = ast.imported_modules();
  assert_eq!(modules.keys().map(String::as_str).collect::<Vec<_>>(), [
    "./a", "./b", "./c", "./d", "./lazy"
  ]);
  assert!(modules["./lazy"].dynamic);
  assert!(!modules["./b"].dynamic);
  assert!(!modules["./b"].possibly_spurious);
}

#[test]
fn test_bound_require_is_possibly_spurious() {
  let ast = crate::EcmaCompiler::parse(
    r#"
      (function (require) { require("./bundled"); })(localRequire);
      require("./real");
      function load(require) { return require("./both"); }
      import "./both";
    "#,
  )
  .unwrap();

  let modules = ast.imported_modules();
  assert!(modules["./bundled"].possibly_spurious);
  assert!(!modules["./real"].possibly_spurious);
  assert!(!modules["./both"].possibly_spurious);
}
