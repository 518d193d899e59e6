use isolink_utils::indexmap::FxIndexSet;
use oxc::{
  ast::ast::IdentifierReference,
  ast_visit::Visit,
  semantic::{Scoping, SemanticBuilder},
};

use crate::EcmaAst;

struct AssignedGlobalsCollector<'s> {
  scoping: &'s Scoping,
  names: FxIndexSet<String>,
}

impl<'a> Visit<'a> for AssignedGlobalsCollector<'_> {
  fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
    let Some(reference_id) = ident.reference_id.get() else { return };
    let reference = self.scoping.get_reference(reference_id);
    if reference.symbol_id().is_none() && reference.flags().is_write() {
      self.names.insert(ident.name.to_string());
    }
  }
}

impl EcmaAst {
  /// Names assigned at any depth without a declaration in scope, in order of first assignment.
  pub fn assigned_globals(&self) -> FxIndexSet<String> {
    let program = self.program();
    let scoping = SemanticBuilder::new().build(program).semantic.into_scoping();
    let mut collector = AssignedGlobalsCollector { scoping: &scoping, names: FxIndexSet::default() };
    collector.visit_program(program);
    collector.names
  }
}

#[test]
fn test_assigned_globals() {
  let ast = crate::EcmaCompiler::parse(
    r"
      Foo = 1;
      var local = 2;
      local = 3;
      function f(param) { param = 1; Bar = Foo; Bar++; }
      Baz.qux = 4;
      [Quux] = [5];
    ",
  )
  .unwrap();

  assert_eq!(ast.assigned_globals().into_iter().collect::<Vec<_>>(), ["Foo", "Bar", "Quux"]);
}
