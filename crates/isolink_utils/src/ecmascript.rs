use oxc::syntax::identifier;

use crate::concat_string;

pub fn is_validate_identifier_name(name: &str) -> bool {
  identifier::is_identifier_name(name)
}

/// `obj.prop` when `prop` is a valid identifier, `obj["prop"]` otherwise.
pub fn property_access_str(obj: &str, prop: &str) -> String {
  if is_validate_identifier_name(prop) {
    concat_string!(obj, ".", prop)
  } else {
    concat_string!(obj, "[", to_js_string_literal(prop), "]")
  }
}

/// Quotes `value` as a double-quoted JavaScript string literal.
pub fn to_js_string_literal(value: &str) -> String {
  serde_json::Value::String(value.to_string()).to_string()
}

#[test]
fn test_is_validate_identifier_name() {
  assert!(is_validate_identifier_name("foo"));
  assert!(!is_validate_identifier_name("1aaaa"));
  assert!(!is_validate_identifier_name("😈"));
}

#[test]
fn test_property_access_str() {
  assert_eq!(property_access_str("Package", "core"), "Package.core");
  assert_eq!(property_access_str("Package", "iron-router"), "Package[\"iron-router\"]");
  assert_eq!(property_access_str("Package", "acme:ui"), "Package[\"acme:ui\"]");
}
