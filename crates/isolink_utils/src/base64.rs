use base64_simd::STANDARD;

pub fn to_standard_base64(input: impl AsRef<[u8]>) -> String {
  STANDARD.encode_to_string(input)
}

pub fn from_standard_base64(input: &str) -> Option<Vec<u8>> {
  STANDARD.decode_to_vec(input).ok()
}

#[test]
fn test_standard_base64() {
  assert_eq!(to_standard_base64(b"console.log(1);\n"), "Y29uc29sZS5sb2coMSk7Cg==");
  assert_eq!(from_standard_base64("aGk=").as_deref(), Some(&b"hi"[..]));
  assert!(from_standard_base64("*not base64*").is_none());
}
