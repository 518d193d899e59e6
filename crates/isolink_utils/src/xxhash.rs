use xxhash_rust::xxh3::{Xxh3, xxh3_128};

/// Lowercase hex xxh3-128 digest, used for every content hash and cache key.
pub fn xxhash_hex(input: &[u8]) -> String {
  format!("{:032x}", xxh3_128(input))
}

/// Incremental form of [`xxhash_hex`] for hashing several parts without joining them.
#[derive(Default)]
pub struct HexHasher(Xxh3);

impl HexHasher {
  #[must_use]
  pub fn update(mut self, input: impl AsRef<[u8]>) -> Self {
    self.0.update(input.as_ref());
    self
  }

  pub fn finish(&self) -> String {
    format!("{:032x}", self.0.digest128())
  }
}

#[test]
fn test_xxhash_hex() {
  let digest = xxhash_hex(b"hello");
  assert_eq!(digest.len(), 32);
  assert_eq!(digest, xxhash_hex(b"hello"));
  assert_ne!(digest, xxhash_hex(b"hello!"));
  assert_eq!(HexHasher::default().update("hel").update("lo").finish(), digest);
}
