use bytes::Bytes;
use rand::{distr::Alphanumeric, Rng};

pub fn get_test_key(i: usize) -> Bytes {
  Bytes::from(format!("flash-kv-key-{:09}", i))
}

/// A value with a fixed prefix and a random 16 character tail.
pub fn get_test_value(i: usize) -> Bytes {
  let tail: String = rand::rng()
    .sample_iter(&Alphanumeric)
    .take(16)
    .map(char::from)
    .collect();
  Bytes::from(format!("flash-kv-value-{:09}-{}", i, tail))
}
