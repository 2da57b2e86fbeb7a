use bytes::Bytes;
use crossbeam_skiplist::SkipMap;

use super::Indexer;

pub struct SkipList {
  skl: SkipMap<Bytes, Bytes>,
}

impl SkipList {
  pub fn new() -> Self {
    Self {
      skl: SkipMap::new(),
    }
  }
}

impl Default for SkipList {
  fn default() -> Self {
    Self::new()
  }
}

impl Indexer for SkipList {
  fn put(&mut self, key: Bytes, value: Bytes) -> Option<Bytes> {
    let old = self.skl.get(key.as_ref()).map(|entry| entry.value().clone());
    self.skl.insert(key, value);
    old
  }

  fn get(&self, key: &[u8]) -> Option<Bytes> {
    self.skl.get(key).map(|entry| entry.value().clone())
  }

  fn delete(&mut self, key: &[u8]) -> Option<Bytes> {
    self.skl.remove(key).map(|entry| entry.value().clone())
  }

  fn list_keys(&self) -> Vec<Bytes> {
    self.skl.iter().map(|entry| entry.key().clone()).collect()
  }

  fn len(&self) -> usize {
    self.skl.len()
  }

  fn entries(&self) -> Vec<(Bytes, Bytes)> {
    self
      .skl
      .iter()
      .map(|entry| (entry.key().clone(), entry.value().clone()))
      .collect()
  }
}
