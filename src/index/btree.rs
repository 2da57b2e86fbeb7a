use std::collections::BTreeMap;

use bytes::Bytes;

use super::Indexer;

/// Ordered map on the standard library B-tree.
#[derive(Default)]
pub struct BTree {
  tree: BTreeMap<Bytes, Bytes>,
}

impl BTree {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Indexer for BTree {
  fn put(&mut self, key: Bytes, value: Bytes) -> Option<Bytes> {
    self.tree.insert(key, value)
  }

  fn get(&self, key: &[u8]) -> Option<Bytes> {
    self.tree.get(key).cloned()
  }

  fn delete(&mut self, key: &[u8]) -> Option<Bytes> {
    self.tree.remove(key)
  }

  fn list_keys(&self) -> Vec<Bytes> {
    self.tree.keys().cloned().collect()
  }

  fn len(&self) -> usize {
    self.tree.len()
  }

  fn entries(&self) -> Vec<(Bytes, Bytes)> {
    self
      .tree
      .iter()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect()
  }
}
