pub mod btree;
pub mod skiplist;

use bytes::Bytes;

use crate::option::{IndexType, IteratorOptions};

/// In-memory key/value map backing a loaded store.
///
/// All implementations keep keys in byte order, so `entries` and iteration
/// are deterministic for a given map state.
pub trait Indexer: Send {
  /// Inserts or replaces a value, returning the previous one.
  fn put(&mut self, key: Bytes, value: Bytes) -> Option<Bytes>;

  fn get(&self, key: &[u8]) -> Option<Bytes>;

  /// Removes a key, returning its value.
  fn delete(&mut self, key: &[u8]) -> Option<Bytes>;

  fn list_keys(&self) -> Vec<Bytes>;

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Snapshot of every entry in key order.
  fn entries(&self) -> Vec<(Bytes, Bytes)>;

  /// Creates an iterator for the index with the specified options.
  /// * `options` - Configuration options for the iterator
  fn iterator(&self, options: IteratorOptions) -> Box<dyn IndexIterator> {
    let mut items = self.entries();
    if options.reverse {
      items.reverse();
    }
    Box::new(SnapshotIterator {
      items,
      curr_index: 0,
      options,
    })
  }
}

/// Creates a new indexer based on the specified index type.
pub fn new_indexer(index_type: &IndexType) -> Box<dyn Indexer> {
  match *index_type {
    IndexType::BTree => Box::new(btree::BTree::new()),
    IndexType::SkipList => Box::new(skiplist::SkipList::new()),
  }
}

/// Provides methods for iterating over key-value pairs in the index.
pub trait IndexIterator: Send {
  fn rewind(&mut self);

  /// Positions at the first key >= `key` (<= when reversed).
  fn seek(&mut self, key: &[u8]);

  fn next(&mut self) -> Option<(&Bytes, &Bytes)>;
}

/// Iterates a copy of the map taken when the iterator was created.
pub struct SnapshotIterator {
  items: Vec<(Bytes, Bytes)>,
  curr_index: usize,
  options: IteratorOptions,
}

impl IndexIterator for SnapshotIterator {
  fn rewind(&mut self) {
    self.curr_index = 0;
  }

  fn seek(&mut self, key: &[u8]) {
    self.curr_index = match self.items.binary_search_by(|(x, _)| {
      if self.options.reverse {
        key.cmp(x.as_ref())
      } else {
        x.as_ref().cmp(key)
      }
    }) {
      Ok(equal_val) => equal_val,
      Err(insert_val) => insert_val,
    };
  }

  fn next(&mut self) -> Option<(&Bytes, &Bytes)> {
    while self.curr_index < self.items.len() {
      let item = &self.items[self.curr_index];
      self.curr_index += 1;
      if item.0.starts_with(&self.options.prefix) {
        return Some((&item.0, &item.1));
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn filled(index_type: IndexType) -> Box<dyn Indexer> {
    let mut idx = new_indexer(&index_type);
    for key in ["bcd", "abc", "acd", "eee", "bbb"] {
      idx.put(Bytes::from(key), Bytes::from(key.to_uppercase()));
    }
    idx
  }

  fn collect(it: &mut Box<dyn IndexIterator>) -> Vec<Bytes> {
    let mut keys = Vec::new();
    while let Some((k, _)) = it.next() {
      keys.push(k.clone());
    }
    keys
  }

  #[test]
  fn test_iterator_forward() {
    for index_type in [IndexType::BTree, IndexType::SkipList] {
      let idx = filled(index_type);
      let mut it = idx.iterator(IteratorOptions::default());
      assert_eq!(
        collect(&mut it),
        vec!["abc", "acd", "bbb", "bcd", "eee"]
      );

      it.rewind();
      it.seek(b"b");
      assert_eq!(collect(&mut it), vec!["bbb", "bcd", "eee"]);
    }
  }

  #[test]
  fn test_iterator_reverse_and_prefix() {
    for index_type in [IndexType::BTree, IndexType::SkipList] {
      let idx = filled(index_type);
      let mut it = idx.iterator(IteratorOptions {
        prefix: b"b".to_vec(),
        reverse: true,
      });
      assert_eq!(collect(&mut it), vec!["bcd", "bbb"]);

      let mut it = idx.iterator(IteratorOptions {
        prefix: Vec::new(),
        reverse: true,
      });
      it.seek(b"bz");
      assert_eq!(collect(&mut it), vec!["bcd", "bbb", "acd", "abc"]);
    }
  }

  #[test]
  fn test_iterator_is_snapshot() {
    let mut idx = filled(IndexType::BTree);
    let mut it = idx.iterator(IteratorOptions::default());
    idx.delete(b"abc");
    assert_eq!(it.next().map(|(k, _)| k.clone()), Some(Bytes::from("abc")));
  }
}
