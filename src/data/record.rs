use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::{Errors, Result};

/// Width of the key and value length fields. Lengths are little-endian.
pub const LEN_FIELD_SIZE: usize = std::mem::size_of::<u16>();

/// Largest key or value a record can describe.
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// One key/value entry as laid out on flash:
///
/// ```text
/// +---------+-----------+-----------+-------------+
/// | key len | key bytes | value len | value bytes |
/// | u16 LE  |           | u16 LE    |             |
/// +---------+-----------+-----------+-------------+
/// ```
///
/// A key length of zero marks the end of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRecord {
  pub key: Bytes,
  pub value: Bytes,
}

/// A record decoded from a region image, with the number of bytes it took.
#[derive(Debug, PartialEq, Eq)]
pub struct ReadKvRecord {
  pub record: KvRecord,
  pub size: usize,
}

impl KvRecord {
  pub fn new(key: Bytes, value: Bytes) -> Self {
    Self { key, value }
  }

  /// Callers must have checked both lengths against `MAX_FIELD_LEN`.
  pub fn encode(&self) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(self.encoded_size());
    self.encode_into(&mut buf);
    buf.to_vec()
  }

  pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
    buf.put_u16_le(self.key.len() as u16);
    buf.put_slice(&self.key);
    buf.put_u16_le(self.value.len() as u16);
    buf.put_slice(&self.value);
  }

  pub fn encoded_size(&self) -> usize {
    encoded_record_size(self.key.len(), self.value.len())
  }
}

pub fn encoded_record_size(key_len: usize, value_len: usize) -> usize {
  LEN_FIELD_SIZE + key_len + LEN_FIELD_SIZE + value_len
}

/// Encoded form of the end-of-store marker.
pub fn terminator() -> [u8; LEN_FIELD_SIZE] {
  0u16.to_le_bytes()
}

/// Decodes the record starting at `offset`.
///
/// Returns `Ok(None)` at the end-of-store marker, or when fewer bytes than a
/// length field remain. Declared lengths that run past `buf` are an error.
pub fn decode_record(buf: &[u8], offset: usize) -> Result<Option<ReadKvRecord>> {
  let key_len = match read_len(buf, offset) {
    Some(0) | None => return Ok(None),
    Some(len) => len,
  };

  let key_start = offset + LEN_FIELD_SIZE;
  let key_end = key_start + key_len;
  let value_len = read_len(buf, key_end).ok_or(Errors::TruncatedRecord { offset })?;

  let value_start = key_end + LEN_FIELD_SIZE;
  let value_end = value_start + value_len;
  if value_end > buf.len() {
    return Err(Errors::TruncatedRecord { offset });
  }

  Ok(Some(ReadKvRecord {
    record: KvRecord {
      key: Bytes::copy_from_slice(&buf[key_start..key_end]),
      value: Bytes::copy_from_slice(&buf[value_start..value_end]),
    },
    size: value_end - offset,
  }))
}

fn read_len(buf: &[u8], offset: usize) -> Option<usize> {
  let field = buf.get(offset..offset + LEN_FIELD_SIZE)?;
  Some(u16::from_le_bytes([field[0], field[1]]) as usize)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_encode_layout() {
    let rec = KvRecord::new(Bytes::from("ab"), Bytes::from(vec![1u8, 2, 3]));
    let enc = rec.encode();
    assert_eq!(enc, vec![2, 0, b'a', b'b', 3, 0, 1, 2, 3]);
    assert_eq!(rec.encoded_size(), enc.len());
  }

  #[test]
  fn test_encode_empty_value() {
    let rec = KvRecord::new(Bytes::from("k"), Bytes::new());
    assert_eq!(rec.encode(), vec![1, 0, b'k', 0, 0]);
  }

  #[test]
  fn test_decode_record() {
    let mut buf = vec![0xAA, 0xAA];
    buf.extend(KvRecord::new(Bytes::from("name"), Bytes::from("flash")).encode());
    buf.extend(terminator());

    let res = decode_record(&buf, 2).unwrap().unwrap();
    assert_eq!(res.record.key, Bytes::from("name"));
    assert_eq!(res.record.value, Bytes::from("flash"));
    assert_eq!(res.size, 13);

    assert_eq!(decode_record(&buf, 2 + res.size).unwrap(), None);
  }

  #[test]
  fn test_decode_end_of_buffer() {
    assert_eq!(decode_record(&[], 0).unwrap(), None);
    assert_eq!(decode_record(&[7], 0).unwrap(), None);
    assert_eq!(decode_record(&[1, 2, 3], 2).unwrap(), None);
  }

  #[test]
  fn test_decode_truncated_key() {
    let buf = [10, 0, b'a', b'b'];
    assert_eq!(
      decode_record(&buf, 0),
      Err(Errors::TruncatedRecord { offset: 0 })
    );
  }

  #[test]
  fn test_decode_truncated_value() {
    let mut buf = KvRecord::new(Bytes::from("a"), Bytes::from(vec![9u8; 8])).encode();
    buf.truncate(buf.len() - 1);
    assert_eq!(
      decode_record(&buf, 0),
      Err(Errors::TruncatedRecord { offset: 0 })
    );

    // value length field itself cut off
    let buf = [1, 0, b'a', 4];
    assert_eq!(
      decode_record(&buf, 0),
      Err(Errors::TruncatedRecord { offset: 0 })
    );
  }

  #[test]
  fn test_decode_max_lengths() {
    let rec = KvRecord::new(
      Bytes::from(vec![b'k'; MAX_FIELD_LEN]),
      Bytes::from(vec![7u8; MAX_FIELD_LEN]),
    );
    let enc = rec.encode();
    assert_eq!(enc.len(), encoded_record_size(MAX_FIELD_LEN, MAX_FIELD_LEN));

    let res = decode_record(&enc, 0).unwrap().unwrap();
    assert_eq!(res.record, rec);
    assert_eq!(res.size, enc.len());
  }
}
