use log::debug;

use crate::fio::FlashPort;

pub const SIGNATURE_SIZE: usize = 4;

/// Leading bytes of every region that holds a store.
pub const SIGNATURE: [u8; SIGNATURE_SIZE] = *b"FKVS";

/// Returns true iff the region at `address` starts with the store signature.
///
/// A failed port read counts as "no store", the caller then initializes the
/// region from scratch.
pub fn verify(port: &dyn FlashPort, address: u32) -> bool {
  let mut buf = [0u8; SIGNATURE_SIZE];
  if !port.read(address, &mut buf) {
    debug!("signature read at {address:#x} failed, treating region as uninitialized");
    return false;
  }
  buf == SIGNATURE
}

/// A single zero-filled page that carries the signature, written when a
/// fresh region is initialized.
pub fn signature_page(page_size: usize) -> Vec<u8> {
  let mut page = vec![0u8; page_size];
  page[..SIGNATURE_SIZE].copy_from_slice(&SIGNATURE);
  page
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fio::{mem::MemFlash, FlashOp};

  #[test]
  fn test_verify_signature() {
    let flash = MemFlash::new(0, 4096, 256, 4096);
    assert!(!verify(&flash, 0));

    assert!(flash.write(0, &signature_page(256)));
    assert!(verify(&flash, 0));
  }

  #[test]
  fn test_verify_partial_signature() {
    let flash = MemFlash::new(0, 4096, 256, 4096);
    flash.poke(0, b"FKV\0");
    assert!(!verify(&flash, 0));
  }

  #[test]
  fn test_verify_read_failure() {
    let flash = MemFlash::new(0, 4096, 256, 4096);
    assert!(flash.write(0, &signature_page(256)));
    flash.fail_next(FlashOp::Read);
    assert!(!verify(&flash, 0));
    assert!(verify(&flash, 0));
  }

  #[test]
  fn test_signature_page() {
    let page = signature_page(256);
    assert_eq!(page.len(), 256);
    assert_eq!(&page[..4], b"FKVS");
    assert!(page[4..].iter().all(|b| *b == 0));
  }
}
