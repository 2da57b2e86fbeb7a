use log::error;
use parking_lot::Mutex;

use super::{FlashGeometry, FlashOp, FlashPort};

/// RAM-backed NOR flash.
///
/// Erase sets bytes to 0xFF and programming can only clear bits, so writing a
/// page twice without an erase in between corrupts it, as on real parts.
/// Writes must cover whole pages and erases whole sectors.
///
/// Tests use the fault injection and counters to observe how the engine
/// drives the device.
pub struct MemFlash {
  geometry: FlashGeometry,
  inner: Mutex<MemFlashInner>,
}

#[derive(Default)]
struct MemFlashInner {
  storage: Vec<u8>,
  // op to fail, and how many calls of it succeed first
  fail: Option<(FlashOp, usize)>,
  reads: usize,
  writes: usize,
  erases: usize,
}

impl MemFlash {
  /// A device that starts out erased.
  pub fn new(base: u32, size: u32, page_size: u32, sector_size: u32) -> Self {
    Self::with_geometry(
      FlashGeometry {
        base,
        size,
        page_size,
        sector_size,
      },
      0xFF,
    )
  }

  pub fn with_geometry(geometry: FlashGeometry, fill: u8) -> Self {
    Self {
      geometry,
      inner: Mutex::new(MemFlashInner {
        storage: vec![fill; geometry.size as usize],
        ..Default::default()
      }),
    }
  }

  pub fn geometry(&self) -> FlashGeometry {
    self.geometry
  }

  /// Raw device contents.
  pub fn contents(&self) -> Vec<u8> {
    self.inner.lock().storage.clone()
  }

  /// Overwrites bytes directly, bypassing program semantics.
  pub fn poke(&self, address: u32, data: &[u8]) {
    let offset = (address - self.geometry.base) as usize;
    self.inner.lock().storage[offset..offset + data.len()].copy_from_slice(data);
  }

  /// Makes the next call of `op` report failure without touching storage.
  pub fn fail_next(&self, op: FlashOp) {
    self.fail_after(op, 0);
  }

  /// Lets `skip` calls of `op` through, then fails the one after.
  pub fn fail_after(&self, op: FlashOp, skip: usize) {
    self.inner.lock().fail = Some((op, skip));
  }

  pub fn read_count(&self) -> usize {
    self.inner.lock().reads
  }

  pub fn write_count(&self) -> usize {
    self.inner.lock().writes
  }

  pub fn erase_count(&self) -> usize {
    self.inner.lock().erases
  }
}

impl MemFlashInner {
  fn take_failure(&mut self, op: FlashOp) -> bool {
    match self.fail {
      Some((fail_op, 0)) if fail_op == op => {
        self.fail = None;
        true
      }
      Some((fail_op, skip)) if fail_op == op => {
        self.fail = Some((fail_op, skip - 1));
        false
      }
      _ => false,
    }
  }
}

impl FlashPort for MemFlash {
  fn read(&self, address: u32, buf: &mut [u8]) -> bool {
    let mut inner = self.inner.lock();
    inner.reads += 1;
    if inner.take_failure(FlashOp::Read) {
      return false;
    }
    let Some(offset) = self.geometry.offset_of(address, buf.len()) else {
      error!("read out of bounds: {address:#x} + {}", buf.len());
      return false;
    };
    buf.copy_from_slice(&inner.storage[offset..offset + buf.len()]);
    true
  }

  fn write(&self, address: u32, data: &[u8]) -> bool {
    let mut inner = self.inner.lock();
    inner.writes += 1;
    if inner.take_failure(FlashOp::Write) {
      return false;
    }
    let Some(offset) = self.geometry.offset_of(address, data.len()) else {
      error!("write out of bounds: {address:#x} + {}", data.len());
      return false;
    };
    if !self.geometry.is_page_write(address, data.len()) {
      error!("write not page aligned: {address:#x} + {}", data.len());
      return false;
    }
    for (dst, src) in inner.storage[offset..offset + data.len()].iter_mut().zip(data) {
      *dst &= *src;
    }
    true
  }

  fn erase(&self, address: u32, len: u32) -> bool {
    let mut inner = self.inner.lock();
    inner.erases += 1;
    if inner.take_failure(FlashOp::Erase) {
      return false;
    }
    let Some(offset) = self.geometry.offset_of(address, len as usize) else {
      error!("erase out of bounds: {address:#x} + {len}");
      return false;
    };
    if !self.geometry.is_sector_erase(address, len) {
      error!("erase not sector aligned: {address:#x} + {len}");
      return false;
    }
    inner.storage[offset..offset + len as usize].fill(0xFF);
    true
  }
}
