pub mod file_io;
pub mod mem;
pub mod mmap;

use std::sync::Arc;

use crate::{
  errors::Result,
  option::{FlashType, Options},
};

use self::{file_io::FileFlash, mem::MemFlash, mmap::MMapFlash};

/// Blocking access to a flash device.
///
/// Each call reports success or failure and nothing else. The engine only
/// issues page-aligned, whole-page writes and sector-aligned erases inside
/// its configured region.
///
/// Implementations are not required to serialize concurrent callers: one
/// engine owns a region for its whole lifetime, and sharing an engine across
/// threads needs a lock around the engine itself.
pub trait FlashPort: Sync + Send {
  fn read(&self, address: u32, buf: &mut [u8]) -> bool;

  fn write(&self, address: u32, data: &[u8]) -> bool;

  fn erase(&self, address: u32, len: u32) -> bool;
}

impl<T: FlashPort + ?Sized> FlashPort for Arc<T> {
  fn read(&self, address: u32, buf: &mut [u8]) -> bool {
    (**self).read(address, buf)
  }

  fn write(&self, address: u32, data: &[u8]) -> bool {
    (**self).write(address, data)
  }

  fn erase(&self, address: u32, len: u32) -> bool {
    (**self).erase(address, len)
  }
}

impl<T: FlashPort + ?Sized> FlashPort for Box<T> {
  fn read(&self, address: u32, buf: &mut [u8]) -> bool {
    (**self).read(address, buf)
  }

  fn write(&self, address: u32, data: &[u8]) -> bool {
    (**self).write(address, data)
  }

  fn erase(&self, address: u32, len: u32) -> bool {
    (**self).erase(address, len)
  }
}

/// Adapts three driver callbacks into a [`FlashPort`].
pub struct FnPort<W, R, E> {
  write_fn: W,
  read_fn: R,
  erase_fn: E,
}

impl<W, R, E> FnPort<W, R, E>
where
  W: Fn(u32, &[u8]) -> bool + Send + Sync,
  R: Fn(u32, &mut [u8]) -> bool + Send + Sync,
  E: Fn(u32, u32) -> bool + Send + Sync,
{
  pub fn new(write_fn: W, read_fn: R, erase_fn: E) -> Self {
    Self {
      write_fn,
      read_fn,
      erase_fn,
    }
  }
}

impl<W, R, E> FlashPort for FnPort<W, R, E>
where
  W: Fn(u32, &[u8]) -> bool + Send + Sync,
  R: Fn(u32, &mut [u8]) -> bool + Send + Sync,
  E: Fn(u32, u32) -> bool + Send + Sync,
{
  fn read(&self, address: u32, buf: &mut [u8]) -> bool {
    (self.read_fn)(address, buf)
  }

  fn write(&self, address: u32, data: &[u8]) -> bool {
    (self.write_fn)(address, data)
  }

  fn erase(&self, address: u32, len: u32) -> bool {
    (self.erase_fn)(address, len)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
  Read,
  Write,
  Erase,
}

/// Address range and programming granularity of a simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashGeometry {
  pub base: u32,
  pub size: u32,
  pub page_size: u32,
  pub sector_size: u32,
}

impl FlashGeometry {
  pub fn from_options(options: &Options) -> Self {
    Self {
      base: options.region_address,
      size: options.region_size,
      page_size: options.page_size,
      sector_size: options.sector_size,
    }
  }

  /// Offset of `address` inside the device, if `len` bytes from there fit.
  pub fn offset_of(&self, address: u32, len: usize) -> Option<usize> {
    let offset = address.checked_sub(self.base)? as usize;
    let end = offset.checked_add(len)?;
    if end > self.size as usize {
      return None;
    }
    Some(offset)
  }

  pub fn is_page_write(&self, address: u32, len: usize) -> bool {
    address.wrapping_sub(self.base) % self.page_size == 0 && len % self.page_size as usize == 0
  }

  pub fn is_sector_erase(&self, address: u32, len: u32) -> bool {
    address.wrapping_sub(self.base) % self.sector_size == 0 && len % self.sector_size == 0
  }
}

/// Creates the built-in flash port selected by `options.flash_type`.
pub fn new_flash_port(options: &Options) -> Result<Box<dyn FlashPort>> {
  let geometry = FlashGeometry::from_options(options);
  Ok(match options.flash_type {
    FlashType::Memory => Box::new(MemFlash::with_geometry(geometry, 0xFF)),
    FlashType::StandardFile => Box::new(FileFlash::new(&options.image_path, geometry)?),
    FlashType::MemoryMap => Box::new(MMapFlash::new(&options.image_path, geometry)?),
  })
}
