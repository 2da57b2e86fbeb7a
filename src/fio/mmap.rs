use std::{fs::File, path::Path, sync::Arc};

use log::error;
use memmap2::MmapMut;
use parking_lot::Mutex;

use crate::errors::{Errors, Result};

use super::{file_io::open_image, FlashGeometry, FlashPort};

/// Flash image mapped into memory. Same layout and locking as
/// [`FileFlash`](super::file_io::FileFlash); every write and erase is flushed
/// before it returns.
pub struct MMapFlash {
  geometry: FlashGeometry,
  map: Arc<Mutex<MmapMut>>,
  // holds the image lock
  _fd: File,
}

impl MMapFlash {
  pub fn new<P>(file_name: P, geometry: FlashGeometry) -> Result<Self>
  where
    P: AsRef<Path>,
  {
    let fd = open_image(file_name, geometry)?;
    let map = match unsafe { MmapMut::map_mut(&fd) } {
      Ok(map) => map,
      Err(e) => {
        error!("failed to map flash image: {e}");
        return Err(Errors::FailedToOpenFlashImage);
      }
    };
    Ok(MMapFlash {
      geometry,
      map: Arc::new(Mutex::new(map)),
      _fd: fd,
    })
  }
}

impl FlashPort for MMapFlash {
  fn read(&self, address: u32, buf: &mut [u8]) -> bool {
    let Some(offset) = self.geometry.offset_of(address, buf.len()) else {
      error!("read out of bounds: {address:#x} + {}", buf.len());
      return false;
    };
    let map_arr = self.map.lock();
    buf.copy_from_slice(&map_arr[offset..offset + buf.len()]);
    true
  }

  fn write(&self, address: u32, data: &[u8]) -> bool {
    let Some(offset) = self.geometry.offset_of(address, data.len()) else {
      error!("write out of bounds: {address:#x} + {}", data.len());
      return false;
    };
    if !self.geometry.is_page_write(address, data.len()) {
      error!("write not page aligned: {address:#x} + {}", data.len());
      return false;
    }

    let mut map_arr = self.map.lock();
    for (dst, src) in map_arr[offset..offset + data.len()].iter_mut().zip(data) {
      *dst &= *src;
    }
    match map_arr.flush_range(offset, data.len()) {
      Ok(_) => true,
      Err(e) => {
        error!("flush flash image err: {e}");
        false
      }
    }
  }

  fn erase(&self, address: u32, len: u32) -> bool {
    let Some(offset) = self.geometry.offset_of(address, len as usize) else {
      error!("erase out of bounds: {address:#x} + {len}");
      return false;
    };
    if !self.geometry.is_sector_erase(address, len) {
      error!("erase not sector aligned: {address:#x} + {len}");
      return false;
    }

    let mut map_arr = self.map.lock();
    map_arr[offset..offset + len as usize].fill(0xFF);
    match map_arr.flush_range(offset, len as usize) {
      Ok(_) => true,
      Err(e) => {
        error!("flush flash image err: {e}");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fio::file_io::FileFlash;
  use tempfile::tempdir;

  fn geometry() -> FlashGeometry {
    FlashGeometry {
      base: 0,
      size: 4096,
      page_size: 256,
      sector_size: 4096,
    }
  }

  #[test]
  fn test_mmap_write_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mmap.img");
    let flash = MMapFlash::new(&path, geometry()).unwrap();

    let mut buf = [0u8; 4];
    assert!(flash.read(0, &mut buf));
    assert_eq!(buf, [0xFF; 4]);

    let mut page = vec![0xFFu8; 256];
    page[..5].copy_from_slice(b"hello");
    assert!(flash.write(512, &page));

    let mut buf = [0u8; 5];
    assert!(flash.read(512, &mut buf));
    assert_eq!(&buf, b"hello");

    assert!(!flash.write(513, &page));
    assert!(!flash.read(4094, &mut buf));
  }

  #[test]
  fn test_mmap_shares_image_with_file_io() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mmap.img");
    {
      let flash = MMapFlash::new(&path, geometry()).unwrap();
      assert!(flash.write(0, &[0x5A; 256]));
      assert!(FileFlash::new(&path, geometry()).is_err());
    }

    let fio = FileFlash::new(&path, geometry()).unwrap();
    let mut buf = [0u8; 2];
    assert!(fio.read(0, &mut buf));
    assert_eq!(buf, [0x5A; 2]);

    assert!(fio.erase(0, 4096));
    assert!(fio.read(0, &mut buf));
    assert_eq!(buf, [0xFF; 2]);
  }
}
