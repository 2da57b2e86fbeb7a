use std::{
  fs::{File, OpenOptions},
  io::Write,
  os::unix::fs::FileExt,
  path::Path,
};

use fs2::FileExt as LockExt;
use log::error;
use parking_lot::RwLock;

use crate::errors::{Errors, Result};

use super::{FlashGeometry, FlashPort};

/// Flash image kept in a regular file, one byte per flash byte.
///
/// The file is locked exclusively for the lifetime of the port, so two
/// engines can never share an image.
pub struct FileFlash {
  geometry: FlashGeometry,
  fd: RwLock<File>,
}

impl FileFlash {
  pub fn new<P>(file_name: P, geometry: FlashGeometry) -> Result<Self>
  where
    P: AsRef<Path>,
  {
    let fd = open_image(file_name, geometry)?;
    Ok(FileFlash {
      geometry,
      fd: RwLock::new(fd),
    })
  }
}

/// Opens (creating if needed) and locks an image file sized to `geometry`.
/// New images start out erased.
pub(crate) fn open_image<P>(file_name: P, geometry: FlashGeometry) -> Result<File>
where
  P: AsRef<Path>,
{
  let mut fd = match OpenOptions::new()
    .create(true)
    .truncate(false)
    .read(true)
    .write(true)
    .open(file_name)
  {
    Ok(fd) => fd,
    Err(e) => {
      error!("failed to open flash image: {e}");
      return Err(Errors::FailedToOpenFlashImage);
    }
  };

  if fd.try_lock_exclusive().is_err() {
    return Err(Errors::FlashImageInUse);
  }

  let len = match fd.metadata() {
    Ok(meta) => meta.len(),
    Err(e) => {
      error!("failed to stat flash image: {e}");
      return Err(Errors::FailedToOpenFlashImage);
    }
  };

  if len == 0 {
    if let Err(e) = fd
      .write_all(&vec![0xFF; geometry.size as usize])
      .and_then(|_| fd.sync_all())
    {
      error!("failed to format flash image: {e}");
      return Err(Errors::FailedToOpenFlashImage);
    }
  } else if len != geometry.size as u64 {
    error!(
      "flash image is {len} bytes, region is {} bytes",
      geometry.size
    );
    return Err(Errors::FlashImageSizeMismatch);
  }

  Ok(fd)
}

impl FlashPort for FileFlash {
  fn read(&self, address: u32, buf: &mut [u8]) -> bool {
    let Some(offset) = self.geometry.offset_of(address, buf.len()) else {
      error!("read out of bounds: {address:#x} + {}", buf.len());
      return false;
    };
    let read_guard = self.fd.read();
    match read_guard.read_exact_at(buf, offset as u64) {
      Ok(_) => true,
      Err(e) => {
        error!("read from flash image err: {e}");
        false
      }
    }
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

    let write_guard = self.fd.write();
    let mut current = vec![0u8; data.len()];
    if let Err(e) = write_guard.read_exact_at(&mut current, offset as u64) {
      error!("read from flash image err: {e}");
      return false;
    }
    for (dst, src) in current.iter_mut().zip(data) {
      *dst &= *src;
    }
    match write_guard
      .write_all_at(&current, offset as u64)
      .and_then(|_| write_guard.sync_data())
    {
      Ok(_) => true,
      Err(e) => {
        error!("write to flash image err: {e}");
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

    let write_guard = self.fd.write();
    match write_guard
      .write_all_at(&vec![0xFF; len as usize], offset as u64)
      .and_then(|_| write_guard.sync_data())
    {
      Ok(_) => true,
      Err(e) => {
        error!("erase flash image err: {e}");
        false
      }
    }
  }
}
