use lazy_static::lazy_static;
use std::path::PathBuf;

use derive_more::Display;

use crate::{
  data::header::SIGNATURE_SIZE,
  errors::{Errors, Result},
};

lazy_static! {
  pub static ref DEFAULT_IMAGE_PATH: PathBuf = std::env::temp_dir().join("flash-kv.img");
}

#[derive(Debug, Clone)]
pub struct Options {
  /// Backing file for the file and memory-map flash ports.
  pub image_path: PathBuf,

  pub flash_type: FlashType,

  /// Smallest programmable unit. Every write is a whole page.
  pub page_size: u32,

  /// Smallest erasable unit.
  pub sector_size: u32,

  pub region_address: u32,

  pub region_size: u32,

  pub index_type: IndexType,

  /// Flush the store to flash when a loaded engine is dropped.
  pub save_on_drop: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexType {
  BTree,

  SkipList,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      image_path: DEFAULT_IMAGE_PATH.clone(),
      flash_type: FlashType::StandardFile,
      page_size: 256,
      sector_size: 4 * 1024,
      region_address: 0,
      region_size: 16 * 1024, // 16KB
      index_type: IndexType::BTree,
      save_on_drop: true,
    }
  }
}

impl Options {
  /// Checks that the geometry only ever produces page-aligned writes and
  /// sector-aligned erases.
  pub fn validate(&self) -> Result<()> {
    if (self.page_size as usize) < SIGNATURE_SIZE {
      return Err(Errors::PageSizeTooSmall);
    }
    if self.sector_size == 0 || self.sector_size % self.page_size != 0 {
      return Err(Errors::SectorSizeNotPageAligned);
    }
    if self.region_size == 0 {
      return Err(Errors::RegionSizeInvalid);
    }
    if self.region_address % self.sector_size != 0 || self.region_size % self.sector_size != 0 {
      return Err(Errors::RegionNotSectorAligned);
    }
    if self.region_address.checked_add(self.region_size).is_none() {
      return Err(Errors::RegionOutOfAddressSpace);
    }
    Ok(())
  }
}

pub struct IteratorOptions {
  pub prefix: Vec<u8>,
  pub reverse: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for IteratorOptions {
  fn default() -> Self {
    Self {
      prefix: Default::default(),
      reverse: false,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FlashType {
  /// Volatile RAM-backed flash, lost when the engine is dropped.
  #[display("memory")]
  Memory,

  #[display("file")]
  StandardFile,

  #[display("mmap")]
  MemoryMap,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_options_are_valid() {
    assert!(Options::default().validate().is_ok());
  }

  #[test]
  fn test_validate_geometry() {
    let mut opts = Options::default();
    opts.page_size = 2;
    assert_eq!(opts.validate(), Err(Errors::PageSizeTooSmall));

    let mut opts = Options::default();
    opts.sector_size = 1000;
    assert_eq!(opts.validate(), Err(Errors::SectorSizeNotPageAligned));

    let mut opts = Options::default();
    opts.region_size = 0;
    assert_eq!(opts.validate(), Err(Errors::RegionSizeInvalid));

    let mut opts = Options::default();
    opts.region_address = 256;
    assert_eq!(opts.validate(), Err(Errors::RegionNotSectorAligned));

    let mut opts = Options::default();
    opts.region_size = 4096 + 256;
    assert_eq!(opts.validate(), Err(Errors::RegionNotSectorAligned));

    let mut opts = Options::default();
    opts.region_address = 0xFFFF_F000;
    opts.region_size = 8192;
    assert_eq!(opts.validate(), Err(Errors::RegionOutOfAddressSpace));
  }

  #[test]
  fn test_flash_type_display() {
    assert_eq!(FlashType::MemoryMap.to_string(), "mmap");
  }
}
