use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Errors {
  #[error("failed to read {len} bytes from flash at {address:#x}")]
  FailedToReadFlash { address: u32, len: usize },

  #[error("failed to write {len} bytes to flash at {address:#x}")]
  FailedToWriteFlash { address: u32, len: usize },

  #[error("failed to erase {len} bytes of flash at {address:#x}")]
  FailedToEraseFlash { address: u32, len: u32 },

  #[error("the store has not been loaded")]
  StoreNotLoaded,

  #[error("the store is already loaded")]
  StoreAlreadyLoaded,

  #[error("the key is empty")]
  KeyIsEmpty,

  #[error("key length {0} exceeds the record length field")]
  KeyTooLong(usize),

  #[error("value length {0} exceeds the record length field")]
  ValueTooLong(usize),

  #[error("store capacity exceeded: {required} bytes required, {available} available")]
  CapacityExceeded { required: usize, available: usize },

  #[error("record at offset {offset} runs past the end of the region")]
  TruncatedRecord { offset: usize },

  #[error("page size must be able to hold the store signature")]
  PageSizeTooSmall,

  #[error("sector size must be a non-zero multiple of the page size")]
  SectorSizeNotPageAligned,

  #[error("region address and size must be multiples of the sector size")]
  RegionNotSectorAligned,

  #[error("region size must be greater than zero")]
  RegionSizeInvalid,

  #[error("region extends past the 32-bit flash address space")]
  RegionOutOfAddressSpace,

  #[error("failed to open flash image")]
  FailedToOpenFlashImage,

  #[error("the flash image is in use by another engine")]
  FlashImageInUse,

  #[error("flash image size does not match the configured region")]
  FlashImageSizeMismatch,
}

pub type Result<T> = std::result::Result<T, Errors>;
