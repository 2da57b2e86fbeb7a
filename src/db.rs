use bytes::{Bytes, BytesMut};
use derive_more::Display;
use log::{debug, error, info, warn};

use crate::{
  data::{
    header::{self, SIGNATURE, SIGNATURE_SIZE},
    record::{
      decode_record, encoded_record_size, terminator, KvRecord, LEN_FIELD_SIZE, MAX_FIELD_LEN,
    },
  },
  errors::{Errors, Result},
  fio::{new_flash_port, FlashPort},
  index::{new_indexer, IndexIterator, Indexer},
  option::{IteratorOptions, Options},
};

/// Outcome of a successful [`Engine::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LoadStatus {
  /// The region held a store and its entries are now in memory.
  #[display("loaded")]
  Loaded,

  /// The region held no store; it was formatted and the map is empty.
  #[display("initialized")]
  Initialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreState {
  Unloaded,
  Loaded,
}

/// Key/value store persisted in a fixed flash region.
///
/// The whole map lives in RAM once loaded. Mutations never touch flash;
/// [`save`](Engine::save) erases the region and rewrites it in full.
///
/// An engine assumes it is the only user of its region. It takes `&mut self`
/// for every mutation and does no locking of its own, so sharing it between
/// threads needs an external `Mutex`.
pub struct Engine {
  options: Options,
  port: Box<dyn FlashPort>,
  index: Box<dyn Indexer>,
  state: StoreState,
  // signature plus every record, terminator excluded
  used_size: usize,
}

/// Usage figures for a loaded store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
  pub key_num: usize,

  /// Bytes the serialized store takes, signature included.
  pub used_size: usize,

  pub region_size: usize,

  pub free_size: usize,
}

impl Engine {
  /// Opens an engine on the built-in flash port selected by `options`.
  pub fn open(options: Options) -> Result<Self> {
    options.validate()?;
    let port = new_flash_port(&options)?;
    Self::with_port(port, options)
  }

  /// Creates an engine over a caller supplied flash port. Nothing is read
  /// until [`load`](Engine::load).
  pub fn with_port<P>(port: P, options: Options) -> Result<Self>
  where
    P: FlashPort + 'static,
  {
    options.validate()?;
    let index = new_indexer(&options.index_type);
    Ok(Self {
      options,
      port: Box::new(port),
      index,
      state: StoreState::Unloaded,
      used_size: 0,
    })
  }

  /// Reads the store from flash, or formats the region if it holds none.
  ///
  /// Port failures and corrupt records are errors and leave the engine
  /// unloaded; a corrupt region is never mistaken for an empty one.
  pub fn load(&mut self) -> Result<LoadStatus> {
    if self.state == StoreState::Loaded {
      return Err(Errors::StoreAlreadyLoaded);
    }

    let status = if header::verify(&*self.port, self.options.region_address) {
      let (index, used_size) = self.read_store()?;
      self.index = index;
      self.used_size = used_size;
      info!(
        "loaded {} keys ({used_size} bytes) from flash at {:#x}",
        self.index.len(),
        self.options.region_address
      );
      LoadStatus::Loaded
    } else {
      self.init_store()?;
      self.index = new_indexer(&self.options.index_type);
      self.used_size = SIGNATURE_SIZE;
      info!(
        "no store found at {:#x}, initialized an empty one",
        self.options.region_address
      );
      LoadStatus::Initialized
    };

    self.state = StoreState::Loaded;
    Ok(status)
  }

  /// Erases the region and writes the whole store back, page by page.
  pub fn save(&mut self) -> Result<()> {
    self.check_loaded()?;

    self.erase_region()?;
    let image = self.encode_image();
    let page_size = self.options.page_size as usize;
    for (i, page) in image.chunks(page_size).enumerate() {
      let address = self.options.region_address + (i * page_size) as u32;
      if !self.port.write(address, page) {
        error!("failed to write flash page at {address:#x}");
        return Err(Errors::FailedToWriteFlash {
          address,
          len: page.len(),
        });
      }
    }

    debug!(
      "saved {} keys, {} bytes in {} pages",
      self.index.len(),
      self.used_size,
      image.len() / page_size
    );
    Ok(())
  }

  /// Inserts or replaces a key in memory. Flash is untouched until `save`.
  pub fn write_key(&mut self, key: Bytes, value: Bytes) -> Result<()> {
    self.check_loaded()?;

    if key.is_empty() {
      return Err(Errors::KeyIsEmpty);
    }
    if key.len() > MAX_FIELD_LEN {
      return Err(Errors::KeyTooLong(key.len()));
    }
    if value.len() > MAX_FIELD_LEN {
      return Err(Errors::ValueTooLong(value.len()));
    }

    let new_size = encoded_record_size(key.len(), value.len());
    let old_size = self
      .index
      .get(&key)
      .map_or(0, |old| encoded_record_size(key.len(), old.len()));
    let required = self.used_size - old_size + new_size;
    let region_size = self.options.region_size as usize;
    if required > region_size {
      return Err(Errors::CapacityExceeded {
        required,
        available: region_size,
      });
    }

    self.index.put(key, value);
    self.used_size = required;
    Ok(())
  }

  /// Returns the value stored under `key`, if any.
  pub fn read_key(&self, key: &[u8]) -> Result<Option<Bytes>> {
    self.check_loaded()?;
    Ok(self.index.get(key))
  }

  /// Removes `key` from memory. Returns false if it was absent.
  pub fn erase_key(&mut self, key: &[u8]) -> Result<bool> {
    self.check_loaded()?;

    match self.index.delete(key) {
      Some(old) => {
        self.used_size -= encoded_record_size(key.len(), old.len());
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Snapshot of all keys, in key order.
  pub fn list_keys(&self) -> Result<Vec<Bytes>> {
    self.check_loaded()?;
    Ok(self.index.list_keys())
  }

  /// Calls `f` on each entry in key order until it returns false.
  pub fn fold<F>(&self, f: F) -> Result<()>
  where
    F: Fn(Bytes, Bytes) -> bool,
  {
    self.check_loaded()?;
    for (key, value) in self.index.entries() {
      if !f(key, value) {
        break;
      }
    }
    Ok(())
  }

  /// Iterator over a snapshot of the current entries.
  pub fn iter(&self, options: IteratorOptions) -> Result<Box<dyn IndexIterator>> {
    self.check_loaded()?;
    Ok(self.index.iterator(options))
  }

  pub fn stat(&self) -> Result<Stat> {
    self.check_loaded()?;
    let region_size = self.options.region_size as usize;
    Ok(Stat {
      key_num: self.index.len(),
      used_size: self.used_size,
      region_size,
      free_size: region_size - self.used_size,
    })
  }

  pub fn is_loaded(&self) -> bool {
    self.state == StoreState::Loaded
  }

  fn check_loaded(&self) -> Result<()> {
    match self.state {
      StoreState::Loaded => Ok(()),
      StoreState::Unloaded => Err(Errors::StoreNotLoaded),
    }
  }

  fn read_store(&self) -> Result<(Box<dyn Indexer>, usize)> {
    let address = self.options.region_address;
    let mut buf = vec![0u8; self.options.region_size as usize];
    if !self.port.read(address, &mut buf) {
      error!("failed to read store region at {address:#x}");
      return Err(Errors::FailedToReadFlash {
        address,
        len: buf.len(),
      });
    }

    let mut index = new_indexer(&self.options.index_type);
    let mut offset = SIGNATURE_SIZE;
    while offset < buf.len() {
      let read = match decode_record(&buf, offset) {
        Ok(Some(read)) => read,
        Ok(None) => break,
        Err(e) => {
          error!("corrupt store at {address:#x}: {e}");
          return Err(e);
        }
      };
      if index.put(read.record.key, read.record.value).is_some() {
        warn!("duplicate key at offset {offset}, keeping the later value");
      }
      offset += read.size;
    }

    // the map may hold fewer bytes than were read when keys repeated
    let used_size = index
      .entries()
      .iter()
      .fold(SIGNATURE_SIZE, |acc, (k, v)| acc + encoded_record_size(k.len(), v.len()));
    Ok((index, used_size))
  }

  fn init_store(&self) -> Result<()> {
    self.erase_region()?;
    let address = self.options.region_address;
    let page = header::signature_page(self.options.page_size as usize);
    if !self.port.write(address, &page) {
      error!("failed to write store signature at {address:#x}");
      return Err(Errors::FailedToWriteFlash {
        address,
        len: page.len(),
      });
    }
    Ok(())
  }

  fn erase_region(&self) -> Result<()> {
    let address = self.options.region_address;
    let len = self.options.region_size;
    if !self.port.erase(address, len) {
      error!("failed to erase store region at {address:#x}");
      return Err(Errors::FailedToEraseFlash { address, len });
    }
    Ok(())
  }

  /// Signature, records and terminator, zero padded to whole pages.
  fn encode_image(&self) -> BytesMut {
    let page_size = self.options.page_size as usize;
    let region_size = self.options.region_size as usize;

    let mut buf = BytesMut::with_capacity(self.used_size.div_ceil(page_size) * page_size);
    buf.extend_from_slice(&SIGNATURE);
    for (key, value) in self.index.entries() {
      KvRecord::new(key, value).encode_into(&mut buf);
    }
    // a store that fills the region exactly ends without a terminator
    if buf.len() + LEN_FIELD_SIZE <= region_size {
      buf.extend_from_slice(&terminator());
    }
    let padded = buf.len().div_ceil(page_size) * page_size;
    buf.resize(padded.min(region_size), 0);
    buf
  }
}

impl Drop for Engine {
  fn drop(&mut self) {
    if !self.options.save_on_drop || !self.is_loaded() {
      return;
    }
    if let Err(e) = self.save() {
      error!("failed to save store on drop: {e}");
    }
  }
}
