//! A small key/value store persisted in a fixed region of NOR flash.
//!
//! The store is held entirely in RAM while open. Flash is only touched by
//! three blocking primitives supplied through [`fio::FlashPort`]: read a byte
//! range, program whole pages, erase whole sectors. Loading reads the region
//! once; saving erases the region and rewrites the full image.
//!
//! # On-flash format
//!
//! ```text
//! offset 0 : signature "FKVS"
//! offset 4 : record*   key len (u16 LE) | key | value len (u16 LE) | value
//!          : terminator, a key len of 0
//!          : zero padding to the next page boundary
//! ```
//!
//! There is no wear leveling and no atomic commit: losing power between the
//! erase and the last page write of a save loses the store.
//!
//! # Basic Usage
//!
//! ```
//! use bytes::Bytes;
//! use flash_region_kv::{
//!   db::{Engine, LoadStatus},
//!   fio::mem::MemFlash,
//!   option::Options,
//! };
//! use std::sync::Arc;
//!
//! let opts = Options::default();
//! let flash = Arc::new(MemFlash::new(
//!   opts.region_address,
//!   opts.region_size,
//!   opts.page_size,
//!   opts.sector_size,
//! ));
//!
//! let mut engine = Engine::with_port(flash.clone(), opts.clone()).expect("bad options");
//! assert_eq!(engine.load().expect("failed to load"), LoadStatus::Initialized);
//!
//! engine
//!   .write_key(Bytes::from("hello"), Bytes::from("world"))
//!   .expect("failed to write");
//! engine.save().expect("failed to save");
//! drop(engine);
//!
//! let mut engine = Engine::with_port(flash, opts).expect("bad options");
//! assert_eq!(engine.load().expect("failed to load"), LoadStatus::Loaded);
//! assert_eq!(
//!   engine.read_key(b"hello").expect("not loaded"),
//!   Some(Bytes::from("world"))
//! );
//! ```

pub mod data;
pub mod db;
pub mod errors;
pub mod fio;
pub mod index;
pub mod option;
pub mod util;
