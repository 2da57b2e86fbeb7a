use bytes::Bytes;
use flash_region_kv::{
  db::{Engine, LoadStatus},
  option::{FlashType, Options},
};

fn main() {
  env_logger::init();

  let mut opts = Options::default();
  opts.flash_type = FlashType::StandardFile;
  opts.image_path = std::env::temp_dir().join("flash-kv-basic.img");

  let mut engine = Engine::open(opts).expect("failed to open flash-kv engine");
  match engine.load().expect("flash region is corrupt") {
    LoadStatus::Loaded => println!("found an existing store"),
    LoadStatus::Initialized => println!("formatted a new store"),
  }

  let boots = engine
    .read_key(b"boot_count")
    .expect("store not loaded")
    .map(|v| u32::from_le_bytes(v.as_ref().try_into().unwrap_or([0; 4])))
    .unwrap_or(0)
    + 1;
  engine
    .write_key(
      Bytes::from("boot_count"),
      Bytes::copy_from_slice(&boots.to_le_bytes()),
    )
    .expect("failed to write boot_count");
  engine
    .write_key(Bytes::from("hostname"), Bytes::from("flash-kv-demo"))
    .expect("failed to write hostname");

  for key in engine.list_keys().expect("store not loaded") {
    println!("key: {}", String::from_utf8_lossy(&key));
  }

  let stat = engine.stat().expect("store not loaded");
  println!(
    "boot #{boots}, {} keys, {}/{} bytes used",
    stat.key_num, stat.used_size, stat.region_size
  );

  engine.save().expect("failed to save store");
}
