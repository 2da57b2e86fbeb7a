use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use flash_region_kv::{
  db::Engine,
  fio::{mem::MemFlash, FlashGeometry},
  option::Options,
  util::rand_kv::{get_test_key, get_test_value},
};
use rand::Rng;

const KEY_NUM: usize = 1000;

fn bench_options() -> Options {
  let mut option = Options::default();
  option.region_size = 128 * 1024;
  option.save_on_drop = false;
  option
}

fn filled_engine(option: &Options) -> (Arc<MemFlash>, Engine) {
  let flash = Arc::new(MemFlash::with_geometry(
    FlashGeometry::from_options(option),
    0xFF,
  ));
  let mut engine = Engine::with_port(flash.clone(), option.clone()).unwrap();
  engine.load().unwrap();
  for i in 0..KEY_NUM {
    let res = engine.write_key(get_test_key(i), get_test_value(i));
    assert!(res.is_ok());
  }
  (flash, engine)
}

fn bench_write_key(c: &mut Criterion) {
  let (_flash, mut engine) = filled_engine(&bench_options());
  let mut rnd = rand::rng();

  c.bench_function("flash-kv-write-key-bench", |b| {
    b.iter(|| {
      let i = rnd.random_range(0..KEY_NUM);
      let res = engine.write_key(get_test_key(i), get_test_value(i));
      assert!(res.is_ok());
    })
  });
}

fn bench_read_key(c: &mut Criterion) {
  let (_flash, engine) = filled_engine(&bench_options());
  let mut rnd = rand::rng();

  c.bench_function("flash-kv-read-key-bench", |b| {
    b.iter(|| {
      let i = rnd.random_range(0..2 * KEY_NUM);
      let res = engine.read_key(&get_test_key(i));
      assert_eq!(res.unwrap().is_some(), i < KEY_NUM);
    })
  });
}

fn bench_save(c: &mut Criterion) {
  let (_flash, mut engine) = filled_engine(&bench_options());

  c.bench_function("flash-kv-save-bench", |b| {
    b.iter(|| {
      let res = engine.save();
      assert!(res.is_ok());
    })
  });
}

fn bench_load(c: &mut Criterion) {
  let option = bench_options();
  let (flash, mut engine) = filled_engine(&option);
  engine.save().unwrap();
  drop(engine);

  c.bench_function("flash-kv-load-bench", |b| {
    b.iter(|| {
      let mut engine = Engine::with_port(flash.clone(), option.clone()).unwrap();
      let res = engine.load();
      assert!(res.is_ok());
    })
  });
}

fn bench_listkeys(c: &mut Criterion) {
  let (_flash, engine) = filled_engine(&bench_options());

  c.bench_function("flash-kv-listkeys-bench", |b| {
    b.iter(|| {
      let res = engine.list_keys();
      assert!(res.is_ok());
    })
  });
}

criterion_group!(
  benches,
  bench_read_key,
  bench_write_key,
  bench_save,
  bench_load,
  bench_listkeys
);
criterion_main!(benches);
