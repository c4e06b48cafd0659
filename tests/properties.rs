//! Property tests for allocator bookkeeping.
//!
//! After every operation:
//! - `objects_in_use + free_objects == pages_in_use * objects_per_page`
//! - `allocations - deallocations == objects_in_use`

use std::ptr::NonNull;

use poolalloc::{HeaderPolicy, PoolAllocator, PoolConfig, PoolError, PoolStats};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
  Allocate,
  Free(usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![Just(Op::Allocate), any::<usize>().prop_map(Op::Free)]
}

fn header_policy() -> impl Strategy<Value = HeaderPolicy> {
  prop_oneof![
    Just(HeaderPolicy::None),
    Just(HeaderPolicy::Basic),
    Just(HeaderPolicy::Extended),
    Just(HeaderPolicy::External),
  ]
}

fn config() -> impl Strategy<Value = PoolConfig> {
  (
    1usize..6,
    0usize..4,
    header_policy(),
    prop_oneof![Just(0usize), Just(8), Just(16)],
    0usize..5,
  )
    .prop_map(|(objects_per_page, max_pages, policy, alignment, pads)| {
      PoolConfig::default()
        .with_objects_per_page(objects_per_page)
        .with_max_pages(max_pages)
        .with_header_policy(policy)
        .with_alignment(alignment)
        .with_pad_bytes(pads)
    })
}

fn check_invariants(
  stats: &PoolStats,
  objects_per_page: usize,
) {
  assert_eq!(
    stats.objects_in_use + stats.free_objects,
    stats.pages_in_use * objects_per_page
  );
  assert_eq!(stats.allocations - stats.deallocations, stats.objects_in_use);
  assert!(stats.most_objects_ever_in_use >= stats.objects_in_use);
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn bookkeeping_invariants_hold(
    config in config(),
    object_size in 8usize..48,
    ops in proptest::collection::vec(op(), 1..80),
  ) {
    let objects_per_page = config.objects_per_page;
    let max_pages = config.max_pages;
    let mut pool = PoolAllocator::new(object_size, config).unwrap();
    let mut live: Vec<NonNull<u8>> = Vec::new();

    check_invariants(&pool.stats(), objects_per_page);

    for op in ops {
      match op {
        Op::Allocate => match pool.allocate(Some("prop")) {
          Ok(object) => {
            prop_assert!(!live.contains(&object));
            live.push(object);
          }
          Err(PoolError::OutOfPages { .. }) => {
            prop_assert!(max_pages != 0);
            prop_assert_eq!(pool.stats().pages_in_use, max_pages);
            prop_assert_eq!(pool.stats().free_objects, 0);
          }
          Err(err) => prop_assert!(false, "unexpected error: {err}"),
        },
        Op::Free(index) => {
          if live.is_empty() {
            let err = unsafe { pool.free(NonNull::<u64>::dangling().as_ptr().cast()) }.unwrap_err();
            prop_assert!(matches!(err, PoolError::BadBoundary { .. }), "unexpected error");
          } else {
            let object = live.swap_remove(index % live.len());
            unsafe { pool.free(object.as_ptr()) }.unwrap();
          }
        }
      }

      check_invariants(&pool.stats(), objects_per_page);
      prop_assert_eq!(pool.dump_memory_in_use(|_, _| {}), live.len());
    }

    for object in live.drain(..) {
      unsafe { pool.free(object.as_ptr()) }.unwrap();
    }

    let stats = pool.stats();
    prop_assert_eq!(stats.objects_in_use, 0);
    prop_assert_eq!(stats.free_objects, stats.pages_in_use * objects_per_page);
    prop_assert_eq!(pool.outstanding_records(), 0);
    prop_assert_eq!(pool.validate_pages(|_, _| {}), 0);
  }

  #[test]
  fn free_order_does_not_matter(
    count in 1usize..40,
    seed in any::<u64>(),
  ) {
    let config = PoolConfig::default()
      .with_objects_per_page(4)
      .with_max_pages(0)
      .with_header_policy(HeaderPolicy::Extended)
      .with_pad_bytes(2);
    let mut pool = PoolAllocator::new(16, config).unwrap();

    let mut objects: Vec<_> = (0..count).map(|_| pool.allocate(None).unwrap()).collect();

    // Deterministic shuffle driven by the seed.
    let mut state = seed | 1;
    for i in (1..objects.len()).rev() {
      state ^= state << 13;
      state ^= state >> 7;
      state ^= state << 17;
      objects.swap(i, (state % (i as u64 + 1)) as usize);
    }

    for object in objects {
      unsafe { pool.free(object.as_ptr()) }.unwrap();
    }

    let stats = pool.stats();
    prop_assert_eq!(stats.objects_in_use, 0);
    prop_assert_eq!(stats.free_objects, stats.pages_in_use * 4);
    prop_assert_eq!(stats.pages_in_use, count.div_ceil(4));
  }
}
