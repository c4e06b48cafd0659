//! # poolalloc - A Fixed-Size Object Allocator
//!
//! This crate provides a **pool allocator**: every allocation has the same
//! size and is served out of preallocated pages instead of going to the
//! general-purpose heap each time.
//!
//! ## Overview
//!
//! ```text
//!   Pool Allocator Concept:
//!
//!   page list ──► ┌──────┬─────────┬─────────┬─────────┬─────────┐
//!                 │ next │ block 0 │ block 1 │ block 2 │ block 3 │
//!                 └──┬───┴─────────┴────▲────┴─────────┴────▲────┘
//!                    │                  │                   │
//!                    ▼             free list ──────────────►┘
//!                 ┌──────┬─────────┬─────────┬─────────┬─────────┐
//!                 │ null │ block 0 │ block 1 │ block 2 │ block 3 │
//!                 └──────┴─────────┴─────────┴─────────┴─────────┘
//!
//!   allocate: pop the top of the free list (grow a page if it is empty).
//!   free:     push the block back on top (LIFO reuse).
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   poolalloc
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── config     - PoolConfig, HeaderPolicy
//!   ├── error      - PoolError
//!   ├── layout     - Byte layout of blocks and pages
//!   ├── block      - Byte view over one block (internal)
//!   ├── pattern    - Fill patterns and pad-byte checks
//!   ├── header     - Header strategies, one per HeaderPolicy
//!   ├── freelist   - Intrusive free list (internal)
//!   ├── page       - Page allocation and carving (internal)
//!   ├── stats      - PoolStats
//!   └── allocator  - PoolAllocator
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use poolalloc::{HeaderPolicy, PoolAllocator, PoolConfig};
//!
//! let config = PoolConfig::default()
//!     .with_objects_per_page(8)
//!     .with_header_policy(HeaderPolicy::Basic)
//!     .with_pad_bytes(2);
//! let mut pool = PoolAllocator::new(32, config)?;
//!
//! let object = pool.allocate(None)?;
//! unsafe {
//!     object.as_ptr().write_bytes(0, 32);
//!     pool.free(object.as_ptr())?;
//! }
//!
//! assert_eq!(pool.stats().objects_in_use, 0);
//! # Ok::<(), poolalloc::PoolError>(())
//! ```
//!
//! ## Debugging Aids
//!
//! - Object bytes are stamped with a different pattern when a page is
//!   carved, when a block is handed out and when it is returned.
//! - Pad bytes on both sides of every object are checked on `free`; a
//!   damaged signature fails with [`PoolError::CorruptedBlock`] and the block
//!   stays out of the free list.
//! - Headers record allocation numbers, reuse counts or a labelled
//!   out-of-band record, depending on the [`HeaderPolicy`].
//! - [`PoolAllocator::dump_memory_in_use`] lists blocks that were never
//!   returned.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **One object size** per allocator
//! - **No shrinking**: Pages are released only when the allocator is dropped
//! - **Unix-only**: Requires `libc` (`posix_memalign`, `malloc`, `free`)

pub mod align;
mod allocator;
mod block;
mod config;
mod error;
mod freelist;
mod header;
mod layout;
mod page;
mod pattern;
mod stats;

pub use allocator::PoolAllocator;
pub use block::BlockState;
pub use config::{DEFAULT_MAX_PAGES, DEFAULT_OBJECTS_PER_PAGE, HeaderPolicy, PoolConfig};
pub use error::{PadSide, PoolError, PoolResult};
pub use header::{BlockMeta, HeaderInfo, HeaderStrategy, MemBlockInfo};
pub use layout::{BlockLayout, PAGE_LINK_SIZE};
pub use pattern::{
  ALIGN_PATTERN, ALLOCATED_PATTERN, FREED_PATTERN, PAD_PATTERN, UNALLOCATED_PATTERN, verify_pattern,
};
pub use stats::PoolStats;
