//! Error types for the pool allocator

use std::fmt;

use thiserror::Error;

pub type PoolResult<T> = Result<T, PoolError>;

/// Which pad region around an object failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadSide {
  Left,
  Right,
}

impl fmt::Display for PadSide {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::Left => write!(f, "left"),
      Self::Right => write!(f, "right"),
    }
  }
}

/// Errors reported by [`PoolAllocator`](crate::PoolAllocator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
  /// A new page would exceed the configured page limit.
  #[error("maximum number of pages ({max_pages}) has been allocated")]
  OutOfPages { max_pages: usize },

  /// The system allocator refused a request.
  #[error("system allocator could not provide {size} bytes")]
  OutOfMemory { size: usize },

  /// Freed more often than allocated, or the address is not a block in this pool.
  #[error("free of {address:#x} is not on a block boundary")]
  BadBoundary { address: usize },

  /// The block is already on the free list.
  #[error("block {address:#x} has already been freed")]
  DoubleFree { address: usize },

  /// Pad bytes around the block no longer carry the pad signature.
  #[error("memory corrupted {side} of block {address:#x} (pad byte {offset})")]
  CorruptedBlock {
    address: usize,
    side: PadSide,
    offset: usize,
  },

  #[error("invalid configuration: {0}")]
  InvalidConfig(&'static str),
}

impl PoolError {
  /// Stable error code.
  pub fn code(&self) -> &'static str {
    match self {
      Self::OutOfPages { .. } => "E_NO_PAGES",
      Self::OutOfMemory { .. } => "E_NO_MEMORY",
      Self::BadBoundary { .. } => "E_BAD_BOUNDARY",
      Self::DoubleFree { .. } => "E_MULTIPLE_FREE",
      Self::CorruptedBlock { .. } => "E_CORRUPTED_BLOCK",
      Self::InvalidConfig(_) => "E_INVALID_CONFIG",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_messages() {
    let err = PoolError::CorruptedBlock {
      address: 0x1000,
      side: PadSide::Right,
      offset: 2,
    };
    assert_eq!(err.to_string(), "memory corrupted right of block 0x1000 (pad byte 2)");
    assert_eq!(err.code(), "E_CORRUPTED_BLOCK");

    let err = PoolError::OutOfPages { max_pages: 3 };
    assert_eq!(err.to_string(), "maximum number of pages (3) has been allocated");
    assert_eq!(err.code(), "E_NO_PAGES");
  }
}
