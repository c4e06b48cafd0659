//! Fill patterns and pad-byte verification.
//!
//! Every byte the allocator owns carries a recognisable value so memory
//! dumps show at a glance what a region is, and stray writes into the pad
//! regions can be detected when the block is freed.

use crate::block::Block;
use crate::error::{PadSide, PoolError, PoolResult};

/// Object bytes of a block that has never been handed out.
pub const UNALLOCATED_PATTERN: u8 = 0xAA;

/// Object bytes right after `allocate`.
pub const ALLOCATED_PATTERN: u8 = 0xBB;

/// Object bytes right after `free`.
pub const FREED_PATTERN: u8 = 0xCC;

/// Pad signature on both sides of every object.
pub const PAD_PATTERN: u8 = 0xDD;

/// Alignment filler.
pub const ALIGN_PATTERN: u8 = 0xEE;

/// Returns true if every byte equals `pattern`.
pub fn verify_pattern(
  bytes: &[u8],
  pattern: u8,
) -> bool {
  bytes.iter().all(|&b| b == pattern)
}

/// Fails on the first pad byte that lost the pad signature.
pub fn check_padding(block: &Block<'_>) -> PoolResult<()> {
  let sides = [(PadSide::Left, block.left_pad()), (PadSide::Right, block.right_pad())];

  for (side, pad) in sides {
    if let Some(offset) = pad.iter().position(|&b| b != PAD_PATTERN) {
      return Err(PoolError::CorruptedBlock {
        address: block.address(),
        side,
        offset,
      });
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::ptr::NonNull;

  use super::*;
  use crate::config::PoolConfig;
  use crate::layout::BlockLayout;

  #[test]
  fn test_verify_pattern() {
    assert!(verify_pattern(&[PAD_PATTERN; 8], PAD_PATTERN));
    assert!(verify_pattern(&[], PAD_PATTERN));
    assert!(!verify_pattern(&[PAD_PATTERN, 0], PAD_PATTERN));
  }

  #[test]
  fn test_check_padding() {
    let layout = BlockLayout::new(8, &PoolConfig::default().with_pad_bytes(4));
    let mut buf = vec![0u8; layout.stride()];
    let start = NonNull::new(buf.as_mut_ptr()).unwrap();
    let mut block = unsafe { Block::from_start(start, &layout) };

    block.left_pad_mut().fill(PAD_PATTERN);
    block.right_pad_mut().fill(PAD_PATTERN);
    assert!(check_padding(&block).is_ok());

    block.right_pad_mut()[3] = 0xFF;
    let err = check_padding(&block).unwrap_err();
    assert!(matches!(
      err,
      PoolError::CorruptedBlock {
        side: PadSide::Right,
        offset: 3,
        ..
      }
    ));

    block.left_pad_mut()[0] = ALIGN_PATTERN;
    let err = check_padding(&block).unwrap_err();
    assert!(matches!(
      err,
      PoolError::CorruptedBlock {
        side: PadSide::Left,
        offset: 0,
        ..
      }
    ));
  }
}
