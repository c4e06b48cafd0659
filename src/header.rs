//! Per-block header strategies.
//!
//! Each [`HeaderPolicy`] maps to one [`HeaderStrategy`], chosen once when the
//! allocator is built. A strategy only ever sees the payload bytes of a
//! header; the trailing boundary flag byte is maintained by the allocator.

use std::mem;

use crate::config::HeaderPolicy;

pub const FLAG_SIZE: usize = 1;
pub const ALLOC_NUM_SIZE: usize = mem::size_of::<u32>();
pub const REUSE_COUNT_SIZE: usize = mem::size_of::<u16>();
pub const BLOCK_INFO_PTR_SIZE: usize = mem::size_of::<usize>();

/// What `allocate` knows about the block it is handing out.
#[derive(Debug, Clone, Copy)]
pub struct BlockMeta<'a> {
  pub alloc_num: u32,
  pub label: Option<&'a str>,
}

/// Decoded header contents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderInfo {
  /// Allocation number of the current owner, 0 when free.
  pub alloc_num: u32,
  /// Times the block has been handed out (extended headers only).
  pub reuse_count: Option<u16>,
  pub in_use: bool,
  /// Label given to `allocate` (external headers only).
  pub label: Option<String>,
}

/// Out-of-band record referenced from an external header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemBlockInfo {
  pub in_use: bool,
  pub alloc_num: u32,
  pub label: Option<String>,
}

pub trait HeaderStrategy {
  fn policy(&self) -> HeaderPolicy;

  /// Stamps the header of a block that is being handed out.
  fn encode(
    &mut self,
    payload: &mut [u8],
    meta: &BlockMeta<'_>,
  );

  /// Reads the header back, `None` if the policy stores nothing.
  fn decode(
    &self,
    payload: &[u8],
  ) -> Option<HeaderInfo>;

  /// Clears the header of a block that is being returned.
  fn release(
    &mut self,
    payload: &mut [u8],
  );

  /// True if headers reference memory that page teardown cannot reach.
  fn owns_records(&self) -> bool {
    false
  }

  fn outstanding_records(&self) -> usize {
    0
  }
}

pub fn strategy_for(policy: HeaderPolicy) -> Box<dyn HeaderStrategy> {
  match policy {
    HeaderPolicy::None => Box::new(NoHeader),
    HeaderPolicy::Basic => Box::new(BasicHeader),
    HeaderPolicy::Extended => Box::new(ExtendedHeader),
    HeaderPolicy::External => Box::new(ExternalHeader::default()),
  }
}

fn read_u32(bytes: &[u8]) -> u32 {
  let mut raw = [0u8; ALLOC_NUM_SIZE];
  raw.copy_from_slice(&bytes[..ALLOC_NUM_SIZE]);
  u32::from_ne_bytes(raw)
}

fn read_u16(bytes: &[u8]) -> u16 {
  let mut raw = [0u8; REUSE_COUNT_SIZE];
  raw.copy_from_slice(&bytes[..REUSE_COUNT_SIZE]);
  u16::from_ne_bytes(raw)
}

fn read_usize(bytes: &[u8]) -> usize {
  let mut raw = [0u8; BLOCK_INFO_PTR_SIZE];
  raw.copy_from_slice(&bytes[..BLOCK_INFO_PTR_SIZE]);
  usize::from_ne_bytes(raw)
}

pub struct NoHeader;

impl HeaderStrategy for NoHeader {
  fn policy(&self) -> HeaderPolicy {
    HeaderPolicy::None
  }

  fn encode(
    &mut self,
    _payload: &mut [u8],
    _meta: &BlockMeta<'_>,
  ) {
  }

  fn decode(
    &self,
    _payload: &[u8],
  ) -> Option<HeaderInfo> {
    None
  }

  fn release(
    &mut self,
    _payload: &mut [u8],
  ) {
  }
}

/// `[alloc # : u32]`
pub struct BasicHeader;

impl HeaderStrategy for BasicHeader {
  fn policy(&self) -> HeaderPolicy {
    HeaderPolicy::Basic
  }

  fn encode(
    &mut self,
    payload: &mut [u8],
    meta: &BlockMeta<'_>,
  ) {
    payload[..ALLOC_NUM_SIZE].copy_from_slice(&meta.alloc_num.to_ne_bytes());
  }

  fn decode(
    &self,
    payload: &[u8],
  ) -> Option<HeaderInfo> {
    let alloc_num = read_u32(payload);
    Some(HeaderInfo {
      alloc_num,
      in_use: alloc_num != 0,
      ..HeaderInfo::default()
    })
  }

  fn release(
    &mut self,
    payload: &mut [u8],
  ) {
    payload[..ALLOC_NUM_SIZE].fill(0);
  }
}

/// `[reuse count : u16][alloc # : u32]`
///
/// The reuse count survives `free` and keeps counting for the lifetime of
/// the page.
pub struct ExtendedHeader;

impl ExtendedHeader {
  const ALLOC_NUM_OFFSET: usize = REUSE_COUNT_SIZE;
}

impl HeaderStrategy for ExtendedHeader {
  fn policy(&self) -> HeaderPolicy {
    HeaderPolicy::Extended
  }

  fn encode(
    &mut self,
    payload: &mut [u8],
    meta: &BlockMeta<'_>,
  ) {
    let reuse_count = read_u16(payload).wrapping_add(1);
    payload[..REUSE_COUNT_SIZE].copy_from_slice(&reuse_count.to_ne_bytes());

    let alloc_num = &mut payload[Self::ALLOC_NUM_OFFSET..Self::ALLOC_NUM_OFFSET + ALLOC_NUM_SIZE];
    alloc_num.copy_from_slice(&meta.alloc_num.to_ne_bytes());
  }

  fn decode(
    &self,
    payload: &[u8],
  ) -> Option<HeaderInfo> {
    let alloc_num = read_u32(&payload[Self::ALLOC_NUM_OFFSET..]);
    Some(HeaderInfo {
      alloc_num,
      reuse_count: Some(read_u16(payload)),
      in_use: alloc_num != 0,
      label: None,
    })
  }

  fn release(
    &mut self,
    payload: &mut [u8],
  ) {
    payload[Self::ALLOC_NUM_OFFSET..Self::ALLOC_NUM_OFFSET + ALLOC_NUM_SIZE].fill(0);
  }
}

/// `[address of MemBlockInfo : usize]`, 0 when no record is attached.
///
/// Records are created by `encode` and destroyed by `release`; the strategy
/// counts how many are alive.
#[derive(Default)]
pub struct ExternalHeader {
  outstanding: usize,
}

impl ExternalHeader {
  fn record(payload: &[u8]) -> Option<*mut MemBlockInfo> {
    match read_usize(payload) {
      0 => None,
      addr => Some(addr as *mut MemBlockInfo),
    }
  }
}

impl HeaderStrategy for ExternalHeader {
  fn policy(&self) -> HeaderPolicy {
    HeaderPolicy::External
  }

  fn encode(
    &mut self,
    payload: &mut [u8],
    meta: &BlockMeta<'_>,
  ) {
    self.release(payload);

    let record = Box::new(MemBlockInfo {
      in_use: true,
      alloc_num: meta.alloc_num,
      label: meta.label.map(str::to_owned),
    });
    let addr = Box::into_raw(record) as usize;
    payload[..BLOCK_INFO_PTR_SIZE].copy_from_slice(&addr.to_ne_bytes());
    self.outstanding += 1;
  }

  fn decode(
    &self,
    payload: &[u8],
  ) -> Option<HeaderInfo> {
    let Some(record) = Self::record(payload) else {
      return Some(HeaderInfo::default());
    };

    // SAFETY: non-zero payloads are only ever written by `encode`, from a
    // live `Box<MemBlockInfo>` that `release` has not reclaimed yet.
    let record = unsafe { &*record };
    Some(HeaderInfo {
      alloc_num: record.alloc_num,
      reuse_count: None,
      in_use: record.in_use,
      label: record.label.clone(),
    })
  }

  fn release(
    &mut self,
    payload: &mut [u8],
  ) {
    let Some(record) = Self::record(payload) else {
      return;
    };

    // SAFETY: see `decode`; the payload is zeroed right after, so the box is
    // reclaimed exactly once.
    let mut record = unsafe { Box::from_raw(record) };
    record.in_use = false;
    drop(record);

    payload[..BLOCK_INFO_PTR_SIZE].fill(0);
    self.outstanding -= 1;
  }

  fn owns_records(&self) -> bool {
    true
  }

  fn outstanding_records(&self) -> usize {
    self.outstanding
  }
}
