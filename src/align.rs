/// Rounds `value` up to the machine word size.
///
/// # Examples
///
/// ```rust
/// use poolalloc::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + ::core::mem::size_of::<usize>() - 1) & !(::core::mem::size_of::<usize>() - 1)
  };
}

/// Rounds `value` up to a power-of-two `boundary`.
///
/// A boundary of 0 or 1 means "no alignment" and leaves the value as is.
///
/// ```rust
/// use poolalloc::align_to;
///
/// assert_eq!(align_to!(13, 16), 16);
/// assert_eq!(align_to!(32, 16), 32);
/// assert_eq!(align_to!(13, 0), 13);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $boundary:expr) => {{
    let value: usize = $value;
    let boundary: usize = $boundary;
    if boundary <= 1 {
      value
    } else {
      (value + boundary - 1) & !(boundary - 1)
    }
  }};
}
