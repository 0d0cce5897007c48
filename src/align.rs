/// Rounds `value` up to the next multiple of `align`, which must be a power
/// of two.
///
/// # Examples
///
/// ```rust
/// use rallocator::align_to;
///
/// assert_eq!(align_to!(13, 8), 16);
/// assert_eq!(align_to!(64, 64), 64);
/// assert_eq!(align_to!(0, 16), 0);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    (($value) + ($align) - 1) & !(($align) - 1)
  };
}

/// Rounds `value` up to the allocator's alignment unit.
///
/// # Examples
///
/// ```rust
/// use rallocator::{ALIGNMENT, align};
///
/// assert_eq!(ALIGNMENT, 16);
/// assert_eq!(align!(10), 16);
/// assert_eq!(align!(17), 32);
/// assert_eq!(align!(32), 32);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, $crate::ALIGNMENT)
  };
}

/// Rounds `value` down to a multiple of `align` (a power of two).
#[inline]
pub const fn align_down(
  value: usize,
  align: usize,
) -> usize {
  debug_assert!(align.is_power_of_two());
  value & !(align - 1)
}

#[cfg(test)]
mod tests {
  use super::align_down;
  use crate::ALIGNMENT;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ALIGNMENT * i + 1)..=(ALIGNMENT * (i + 1));

      let expected_alignment = ALIGNMENT * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_align_to_powers_of_two() {
    for shift in 0..8 {
      let align = 1usize << shift;
      for value in 0..200usize {
        let rounded = align_to!(value, align);
        assert_eq!(rounded % align, 0);
        assert!(rounded >= value);
        assert!(rounded - value < align);
      }
    }
  }

  #[test]
  fn test_align_down() {
    assert_eq!(align_down(255, 16), 240);
    assert_eq!(align_down(256, 16), 256);
    assert_eq!(align_down(15, 16), 0);
  }
}
