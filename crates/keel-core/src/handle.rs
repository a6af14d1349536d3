//! Unsigned integer handle types.
//!
//! A handle is a dense unsigned integer naming a stored payload. Index
//! structures are generic over the handle width so that a small trie can
//! hand out `u8` handles while a large one uses `u32` or `u64`.

use std::fmt;
use std::hash::Hash;

/// An unsigned integer usable as a handle.
///
/// Conversions go through `u64`, the widest supported handle. Narrowing
/// fails rather than truncating.
pub trait Handle:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Width of the type in bits.
    const BITS: u32;

    /// Widen to `u64`.
    fn to_u64(self) -> u64;

    /// Narrow from `u64`, returning `None` if the value does not fit.
    fn from_u64(value: u64) -> Option<Self>;
}

macro_rules! impl_handle {
    ($($t:ty),*) => {
        $(
            impl Handle for $t {
                const BITS: u32 = <$t>::BITS;

                #[inline]
                fn to_u64(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn from_u64(value: u64) -> Option<Self> {
                    <$t>::try_from(value).ok()
                }
            }
        )*
    };
}

impl_handle!(u8, u16, u32, u64, usize);
