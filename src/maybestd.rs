//! A facade over items from `std` (or `core` and `alloc` when the `std`
//! feature is disabled) so the rest of the crate can import from one place.

#[cfg(not(feature = "std"))]
pub use alloc::{boxed, collections, format, string, vec};

#[cfg(feature = "std")]
pub use std::{boxed, collections, format, string, vec};

pub use core::{cmp, fmt, hash, iter, marker, mem, ops};
