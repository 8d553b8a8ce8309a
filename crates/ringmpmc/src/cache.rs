//! Cache-line padding for hot atomic fields.
//!
//! Producers hammer `tail` while consumers hammer `head`. If the two share a
//! cache line every push invalidates the consumers' copy and every pop the
//! producers', so each cursor gets a line of its own.
//!
//! The line size is a per-architecture table resolved at compile time. The
//! table exists twice, once as [`CACHE_LINE_SIZE`] and once as the
//! `repr(align(..))` attributes on [`CacheAligned`] (attribute arguments must
//! be literals), and a const assertion keeps the two in step.

use std::ops::{Deref, DerefMut};

// =============================================================================
// LINE SIZE TABLE
// =============================================================================

/// Recommended padding, in bytes, between independently-written hot fields.
///
/// - 128 on x86_64 and aarch64, where the spatial prefetcher pulls cache lines
///   in pairs, and on powerpc64 whose lines are 128 bytes.
/// - 32 on arm, mips, sparc and hexagon.
/// - 256 on s390x.
/// - 64 everywhere else.
#[cfg(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "powerpc64",
))]
pub const CACHE_LINE_SIZE: usize = 128;

#[cfg(any(
    target_arch = "arm",
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "sparc",
    target_arch = "hexagon",
))]
pub const CACHE_LINE_SIZE: usize = 32;

#[cfg(target_arch = "s390x")]
pub const CACHE_LINE_SIZE: usize = 256;

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "powerpc64",
    target_arch = "arm",
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "sparc",
    target_arch = "hexagon",
    target_arch = "s390x",
)))]
pub const CACHE_LINE_SIZE: usize = 64;

// =============================================================================
// CACHE LINE ALIGNMENT
// =============================================================================

/// Wrapper that aligns (and therefore pads) its value to [`CACHE_LINE_SIZE`].
///
/// Two `CacheAligned` fields placed next to each other in a struct never share
/// a cache line.
#[cfg_attr(
    any(
        target_arch = "x86_64",
        target_arch = "aarch64",
        target_arch = "powerpc64",
    ),
    repr(align(128))
)]
#[cfg_attr(
    any(
        target_arch = "arm",
        target_arch = "mips",
        target_arch = "mips64",
        target_arch = "sparc",
        target_arch = "hexagon",
    ),
    repr(align(32))
)]
#[cfg_attr(target_arch = "s390x", repr(align(256)))]
#[cfg_attr(
    not(any(
        target_arch = "x86_64",
        target_arch = "aarch64",
        target_arch = "powerpc64",
        target_arch = "arm",
        target_arch = "mips",
        target_arch = "mips64",
        target_arch = "sparc",
        target_arch = "hexagon",
        target_arch = "s390x",
    )),
    repr(align(64))
)]
#[derive(Debug, Default)]
pub struct CacheAligned<T> {
    value: T,
}

const _: () = assert!(
    std::mem::align_of::<CacheAligned<u8>>() == CACHE_LINE_SIZE,
    "CacheAligned alignment out of step with CACHE_LINE_SIZE"
);

impl<T> CacheAligned<T> {
    /// Wraps `value` in its own cache line.
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    /// Unwraps the value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> DerefMut for CacheAligned<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

impl<T> From<T> for CacheAligned<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
