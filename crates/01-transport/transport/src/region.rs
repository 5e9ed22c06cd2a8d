//! Word-addressed shared memory backing the rings.
//!
//! Native builds map anonymous memory and fall back to an aligned, zeroed heap
//! allocation when mapping is unavailable. The region is only ever observed as
//! a slice of atomic words, so every cross-thread access is an atomic one.

use crate::sync::AtomicU32;
use crate::{TransportError, TransportResult};

/// Size in bytes of one ring word.
pub const WORD_BYTES: usize = 4;

/// Alignment requested for heap-backed regions (one cache line).
pub const REGION_ALIGNMENT: usize = 64;

#[cfg(not(feature = "loom"))]
mod backing {
    use super::{AtomicU32, REGION_ALIGNMENT, WORD_BYTES};
    use crate::{TransportError, TransportResult};
    use std::alloc::{alloc_zeroed, dealloc, Layout};
    use std::ptr::NonNull;

    #[derive(Debug)]
    enum Storage {
        #[cfg(not(target_arch = "wasm32"))]
        Mapped(memmap2::MmapMut),
        Heap { ptr: NonNull<u8>, layout: Layout },
    }

    #[derive(Debug)]
    pub(crate) struct Words {
        len: usize,
        storage: Storage,
    }

    // SAFETY: the memory is only reachable as `&[AtomicU32]`, which is Sync.
    unsafe impl Send for Words {}
    unsafe impl Sync for Words {}

    impl Words {
        pub(crate) fn zeroed(len: usize) -> TransportResult<Self> {
            let size = len * WORD_BYTES;

            #[cfg(not(target_arch = "wasm32"))]
            {
                // Anonymous mappings are page aligned and zero filled.
                if let Ok(map) = memmap2::MmapOptions::new().len(size).map_anon() {
                    return Ok(Self {
                        len,
                        storage: Storage::Mapped(map),
                    });
                }
                log::debug!("anonymous mapping of {size} bytes failed; using heap region");
            }

            let failed = TransportError::AllocationFailed {
                size,
                alignment: REGION_ALIGNMENT,
            };
            let layout = Layout::from_size_align(size, REGION_ALIGNMENT).map_err(|_| {
                TransportError::AllocationFailed {
                    size,
                    alignment: REGION_ALIGNMENT,
                }
            })?;
            // SAFETY: layout has a non-zero size (callers enforce a minimum length).
            let ptr = unsafe { alloc_zeroed(layout) };
            let ptr = NonNull::new(ptr).ok_or(failed)?;
            Ok(Self {
                len,
                storage: Storage::Heap { ptr, layout },
            })
        }

        pub(crate) fn as_slice(&self) -> &[AtomicU32] {
            let base = match &self.storage {
                #[cfg(not(target_arch = "wasm32"))]
                Storage::Mapped(map) => map.as_ptr(),
                Storage::Heap { ptr, .. } => ptr.as_ptr() as *const u8,
            };
            // SAFETY: the region spans `len` zero-initialised, 4-byte aligned words and
            // lives as long as `self`. AtomicU32 has the same layout as u32.
            unsafe { std::slice::from_raw_parts(base as *const AtomicU32, self.len) }
        }
    }

    impl Drop for Words {
        fn drop(&mut self) {
            if let Storage::Heap { ptr, layout } = &self.storage {
                // SAFETY: allocated in `zeroed` with this exact layout.
                unsafe { dealloc(ptr.as_ptr(), *layout) };
            }
        }
    }
}

#[cfg(feature = "loom")]
mod backing {
    use super::AtomicU32;
    use crate::TransportResult;

    #[derive(Debug)]
    pub(crate) struct Words {
        words: Box<[AtomicU32]>,
    }

    impl Words {
        pub(crate) fn zeroed(len: usize) -> TransportResult<Self> {
            let words = (0..len).map(|_| AtomicU32::new(0)).collect();
            Ok(Self { words })
        }

        pub(crate) fn as_slice(&self) -> &[AtomicU32] {
            &self.words
        }
    }
}

/// A fixed-length run of zero-initialised atomic words.
#[derive(Debug)]
pub struct SharedRegion {
    words: backing::Words,
}

impl SharedRegion {
    /// Allocates `len` words, all zero.
    pub fn zeroed_words(len: usize) -> TransportResult<Self> {
        if len == 0 {
            return Err(TransportError::AllocationFailed {
                size: 0,
                alignment: REGION_ALIGNMENT,
            });
        }
        Ok(Self {
            words: backing::Words::zeroed(len)?,
        })
    }

    /// Number of words in the region.
    pub fn len_words(&self) -> usize {
        self.words().len()
    }

    /// Size of the region in bytes.
    pub fn len_bytes(&self) -> usize {
        self.len_words() * WORD_BYTES
    }

    pub(crate) fn words(&self) -> &[AtomicU32] {
        self.words.as_slice()
    }
}
