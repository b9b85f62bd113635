//! Fixed-capacity bump allocator with stack (LIFO) release.
//!
//! All transient text produced during code generation lives in a
//! [`StackArena`]: synthesized labels, rendered instruction lines, whole
//! output blocks. The arena is created once per generation unit, reset
//! between commands, and never grows; a translation that does not fit
//! fails with [`ArenaExhausted`] instead of reallocating.
//!
//! Pushed regions are addressed by offset ([`ArenaStr`]) rather than by
//! pointer, so earlier regions stay usable while later ones are appended
//! and the whole structure remains safe to move.

use std::fmt;

use thiserror::Error;

/// An allocation request did not fit in the arena's remaining capacity.
///
/// The arena is left exactly as it was; a failed push never partially
/// allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("arena exhausted: requested {requested} bytes with {remaining} remaining")]
pub struct ArenaExhausted {
    /// Bytes the failed push asked for.
    pub requested: usize,
    /// Bytes that were still available.
    pub remaining: usize,
}

/// A UTF-8 region previously pushed onto a [`StackArena`].
///
/// The region stays valid until a `pop` releases bytes at or below its
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStr {
    offset: usize,
    len: usize,
}

impl ArenaStr {
    pub(crate) fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Byte offset of the region's first byte.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the region in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A single-threaded bump allocator over one fixed-size block.
///
/// `push` claims bytes from the top, `pop` releases the most recently
/// claimed bytes. Popping more than is currently allocated is a
/// programming-contract violation and panics; it is never a recoverable
/// error.
pub struct StackArena {
    buf: Box<[u8]>,
    position: usize,
}

impl StackArena {
    /// Create an arena over a freshly allocated block of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            position: 0,
        }
    }

    /// Create an arena sized for translating an input of `input_len`
    /// bytes. Generated assembly expands the source, so the capacity is a
    /// small multiple of the input size.
    pub fn for_input(input_len: usize) -> Self {
        Self::with_capacity(input_len.saturating_mul(2).max(64))
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Current allocation top. Everything below this offset is live.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes still available for pushing.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.position
    }

    /// Claim `amount` bytes and return the offset of the claimed region.
    pub fn push(&mut self, amount: usize) -> Result<usize, ArenaExhausted> {
        if self.remaining() < amount {
            return Err(ArenaExhausted {
                requested: amount,
                remaining: self.remaining(),
            });
        }
        let offset = self.position;
        self.position += amount;
        Ok(offset)
    }

    /// Release the `amount` most recently claimed bytes.
    ///
    /// # Panics
    ///
    /// Panics if `amount` exceeds the current position.
    pub fn pop(&mut self, amount: usize) {
        assert!(
            amount <= self.position,
            "popped {amount} bytes with only {} allocated",
            self.position
        );
        self.position -= amount;
    }

    /// Push a copy of `bytes` and return its region.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<ArenaStr, ArenaExhausted> {
        let offset = self.push(bytes.len())?;
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(ArenaStr::new(offset, bytes.len()))
    }

    /// Push a copy of `text` and return its region.
    pub fn push_str(&mut self, text: &str) -> Result<ArenaStr, ArenaExhausted> {
        self.push_bytes(text.as_bytes())
    }

    /// Push a copy of an earlier region onto the top of the arena.
    ///
    /// Used when rendering a label whose text itself lives in the arena.
    pub fn push_copy_within(&mut self, src: ArenaStr) -> Result<ArenaStr, ArenaExhausted> {
        debug_assert!(src.offset + src.len <= self.position);
        let dst = self.push(src.len)?;
        self.buf.copy_within(src.offset..src.offset + src.len, dst);
        Ok(ArenaStr::new(dst, src.len))
    }

    /// The bytes of a previously pushed region.
    pub fn bytes_at(&self, region: ArenaStr) -> &[u8] {
        &self.buf[region.offset..region.offset + region.len]
    }

    /// The text of a previously pushed region.
    pub fn str_at(&self, region: ArenaStr) -> &str {
        // SAFETY: `ArenaStr` values are only produced by `push_str`,
        // `push_copy_within` and `ArenaWriter`, all of which write whole
        // UTF-8 strings, and `push_bytes` callers in this workspace write
        // ASCII instruction text.
        unsafe { std::str::from_utf8_unchecked(self.bytes_at(region)) }
    }

    /// The region spanning `start` up to the current position.
    ///
    /// Used to name a block assembled by several pushes.
    ///
    /// # Panics
    ///
    /// Panics if `start` is beyond the current position.
    pub fn region_from(&self, start: usize) -> ArenaStr {
        assert!(start <= self.position, "region start {start} beyond position {}", self.position);
        ArenaStr::new(start, self.position - start)
    }

    /// Start a formatted append. Everything written through the returned
    /// writer lands contiguously on top of the arena; `finish` commits it
    /// as one region, and any overflow rewinds to the starting position.
    pub fn writer(&mut self) -> ArenaWriter<'_> {
        let start = self.position;
        ArenaWriter {
            arena: self,
            start,
            error: None,
        }
    }
}

impl fmt::Debug for StackArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackArena")
            .field("capacity", &self.buf.len())
            .field("position", &self.position)
            .finish()
    }
}

/// Formatted-append handle for a [`StackArena`].
///
/// Implements [`fmt::Write`] so `write!` can format numbers and labels
/// straight into the arena without intermediate heap strings.
pub struct ArenaWriter<'a> {
    arena: &'a mut StackArena,
    start: usize,
    error: Option<ArenaExhausted>,
}

impl ArenaWriter<'_> {
    /// Commit everything written so far as one region.
    ///
    /// If any write overflowed the arena, the partial output is popped and
    /// the original exhaustion error is returned.
    pub fn finish(self) -> Result<ArenaStr, ArenaExhausted> {
        match self.error {
            Some(err) => {
                let written = self.arena.position - self.start;
                self.arena.pop(written);
                Err(err)
            }
            None => Ok(ArenaStr::new(self.start, self.arena.position - self.start)),
        }
    }
}

impl fmt::Write for ArenaWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.error.is_some() {
            return Err(fmt::Error);
        }
        match self.arena.push_bytes(s.as_bytes()) {
            Ok(_) => Ok(()),
            Err(err) => {
                self.error = Some(err);
                Err(fmt::Error)
            }
        }
    }
}
