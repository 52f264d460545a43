//! Ping-pong scratch buffer over a caller-owned slice.
//!
//! There is no allocator on the target: the caller hands in one `&mut [T]`
//! and the driver splits it into two equal halves. A Linear/Conv2D step reads
//! one half (or the external input, or a recurrent layer's state) and writes
//! the other; the roles swap after every such step.

use crate::error::{KernelError, KernelResult};

/// One half of the scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    A,
    B,
}

impl Half {
    #[inline(always)]
    pub fn other(self) -> Self {
        match self {
            Half::A => Half::B,
            Half::B => Half::A,
        }
    }
}

/// Two equal halves of a borrowed slice.
pub struct PingPong<'s, T> {
    buf: &'s mut [T],
    half_len: usize,
}

impl<'s, T> PingPong<'s, T> {
    /// Split `buf` into halves of `half_len` elements each.
    pub fn new(buf: &'s mut [T], half_len: usize) -> KernelResult<Self> {
        let required = 2 * half_len;
        if buf.len() < required {
            return Err(KernelError::BufferTooSmall { required, available: buf.len() });
        }
        Ok(Self { buf, half_len })
    }

    #[inline(always)]
    pub fn half_len(&self) -> usize {
        self.half_len
    }

    /// `(write, read)` views: `write` is the target half, `read` the other one.
    pub fn split(&mut self, write: Half) -> (&mut [T], &[T]) {
        let (a, rest) = self.buf.split_at_mut(self.half_len);
        let b = &mut rest[..self.half_len];
        match write {
            Half::A => (a, b),
            Half::B => (b, a),
        }
    }

    pub fn half(&self, half: Half) -> &[T] {
        match half {
            Half::A => &self.buf[..self.half_len],
            Half::B => &self.buf[self.half_len..2 * self.half_len],
        }
    }

    /// Read-only view of one half, consuming the splitter.
    pub fn into_half(self, half: Half) -> &'s [T] {
        let half_len = self.half_len;
        let buf: &'s [T] = self.buf;
        match half {
            Half::A => &buf[..half_len],
            Half::B => &buf[half_len..2 * half_len],
        }
    }
}
