//! Output-channel register blocking.
//!
//! A layer with `N` output channels is split into passes of fixed-width tiles.
//! The schedule is greedy over a descending list of candidate widths: take the
//! widest `T` with `remaining / T > 0`, run `remaining / T` tiles of `T`
//! accumulators, continue with the next width. The last candidate is always 1,
//! so every channel is covered exactly once.
//!
//! Inside a tile the loops are interchanged: each packed input pair is loaded
//! once and fed to all `T` accumulators before the next pair, which is what
//! amortizes the input traffic across channels.

use crate::backend::VectorMac;
use crate::error::{KernelError, KernelResult};
use crate::fixed::Numeric;

/// Widest tile the accumulator array is sized for.
pub const MAX_TILE_WIDTH: usize = 16;

/// Maximum number of candidate widths in a schedule.
pub const MAX_CANDIDATES: usize = 8;

/// Descending list of tile widths ending in 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSchedule {
    widths: [u8; MAX_CANDIDATES],
    len: u8,
}

impl TileSchedule {
    /// Validate and build a schedule from candidate widths, widest first.
    pub fn new(widths: &[usize]) -> KernelResult<Self> {
        if widths.is_empty() || widths.len() > MAX_CANDIDATES {
            return Err(KernelError::InvalidTileSchedule);
        }
        if widths[widths.len() - 1] != 1 {
            return Err(KernelError::InvalidTileSchedule);
        }
        if widths.iter().any(|&w| w == 0 || w > MAX_TILE_WIDTH) {
            return Err(KernelError::InvalidTileSchedule);
        }
        if widths.windows(2).any(|pair| pair[0] <= pair[1]) {
            return Err(KernelError::InvalidTileSchedule);
        }

        let mut packed = [0u8; MAX_CANDIDATES];
        for (dst, &w) in packed.iter_mut().zip(widths) {
            *dst = w as u8;
        }
        Ok(Self { widths: packed, len: widths.len() as u8 })
    }

    /// RISC-Y core: 14 accumulators fit next to the pointers and loop counters.
    pub const fn riscy() -> Self {
        Self { widths: [14, 8, 4, 2, 1, 0, 0, 0], len: 5 }
    }

    /// ASIP backend: four output registers.
    pub const fn asip() -> Self {
        Self { widths: [4, 2, 1, 0, 0, 0, 0, 0], len: 3 }
    }

    /// One channel at a time; the reference order.
    pub const fn untiled() -> Self {
        Self { widths: [1, 0, 0, 0, 0, 0, 0, 0], len: 1 }
    }

    pub fn widths(&self) -> &[u8] {
        &self.widths[..self.len as usize]
    }

    /// Widest tile this schedule will ever run.
    pub fn max_width(&self) -> usize {
        self.widths[0] as usize
    }

    /// Passes covering channels `0..n` in order.
    pub fn passes(&self, n: usize) -> TilePasses<'_> {
        TilePasses { widths: self.widths(), next: 0, remaining: n, first: 0 }
    }
}

impl Default for TileSchedule {
    fn default() -> Self {
        Self::riscy()
    }
}

/// `tiles` consecutive tiles of `width` channels starting at channel `first`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePass {
    pub width: usize,
    pub first: usize,
    pub tiles: usize,
}

impl TilePass {
    pub fn channels(&self) -> usize {
        self.width * self.tiles
    }

    /// First channel of every tile in this pass.
    pub fn tile_starts(&self) -> impl Iterator<Item = usize> {
        let (first, width) = (self.first, self.width);
        (0..self.tiles).map(move |t| first + t * width)
    }
}

/// Iterator returned by [`TileSchedule::passes`].
#[derive(Debug, Clone)]
pub struct TilePasses<'s> {
    widths: &'s [u8],
    next: usize,
    remaining: usize,
    first: usize,
}

impl Iterator for TilePasses<'_> {
    type Item = TilePass;

    fn next(&mut self) -> Option<TilePass> {
        while self.next < self.widths.len() {
            let width = self.widths[self.next] as usize;
            self.next += 1;
            let tiles = self.remaining / width;
            if tiles == 0 {
                continue;
            }
            let pass = TilePass { width, first: self.first, tiles };
            self.remaining -= pass.channels();
            self.first += pass.channels();
            return Some(pass);
        }
        None
    }
}

/// Run `tile(first_channel, width)` for every tile of an `n`-channel layer.
#[inline]
pub(crate) fn for_each_tile(schedule: &TileSchedule, n: usize, mut tile: impl FnMut(usize, usize)) {
    for pass in schedule.passes(n) {
        for first in pass.tile_starts() {
            tile(first, pass.width);
        }
    }
}

/// Accumulate one input stretch into a tile of accumulators.
///
/// Accumulator `t` reads its weights from
/// `weights[offset + t·row_stride ..][..x.len()]`. Pairs go through
/// [`VectorMac::mac2`]; an odd trailing element goes through `mac1`, so exactly
/// `x.len()` elements are consumed per accumulator.
#[inline(always)]
pub(crate) fn accumulate_tile<T: Numeric, M: VectorMac<T>>(
    mac: &M,
    acc: &mut [T::Acc],
    x: &[T],
    weights: &[T],
    offset: usize,
    row_stride: usize,
) {
    let n = x.len();
    let even = n & !1;

    let mut i = 0;
    while i < even {
        let xv = [x[i], x[i + 1]];
        let mut row = offset + i;
        for a in acc.iter_mut() {
            *a = mac.mac2(*a, xv, [weights[row], weights[row + 1]]);
            row += row_stride;
        }
        i += 2;
    }

    if even < n {
        let xs = x[even];
        let mut row = offset + even;
        for a in acc.iter_mut() {
            *a = mac.mac1(*a, xs, weights[row]);
            row += row_stride;
        }
    }
}
