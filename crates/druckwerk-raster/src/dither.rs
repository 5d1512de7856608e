// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 16x16 ordered-dither threshold matrices.
//
// A gray sample `v` at device position (x, y) is inked when
// `v <= matrix[y & 15][x & 15]`.  Thresholds top out at 254 so pure white
// never inks; pure black (0) always does.

use std::sync::LazyLock;

use druckwerk_core::types::{ColorMode, ContentOptimize};

/// Tile size of every matrix.
pub const DITHER_SIZE: usize = 16;

/// A tileable 16x16 threshold matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitherMatrix([[u8; DITHER_SIZE]; DITHER_SIZE]);

static BAYER: LazyLock<DitherMatrix> = LazyLock::new(build_bayer);
static CLUSTERED: LazyLock<DitherMatrix> = LazyLock::new(build_clustered);
static THRESHOLD: DitherMatrix = DitherMatrix([[127; DITHER_SIZE]; DITHER_SIZE]);

impl DitherMatrix {
    /// Dispersed-dot (Bayer) matrix for general content.
    pub fn bayer() -> &'static Self {
        &BAYER
    }

    /// Clustered-dot matrix, better suited to photos on printers with dot gain.
    pub fn clustered() -> &'static Self {
        &CLUSTERED
    }

    /// Flat 50% threshold for crisp bi-level text.
    pub fn threshold() -> &'static Self {
        &THRESHOLD
    }

    /// Pick a matrix for the resolved color mode and content hint.
    pub fn for_content(color_mode: ColorMode, content: ContentOptimize) -> &'static Self {
        if color_mode == ColorMode::BI_LEVEL {
            Self::threshold()
        } else if content == ContentOptimize::PHOTO {
            Self::clustered()
        } else {
            Self::bayer()
        }
    }

    /// Threshold row for device line `y`.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8; DITHER_SIZE] {
        &self.0[(y & 15) as usize]
    }

    #[inline]
    pub fn threshold_at(&self, x: u32, y: u32) -> u8 {
        self.row(y)[(x & 15) as usize]
    }
}

/// Scale a rank in 0..=255 to a threshold in 0..=254.
fn rank_to_threshold(rank: u32) -> u8 {
    (rank * 254 / 255) as u8
}

/// Rank of (x, y) in the recursive Bayer ordering.  The finest bit level is
/// the most significant digit.
fn bayer_rank(x: usize, y: usize) -> u32 {
    let mut rank = 0u32;
    for bit in 0..4 {
        let xb = ((x >> bit) & 1) as u32;
        let yb = ((y >> bit) & 1) as u32;
        let digit = 2 * (xb ^ yb) + yb;
        rank |= digit << (2 * (3 - bit));
    }
    rank
}

fn build_bayer() -> DitherMatrix {
    let mut m = [[0u8; DITHER_SIZE]; DITHER_SIZE];
    for (y, row) in m.iter_mut().enumerate() {
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = rank_to_threshold(bayer_rank(x, y));
        }
    }
    DitherMatrix(m)
}

/// Four 8x8 cells per tile, dots growing outward from each cell centre.
fn build_clustered() -> DitherMatrix {
    let mut order: Vec<(u32, u32, usize, usize)> = Vec::with_capacity(DITHER_SIZE * DITHER_SIZE);
    for y in 0..DITHER_SIZE {
        for x in 0..DITHER_SIZE {
            let dx = 2 * (x % 8) as i32 - 7;
            let dy = 2 * (y % 8) as i32 - 7;
            order.push(((dx * dx + dy * dy) as u32, bayer_rank(x, y), x, y));
        }
    }
    order.sort_unstable();

    let mut m = [[0u8; DITHER_SIZE]; DITHER_SIZE];
    for (rank, (_, _, x, y)) in order.into_iter().enumerate() {
        m[y][x] = rank_to_threshold(255 - rank as u32);
    }
    DitherMatrix(m)
}
