// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckwerk raster: page headers, PWG/URF raster streams, ordered dithering,
// and continuous-tone image rasterization.

pub mod decode;
pub mod dither;
pub mod header;
pub mod image_raster;
pub mod stream;

pub use decode::{decode_gray, decode_gray_from_memory};
pub use dither::DitherMatrix;
pub use header::{ColorSpace, PageHeader};
pub use image_raster::{ImageRasterizer, ImageableArea, Placement};
pub use stream::{RasterReader, RasterWriter, StreamKind};
