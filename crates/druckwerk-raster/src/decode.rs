// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Continuous-tone image decoding to 8-bit gray on a white background.
//
// JPEG and PNG decoding is delegated to the `image` crate.  Alpha is
// composited over white so transparent regions never ink.

use std::io::{BufRead, Cursor, Seek};
use std::path::Path;

use druckwerk_core::error::{DruckwerkError, Result};
use image::{GrayImage, ImageReader, Limits, Luma};
use tracing::{debug, instrument};

/// Largest accepted image dimension, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 16_384;

/// Decode an image file to gray.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn decode_gray(path: impl AsRef<Path>) -> Result<GrayImage> {
    let path = path.as_ref();
    let reader = ImageReader::open(path).map_err(|err| {
        DruckwerkError::Image(format!("failed to open {}: {err}", path.display()))
    })?;
    decode_reader(reader)
}

/// Decode an in-memory encoded image to gray.
pub fn decode_gray_from_memory(data: &[u8]) -> Result<GrayImage> {
    decode_reader(ImageReader::new(Cursor::new(data)))
}

fn decode_reader<R: BufRead + Seek>(reader: ImageReader<R>) -> Result<GrayImage> {
    let mut reader = reader
        .with_guessed_format()
        .map_err(|err| DruckwerkError::Image(format!("failed to sniff image format: {err}")))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    reader.limits(limits);

    let decoded = reader
        .decode()
        .map_err(|err| DruckwerkError::Image(format!("failed to decode image: {err}")))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(DruckwerkError::Image("image has no pixels".into()));
    }

    let luma_alpha = decoded.to_luma_alpha8();
    let mut gray = GrayImage::new(luma_alpha.width(), luma_alpha.height());
    for (dst, src) in gray.pixels_mut().zip(luma_alpha.pixels()) {
        let [l, a] = src.0;
        let (l, a) = (u32::from(l), u32::from(a));
        *dst = Luma([((l * a + 255 * (255 - a) + 127) / 255) as u8]);
    }

    debug!(width = gray.width(), height = gray.height(), "image decoded to gray");
    Ok(gray)
}
