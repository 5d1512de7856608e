// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster page header.
//
// A trimmed-down equivalent of the CUPS/PWG page header: the fields a driver
// needs to lay out scanlines, plus the PWG metadata that round-trips through
// the raster stream codec.

use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::media::{HMM_PER_INCH, MediaCol};
use druckwerk_core::types::Sides;

/// Raster color spaces (CUPS `cups_cspace_t` numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// Device gray, 0 = white.
    Gray,
    /// Device RGB.
    Rgb,
    /// Device black, 0 = white.
    #[default]
    Black,
    /// Device CMYK.
    Cmyk,
    /// sGray, 0 = black.
    SGray,
    /// sRGB.
    SRgb,
    /// Adobe RGB.
    AdobeRgb,
}

impl ColorSpace {
    /// CUPS numeric value.
    pub fn cups_value(&self) -> u32 {
        match self {
            Self::Gray => 0,
            Self::Rgb => 1,
            Self::Black => 3,
            Self::Cmyk => 6,
            Self::SGray => 18,
            Self::SRgb => 19,
            Self::AdobeRgb => 20,
        }
    }

    pub fn from_cups_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Gray),
            1 => Some(Self::Rgb),
            3 => Some(Self::Black),
            6 => Some(Self::Cmyk),
            18 => Some(Self::SGray),
            19 => Some(Self::SRgb),
            20 => Some(Self::AdobeRgb),
            _ => None,
        }
    }

    /// Byte that represents blank media for this color space.
    pub fn blank_byte(&self) -> u8 {
        match self {
            Self::Black | Self::Cmyk => 0x00,
            _ => 0xFF,
        }
    }

    pub fn num_colors(&self) -> u32 {
        match self {
            Self::Gray | Self::Black | Self::SGray => 1,
            Self::Rgb | Self::SRgb | Self::AdobeRgb => 3,
            Self::Cmyk => 4,
        }
    }
}

/// Page header for one raster page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageHeader {
    /// Media size name (PWG `cupsPageSizeName`).
    pub page_size_name: String,
    /// Media type keyword.
    pub media_type: String,
    /// Page size in points (1/72 inch).
    pub page_size: (u32, u32),
    /// Resolution in dots per inch.
    pub resolution: (u32, u32),
    /// Width in pixels.
    pub width: u32,
    /// Height in lines.
    pub height: u32,
    pub bits_per_color: u32,
    pub bits_per_pixel: u32,
    pub bytes_per_line: u32,
    pub color_space: ColorSpace,
    pub num_colors: u32,
    /// Duplexed output.
    pub duplex: bool,
    /// Short-edge duplex.
    pub tumble: bool,
    pub num_copies: u32,
    /// Total number of pages in the stream, 0 when unknown.
    pub total_page_count: u32,
}

impl PageHeader {
    /// Derive a header for `media` at the given resolution using a PWG raster
    /// type keyword such as `black_1` or `sgray_8`.
    pub fn for_media(
        media: &MediaCol,
        raster_type: &str,
        x_resolution: u32,
        y_resolution: u32,
        sides: Sides,
    ) -> Result<Self> {
        let (color_space, bits_per_color) = parse_raster_type(raster_type)?;
        if media.size_width <= 0 || media.size_length <= 0 {
            return Err(DruckwerkError::Raster(format!(
                "invalid media size {}x{}",
                media.size_width, media.size_length
            )));
        }
        if x_resolution == 0 || y_resolution == 0 {
            return Err(DruckwerkError::Raster("resolution must be positive".into()));
        }

        let size_width = media.size_width as u64;
        let size_length = media.size_length as u64;
        let hmm = HMM_PER_INCH as u64;

        let too_large = || {
            DruckwerkError::Raster(format!(
                "{raster_type} page at {x_resolution}x{y_resolution}dpi is too large"
            ))
        };
        let width = u32::try_from(size_width * x_resolution as u64 / hmm).map_err(|_| too_large())?;
        let height = u32::try_from(size_length * y_resolution as u64 / hmm).map_err(|_| too_large())?;
        let num_colors = color_space.num_colors();
        let bits_per_pixel = bits_per_color * num_colors;
        let line_bytes = bytes_per_line(width, bits_per_pixel).ok_or_else(too_large)?;

        Ok(Self {
            page_size_name: media.size_name.clone(),
            media_type: media.media_type.clone(),
            page_size: (
                (size_width * 72 / hmm) as u32,
                (size_length * 72 / hmm) as u32,
            ),
            resolution: (x_resolution, y_resolution),
            width,
            height,
            bits_per_color,
            bits_per_pixel,
            bytes_per_line: line_bytes,
            color_space,
            num_colors,
            duplex: sides != Sides::ONE_SIDED && !sides.is_empty(),
            tumble: sides == Sides::TWO_SIDED_SHORT_EDGE,
            num_copies: 1,
            total_page_count: 0,
        })
    }

    /// Bytes per pixel when treating sub-byte depths as one-byte units.
    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel as usize).div_ceil(8).max(1)
    }
}

/// Bytes needed for one scanline, `None` if that does not fit in a `u32`.
pub fn bytes_per_line(width: u32, bits_per_pixel: u32) -> Option<u32> {
    u32::try_from((u64::from(width) * u64::from(bits_per_pixel)).div_ceil(8)).ok()
}

/// Map a PWG raster type keyword to color space and bits per color.
pub fn parse_raster_type(raster_type: &str) -> Result<(ColorSpace, u32)> {
    let (space, bits) = raster_type
        .rsplit_once('_')
        .ok_or_else(|| DruckwerkError::Raster(format!("bad raster type '{raster_type}'")))?;
    let bits: u32 = bits
        .parse()
        .map_err(|_| DruckwerkError::Raster(format!("bad raster depth in '{raster_type}'")))?;

    let color_space = match space {
        "black" => ColorSpace::Black,
        "sgray" => ColorSpace::SGray,
        "srgb" => ColorSpace::SRgb,
        "rgb" => ColorSpace::Rgb,
        "adobe-rgb" => ColorSpace::AdobeRgb,
        "cmyk" => ColorSpace::Cmyk,
        _ => {
            return Err(DruckwerkError::Raster(format!(
                "unknown raster color space '{space}'"
            )));
        }
    };

    match (color_space, bits) {
        (ColorSpace::Black, 1 | 8 | 16) => {}
        (_, 8 | 16) => {}
        _ => {
            return Err(DruckwerkError::Raster(format!(
                "unsupported depth {bits} for '{raster_type}'"
            )));
        }
    }

    Ok((color_space, bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter() -> MediaCol {
        MediaCol::from_size_name("na_letter_8.5x11in", 635).expect("letter")
    }

    #[test]
    fn black_1_letter_at_300dpi() {
        let header = PageHeader::for_media(&letter(), "black_1", 300, 300, Sides::ONE_SIDED)
            .expect("header");
        assert_eq!(header.width, 2550);
        assert_eq!(header.height, 3300);
        assert_eq!(header.bits_per_pixel, 1);
        assert_eq!(header.bytes_per_line, 319);
        assert_eq!(header.page_size, (612, 792));
        assert_eq!(header.color_space, ColorSpace::Black);
        assert!(!header.duplex);
    }

    #[test]
    fn srgb_8_uses_three_bytes_per_pixel() {
        let header = PageHeader::for_media(&letter(), "srgb_8", 100, 100, Sides::TWO_SIDED_SHORT_EDGE)
            .expect("header");
        assert_eq!(header.bits_per_pixel, 24);
        assert_eq!(header.bytes_per_line, 850 * 3);
        assert_eq!(header.bytes_per_pixel(), 3);
        assert!(header.duplex);
        assert!(header.tumble);
    }

    #[test]
    fn rejects_unknown_types_and_empty_media() {
        assert!(parse_raster_type("sgray_1").is_err());
        assert!(parse_raster_type("purple_8").is_err());
        assert!(PageHeader::for_media(&MediaCol::default(), "black_1", 300, 300, Sides::ONE_SIDED).is_err());
    }

    #[test]
    fn line_length_overflow_is_reported() {
        assert_eq!(bytes_per_line(2550, 1), Some(319));
        assert_eq!(bytes_per_line(u32::MAX, 64), None);
        assert_eq!(bytes_per_line(u32::MAX, 8), Some(u32::MAX));
    }

    #[test]
    fn blank_byte_depends_on_additive_or_subtractive_space() {
        assert_eq!(ColorSpace::Black.blank_byte(), 0x00);
        assert_eq!(ColorSpace::SGray.blank_byte(), 0xFF);
        assert_eq!(ColorSpace::SRgb.blank_byte(), 0xFF);
    }
}
