// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Continuous-tone image rasterizer.
//
// Places a gray image on a 1-bit page: picks one of four traversals for the
// orientation, scales to fit the imageable area preserving aspect ratio,
// centres the result, and dithers each device line.  Source pixels are
// sampled with an integer error accumulator so the inner loop never touches
// floating point.

use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::media::{HMM_PER_INCH, MediaCol};
use druckwerk_core::types::Orientation;
use image::GrayImage;
use tracing::debug;

use crate::dither::DitherMatrix;
use crate::header::PageHeader;

/// Printable region of a page, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageableArea {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl ImageableArea {
    /// Page size minus media margins, converted from hundredths of a
    /// millimetre at the header resolution.
    pub fn compute(header: &PageHeader, media: &MediaCol) -> Result<Self> {
        let (xres, yres) = (u64::from(header.resolution.0), u64::from(header.resolution.1));
        let hmm = HMM_PER_INCH as u64;
        let margin = |v: i32| v.max(0) as u64;

        let left = margin(media.left_margin) * xres / hmm;
        let top = margin(media.top_margin) * yres / hmm;
        let horizontal = (margin(media.left_margin) + margin(media.right_margin)) * xres / hmm;
        let vertical = (margin(media.bottom_margin) + margin(media.top_margin)) * yres / hmm;

        let width = u64::from(header.width).saturating_sub(horizontal);
        let height = u64::from(header.height).saturating_sub(vertical);
        if width == 0 || height == 0 {
            return Err(DruckwerkError::Raster(format!(
                "invalid media size: no imageable area on {}x{} page",
                header.width, header.height
            )));
        }

        Ok(Self {
            left: left as u32,
            top: top as u32,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// Orientation to use when none was requested: landscape when a wide
/// image meets a tall page, portrait otherwise.
pub fn auto_orientation(image_width: u32, image_height: u32, page_width: u32, page_height: u32) -> Orientation {
    if image_width > image_height && page_width < page_height {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    }
}

/// Largest `(xsize, ysize)` with the source aspect ratio that fits in
/// `area_width` x `area_height`.  The constraining axis is filled exactly.
pub fn fit_to_area(area_width: u32, area_height: u32, source_width: u32, source_height: u32) -> (u32, u32) {
    let (aw, ah) = (u64::from(area_width), u64::from(area_height));
    let (sw, sh) = (u64::from(source_width.max(1)), u64::from(source_height.max(1)));

    let mut xsize = aw;
    let mut ysize = xsize * sh / sw;
    if ysize > ah {
        ysize = ah;
        xsize = ysize * sw / sh;
    }
    (xsize.max(1) as u32, ysize.max(1) as u32)
}

/// Geometry of an image on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Resolved orientation (never `None`).
    pub orientation: Orientation,
    /// Source dimensions after rotation.
    pub source_width: u32,
    pub source_height: u32,
    /// Scaled size on the page.
    pub xsize: u32,
    pub ysize: u32,
    pub xstart: u32,
    pub ystart: u32,
    /// Index of the first sampled pixel and the per-axis strides.
    base: i64,
    xdir: i64,
    ydir: i64,
}

impl Placement {
    pub fn new(image_width: u32, image_height: u32, area: &ImageableArea, page: &PageHeader, requested: Orientation) -> Self {
        let orientation = match requested {
            Orientation::None => auto_orientation(image_width, image_height, page.width, page.height),
            other => other,
        };

        let (w, h) = (i64::from(image_width), i64::from(image_height));
        let (base, xdir, ydir, source_width, source_height) = match orientation {
            Orientation::ReversePortrait => (w * h - 1, -1, -w, image_width, image_height),
            // 90 degrees counter-clockwise
            Orientation::Landscape => (w - 1, w, -1, image_height, image_width),
            // 90 degrees clockwise
            Orientation::ReverseLandscape => ((h - 1) * w, -w, 1, image_height, image_width),
            Orientation::Portrait | Orientation::None => (0, 1, w, image_width, image_height),
        };

        let (xsize, ysize) = fit_to_area(area.width, area.height, source_width, source_height);
        Self {
            orientation,
            source_width,
            source_height,
            xsize,
            ysize,
            xstart: area.left + (area.width - xsize) / 2,
            ystart: area.top + (area.height - ysize) / 2,
            base,
            xdir,
            ydir,
        }
    }

    pub fn xend(&self) -> u32 {
        self.xstart + self.xsize
    }

    pub fn yend(&self) -> u32 {
        self.ystart + self.ysize
    }
}

/// Produces dithered 1-bit device lines for one image.
pub struct ImageRasterizer<'a> {
    image: &'a GrayImage,
    placement: Placement,
    dither: &'a DitherMatrix,
    bytes_per_line: usize,
    height: u32,
}

impl<'a> ImageRasterizer<'a> {
    pub fn new(
        image: &'a GrayImage,
        header: &PageHeader,
        media: &MediaCol,
        orientation: Orientation,
        dither: &'a DitherMatrix,
    ) -> Result<Self> {
        if header.bits_per_pixel != 1 {
            return Err(DruckwerkError::Raster(format!(
                "image rasterizer needs a 1-bit page, got {} bits per pixel",
                header.bits_per_pixel
            )));
        }
        let area = ImageableArea::compute(header, media)?;
        let placement = Placement::new(image.width(), image.height(), &area, header, orientation);

        let xmod = placement.source_width % placement.xsize;
        debug!(
            ileft = area.left,
            itop = area.top,
            iwidth = area.width,
            iheight = area.height,
            "imageable area"
        );
        debug!(
            orientation = ?placement.orientation,
            xsize = placement.xsize,
            xstart = placement.xstart,
            xend = placement.xend(),
            xdir = placement.xdir,
            xmod,
            ysize = placement.ysize,
            ystart = placement.ystart,
            yend = placement.yend(),
            ydir = placement.ydir,
            "image placement"
        );

        Ok(Self {
            image,
            placement,
            dither,
            bytes_per_line: header.bytes_per_line as usize,
            height: header.height,
        })
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Number of device lines per page.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    /// Render device line `y` into `line`.  Lines outside the placed image
    /// are blank.
    pub fn render_line(&self, y: u32, line: &mut [u8]) {
        let n = self.bytes_per_line.min(line.len());
        let out = &mut line[..n];
        out.fill(0);

        let p = &self.placement;
        if y < p.ystart || y >= p.yend() {
            return;
        }

        let pixels = self.image.as_raw();
        let xsize = i64::from(p.xsize);
        let xmod = i64::from(p.source_width % p.xsize);
        let xstep = i64::from(p.source_width / p.xsize) * p.xdir;
        let row = u64::from(y - p.ystart) * u64::from(p.source_height) / u64::from(p.ysize);
        let mut pix = p.base + p.ydir * row as i64;
        let thresholds = self.dither.row(y);

        let mut x = p.xstart;
        let mut index = (x / 8) as usize;
        let mut bit: u8 = 128 >> (x & 7);
        let mut byte: u8 = 0;
        let mut xerr: i64 = 0;

        while x < p.xend() {
            let value = usize::try_from(pix)
                .ok()
                .and_then(|i| pixels.get(i))
                .copied()
                .unwrap_or(255);
            if value <= thresholds[(x & 15) as usize] {
                byte |= bit;
            }

            pix += xstep;
            xerr += xmod;
            if xerr >= xsize {
                xerr -= xsize;
                pix += p.xdir;
            }

            if bit == 1 {
                if let Some(slot) = out.get_mut(index) {
                    *slot = byte;
                }
                index += 1;
                byte = 0;
                bit = 128;
            } else {
                bit >>= 1;
            }
            x += 1;
        }

        if bit < 128 {
            if let Some(slot) = out.get_mut(index) {
                *slot = byte;
            }
        }
    }
}
