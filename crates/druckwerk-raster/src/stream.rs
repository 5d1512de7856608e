// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PWG raster and Apple raster (URF) stream codec.
//
// Both formats share the same line compression:
//
// ```text
// line-repeat:  1 byte   (number of extra copies of this line)
// runs:         until the line is full
//   0..=127     repeat the next pixel (n + 1) times
//   128         fill the rest of the line with blank
//   129..=255   (257 - n) literal pixels follow
// ```
//
// A "pixel" is `ceil(bits_per_pixel / 8)` bytes, so 1-bit rasters compress
// whole bytes.  PWG pages start with a 1796-byte big-endian header; URF
// pages with a 32-byte header.

use std::io::{Read, Write};

use druckwerk_core::error::{DruckwerkError, Result};
use tracing::{debug, trace};

use crate::header::{ColorSpace, PageHeader, bytes_per_line};

/// PWG raster sync word.
pub const PWG_SYNC: &[u8; 4] = b"RaS2";

/// URF file signature.
pub const URF_SYNC: &[u8; 8] = b"UNIRAST\0";

/// Size of a PWG page header.
const PWG_HEADER_LEN: usize = 1796;

/// Size of a URF page header.
const URF_HEADER_LEN: usize = 32;

// Byte offsets of the PWG header fields we read or write.
const OFF_MEDIA_TYPE: usize = 128;
const OFF_DUPLEX: usize = 272;
const OFF_HW_RESOLUTION: usize = 276;
const OFF_NUM_COPIES: usize = 340;
const OFF_PAGE_SIZE: usize = 352;
const OFF_TUMBLE: usize = 368;
const OFF_WIDTH: usize = 372;
const OFF_HEIGHT: usize = 376;
const OFF_BITS_PER_COLOR: usize = 384;
const OFF_BITS_PER_PIXEL: usize = 388;
const OFF_BYTES_PER_LINE: usize = 392;
const OFF_COLOR_SPACE: usize = 400;
const OFF_NUM_COLORS: usize = 420;
const OFF_TOTAL_PAGE_COUNT: usize = 452;
const OFF_PAGE_SIZE_NAME: usize = 1732;

/// Largest page dimension accepted from a stream, in pixels.
const MAX_DIMENSION: u32 = 1 << 18;

/// Deepest pixel a CUPS raster header can describe (15 colors x 16 bits).
const MAX_BITS_PER_PIXEL: u32 = 240;

/// Stream flavour, detected from the leading sync bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Pwg,
    Urf,
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Streaming reader yielding page headers and decompressed scanlines.
pub struct RasterReader<R: Read> {
    inner: R,
    kind: StreamKind,
    /// Pages declared by a URF file header.
    urf_pages: u32,
    pages_read: u32,
    header: Option<PageHeader>,
    /// Decoded copy of the current line.
    line: Vec<u8>,
    /// Remaining repeats of `line` before the next compressed record.
    repeats: u32,
    /// Lines left to deliver in the current page.
    lines_left: u32,
}

impl<R: Read> RasterReader<R> {
    /// Open a stream and detect its flavour.
    pub fn new(mut inner: R) -> Result<Self> {
        let mut sync = [0u8; 4];
        read_exact_or(&mut inner, &mut sync, "stream sync word")?;

        let (kind, urf_pages) = if &sync == PWG_SYNC {
            (StreamKind::Pwg, 0)
        } else if sync == URF_SYNC[..4] {
            let mut rest = [0u8; 8];
            read_exact_or(&mut inner, &mut rest, "URF file header")?;
            if rest[..4] != URF_SYNC[4..] {
                return Err(DruckwerkError::Raster("bad URF signature".into()));
            }
            (StreamKind::Urf, be_u32(&rest, 4))
        } else {
            return Err(DruckwerkError::Raster(format!(
                "unrecognised raster sync word {sync:02x?}"
            )));
        };

        debug!(?kind, urf_pages, "raster stream opened");
        Ok(Self {
            inner,
            kind,
            urf_pages,
            pages_read: 0,
            header: None,
            line: Vec::new(),
            repeats: 0,
            lines_left: 0,
        })
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Header of the current page.
    pub fn header(&self) -> Option<&PageHeader> {
        self.header.as_ref()
    }

    /// Advance to the next page, skipping any unread lines of the current
    /// one.  Returns `Ok(None)` at a clean end of stream.
    pub fn next_page(&mut self) -> Result<Option<PageHeader>> {
        if self.header.is_some() {
            let mut scratch = vec![0u8; self.line.len()];
            while self.lines_left > 0 {
                if !self.read_line(&mut scratch)? {
                    break;
                }
            }
        }

        let header = match self.kind {
            StreamKind::Pwg => self.read_pwg_header()?,
            StreamKind::Urf => self.read_urf_header()?,
        };
        let Some(header) = header else {
            self.header = None;
            return Ok(None);
        };

        if header.width == 0
            || header.height == 0
            || header.width > MAX_DIMENSION
            || header.height > MAX_DIMENSION
            || header.bits_per_pixel == 0
            || header.bits_per_pixel > MAX_BITS_PER_PIXEL
        {
            return Err(DruckwerkError::Raster(format!(
                "bad page dimensions {}x{}x{}",
                header.width, header.height, header.bits_per_pixel
            )));
        }
        if Some(header.bytes_per_line) != bytes_per_line(header.width, header.bits_per_pixel) {
            return Err(DruckwerkError::Raster(format!(
                "bytes per line {} does not match {}x{}",
                header.bytes_per_line, header.width, header.bits_per_pixel
            )));
        }

        self.pages_read += 1;
        self.line = vec![0u8; header.bytes_per_line as usize];
        self.repeats = 0;
        self.lines_left = header.height;
        debug!(
            page = self.pages_read,
            width = header.width,
            height = header.height,
            bpp = header.bits_per_pixel,
            "raster page header read"
        );
        self.header = Some(header.clone());
        Ok(Some(header))
    }

    /// Read the next scanline of the current page into `buf`.
    ///
    /// Returns `Ok(false)` when the page is exhausted or the stream ends
    /// early; callers compare the line count against the header height to
    /// detect a short page.
    pub fn read_line(&mut self, buf: &mut [u8]) -> Result<bool> {
        let Some(header) = self.header.as_ref() else {
            return Ok(false);
        };
        if self.lines_left == 0 {
            return Ok(false);
        }
        let bpl = header.bytes_per_line as usize;
        if buf.len() < bpl {
            return Err(DruckwerkError::Raster(format!(
                "line buffer of {} bytes is smaller than {bpl}",
                buf.len()
            )));
        }

        if self.repeats == 0 {
            let pixel = header.bytes_per_pixel();
            let blank = header.color_space.blank_byte();
            match decode_line(&mut self.inner, &mut self.line, pixel, blank) {
                Ok(Some(repeat)) => self.repeats = repeat + 1,
                Ok(None) => {
                    trace!(lines_left = self.lines_left, "raster stream ended early");
                    self.lines_left = 0;
                    return Ok(false);
                }
                Err(e) => return Err(e),
            }
        }

        buf[..bpl].copy_from_slice(&self.line);
        self.repeats -= 1;
        self.lines_left -= 1;
        Ok(true)
    }

    fn read_pwg_header(&mut self) -> Result<Option<PageHeader>> {
        let mut raw = vec![0u8; PWG_HEADER_LEN];
        if !read_full(&mut self.inner, &mut raw)? {
            return Ok(None);
        }

        let color_space = ColorSpace::from_cups_value(be_u32(&raw, OFF_COLOR_SPACE)).ok_or_else(
            || DruckwerkError::Raster(format!("unsupported color space {}", be_u32(&raw, OFF_COLOR_SPACE))),
        )?;

        Ok(Some(PageHeader {
            page_size_name: c_string(&raw[OFF_PAGE_SIZE_NAME..OFF_PAGE_SIZE_NAME + 64]),
            media_type: c_string(&raw[OFF_MEDIA_TYPE..OFF_MEDIA_TYPE + 64]),
            page_size: (be_u32(&raw, OFF_PAGE_SIZE), be_u32(&raw, OFF_PAGE_SIZE + 4)),
            resolution: (
                be_u32(&raw, OFF_HW_RESOLUTION),
                be_u32(&raw, OFF_HW_RESOLUTION + 4),
            ),
            width: be_u32(&raw, OFF_WIDTH),
            height: be_u32(&raw, OFF_HEIGHT),
            bits_per_color: be_u32(&raw, OFF_BITS_PER_COLOR),
            bits_per_pixel: be_u32(&raw, OFF_BITS_PER_PIXEL),
            bytes_per_line: be_u32(&raw, OFF_BYTES_PER_LINE),
            color_space,
            num_colors: be_u32(&raw, OFF_NUM_COLORS),
            duplex: be_u32(&raw, OFF_DUPLEX) != 0,
            tumble: be_u32(&raw, OFF_TUMBLE) != 0,
            num_copies: be_u32(&raw, OFF_NUM_COPIES),
            total_page_count: be_u32(&raw, OFF_TOTAL_PAGE_COUNT),
        }))
    }

    fn read_urf_header(&mut self) -> Result<Option<PageHeader>> {
        if self.urf_pages > 0 && self.pages_read >= self.urf_pages {
            return Ok(None);
        }
        let mut raw = [0u8; URF_HEADER_LEN];
        if !read_full(&mut self.inner, &mut raw)? {
            return Ok(None);
        }

        let bits_per_pixel = u32::from(raw[0]);
        let color_space = match raw[1] {
            0 => ColorSpace::SGray,
            1 => ColorSpace::SRgb,
            3 => ColorSpace::AdobeRgb,
            4 => ColorSpace::Gray,
            5 => ColorSpace::Rgb,
            6 => ColorSpace::Cmyk,
            other => {
                return Err(DruckwerkError::Raster(format!("unsupported URF color space {other}")));
            }
        };
        let num_colors = color_space.num_colors();
        let width = be_u32(&raw, 12);
        let height = be_u32(&raw, 16);
        let dpi = be_u32(&raw, 20);

        Ok(Some(PageHeader {
            page_size_name: String::new(),
            media_type: String::new(),
            page_size: (points(width, dpi), points(height, dpi)),
            resolution: (dpi, dpi),
            width,
            height,
            bits_per_color: bits_per_pixel / num_colors.max(1),
            bits_per_pixel,
            // Checked against the dimensions in `next_page`.
            bytes_per_line: bytes_per_line(width, bits_per_pixel).unwrap_or(0),
            color_space,
            num_colors,
            duplex: raw[2] > 1,
            tumble: raw[2] == 3,
            num_copies: 1,
            total_page_count: self.urf_pages,
        }))
    }
}

/// Convert a pixel count at `dpi` to points, saturating on absurd sizes.
fn points(pixels: u32, dpi: u32) -> u32 {
    if dpi == 0 {
        return 0;
    }
    u32::try_from(u64::from(pixels) * 72 / u64::from(dpi)).unwrap_or(u32::MAX)
}

/// Decode one compressed line record into `line`.
///
/// Returns the line repeat count, or `None` if the stream ended before the
/// record started or part-way through it.
fn decode_line<R: Read>(
    reader: &mut R,
    line: &mut [u8],
    pixel: usize,
    blank: u8,
) -> Result<Option<u32>> {
    let mut byte = [0u8; 1];
    if !read_full(reader, &mut byte)? {
        return Ok(None);
    }
    let repeat = u32::from(byte[0]);

    let mut pos = 0;
    let mut px = vec![0u8; pixel];
    while pos < line.len() {
        if !read_full(reader, &mut byte)? {
            return Ok(None);
        }
        match byte[0] {
            128 => {
                line[pos..].fill(blank);
                pos = line.len();
            }
            n if n < 128 => {
                if !read_full(reader, &mut px)? {
                    return Ok(None);
                }
                for _ in 0..=n {
                    let end = (pos + pixel).min(line.len());
                    line[pos..end].copy_from_slice(&px[..end - pos]);
                    pos = end;
                    if pos >= line.len() {
                        break;
                    }
                }
            }
            n => {
                let count = (257 - usize::from(n)) * pixel;
                let end = (pos + count).min(line.len());
                if !read_full(reader, &mut line[pos..end])? {
                    return Ok(None);
                }
                // Literal runs that overshoot the line are consumed and dropped.
                let mut overflow = vec![0u8; pos + count - end];
                if !overflow.is_empty() && !read_full(reader, &mut overflow)? {
                    return Ok(None);
                }
                pos = end;
            }
        }
    }

    Ok(Some(repeat))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// PWG raster stream writer with line compression.
pub struct RasterWriter<W: Write> {
    inner: W,
    header: Option<PageHeader>,
    lines_written: u32,
}

impl<W: Write> RasterWriter<W> {
    /// Start a PWG stream by writing the sync word.
    pub fn new(mut inner: W) -> Result<Self> {
        inner.write_all(PWG_SYNC)?;
        Ok(Self {
            inner,
            header: None,
            lines_written: 0,
        })
    }

    /// Begin a new page.
    pub fn start_page(&mut self, header: &PageHeader) -> Result<()> {
        self.finish_page()?;
        self.inner.write_all(&encode_pwg_header(header))?;
        self.header = Some(header.clone());
        self.lines_written = 0;
        Ok(())
    }

    /// Compress and write one scanline.
    pub fn write_line(&mut self, line: &[u8]) -> Result<()> {
        let Some(header) = self.header.as_ref() else {
            return Err(DruckwerkError::Raster("write_line before start_page".into()));
        };
        if line.len() != header.bytes_per_line as usize {
            return Err(DruckwerkError::Raster(format!(
                "line has {} bytes, header says {}",
                line.len(),
                header.bytes_per_line
            )));
        }
        if self.lines_written >= header.height {
            return Err(DruckwerkError::Raster("too many lines for page".into()));
        }
        let encoded = encode_line(line, header.bytes_per_pixel());
        self.inner.write_all(&encoded)?;
        self.lines_written += 1;
        Ok(())
    }

    /// Pad the current page with blank lines up to its declared height.
    fn finish_page(&mut self) -> Result<()> {
        if let Some(header) = self.header.take() {
            let blank = vec![header.color_space.blank_byte(); header.bytes_per_line as usize];
            let encoded = encode_line(&blank, header.bytes_per_pixel());
            for _ in self.lines_written..header.height {
                self.inner.write_all(&encoded)?;
            }
        }
        Ok(())
    }

    /// Finish the stream and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.finish_page()?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Encode one line with a zero repeat count.
pub fn encode_line(line: &[u8], pixel: usize) -> Vec<u8> {
    let pixel = pixel.max(1);
    let pixels: Vec<&[u8]> = line.chunks(pixel).collect();
    let mut out = Vec::with_capacity(line.len() + line.len() / 64 + 2);
    out.push(0);

    let mut i = 0;
    while i < pixels.len() {
        // Count identical neighbours.
        let mut run = 1;
        while i + run < pixels.len() && run < 128 && pixels[i + run] == pixels[i] {
            run += 1;
        }
        if run > 1 {
            out.push((run - 1) as u8);
            out.extend_from_slice(pixels[i]);
            i += run;
            continue;
        }

        // Literal run until the next repeat or 128 pixels.
        let start = i;
        while i < pixels.len()
            && i - start < 128
            && !(i + 1 < pixels.len() && pixels[i + 1] == pixels[i])
        {
            i += 1;
        }
        if i == start {
            i += 1;
        }
        let count = i - start;
        if count == 1 {
            out.push(0);
        } else {
            out.push((257 - count) as u8);
        }
        for p in &pixels[start..i] {
            out.extend_from_slice(p);
        }
    }
    out
}

fn encode_pwg_header(header: &PageHeader) -> Vec<u8> {
    let mut raw = vec![0u8; PWG_HEADER_LEN];
    put_c_string(&mut raw[0..64], "PwgRaster");
    put_c_string(&mut raw[OFF_MEDIA_TYPE..OFF_MEDIA_TYPE + 64], &header.media_type);
    put_be_u32(&mut raw, OFF_DUPLEX, u32::from(header.duplex));
    put_be_u32(&mut raw, OFF_HW_RESOLUTION, header.resolution.0);
    put_be_u32(&mut raw, OFF_HW_RESOLUTION + 4, header.resolution.1);
    put_be_u32(&mut raw, OFF_NUM_COPIES, header.num_copies);
    put_be_u32(&mut raw, OFF_PAGE_SIZE, header.page_size.0);
    put_be_u32(&mut raw, OFF_PAGE_SIZE + 4, header.page_size.1);
    put_be_u32(&mut raw, OFF_TUMBLE, u32::from(header.tumble));
    put_be_u32(&mut raw, OFF_WIDTH, header.width);
    put_be_u32(&mut raw, OFF_HEIGHT, header.height);
    put_be_u32(&mut raw, OFF_BITS_PER_COLOR, header.bits_per_color);
    put_be_u32(&mut raw, OFF_BITS_PER_PIXEL, header.bits_per_pixel);
    put_be_u32(&mut raw, OFF_BYTES_PER_LINE, header.bytes_per_line);
    put_be_u32(&mut raw, OFF_COLOR_SPACE, header.color_space.cups_value());
    put_be_u32(&mut raw, OFF_NUM_COLORS, header.num_colors);
    put_be_u32(&mut raw, OFF_TOTAL_PAGE_COUNT, header.total_page_count);
    put_c_string(
        &mut raw[OFF_PAGE_SIZE_NAME..OFF_PAGE_SIZE_NAME + 64],
        &header.page_size_name,
    );
    raw
}

// ---------------------------------------------------------------------------
// Byte helpers
// ---------------------------------------------------------------------------

fn be_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn put_be_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

fn c_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn put_c_string(buf: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(buf.len() - 1);
    buf[..len].copy_from_slice(&bytes[..len]);
}

/// Fill `buf` completely.  Returns `Ok(false)` on EOF before the first byte
/// or part-way through.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

fn read_exact_or<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    if read_full(reader, buf)? {
        Ok(())
    } else {
        Err(DruckwerkError::Raster(format!("truncated {what}")))
    }
}

#[cfg(test)]
mod tests {
    use druckwerk_core::media::MediaCol;
    use druckwerk_core::types::Sides;

    use super::*;

    fn small_header(raster_type: &str, lines: u32) -> PageHeader {
        let media = MediaCol {
            size_name: "custom_small".into(),
            size_width: 2540,
            size_length: 2540,
            ..Default::default()
        };
        let mut header =
            PageHeader::for_media(&media, raster_type, 40, lines, Sides::ONE_SIDED).expect("header");
        header.total_page_count = 1;
        header
    }

    #[test]
    fn encode_line_uses_repeat_and_literal_runs() {
        let line = [0u8, 0, 0, 0, 1, 2, 3];
        let encoded = encode_line(&line, 1);
        // repeat byte, 4x zero, 3 literals
        assert_eq!(encoded, vec![0, 3, 0, 254, 1, 2, 3]);
    }

    #[test]
    fn written_stream_reads_back_line_for_line() {
        let header = small_header("sgray_8", 6);
        let mut writer = RasterWriter::new(Vec::new()).expect("writer");
        writer.start_page(&header).expect("start page");

        let lines: Vec<Vec<u8>> = (0..6u8)
            .map(|y| (0..40u8).map(|x| if x < 10 { 255 } else { x.wrapping_mul(y) }).collect())
            .collect();
        for line in &lines {
            writer.write_line(line).expect("write line");
        }
        let bytes = writer.finish().expect("finish");

        let mut reader = RasterReader::new(bytes.as_slice()).expect("reader");
        assert_eq!(reader.kind(), StreamKind::Pwg);
        let page = reader.next_page().expect("page").expect("one page");
        assert_eq!(page.width, 40);
        assert_eq!(page.height, 6);
        assert_eq!(page.total_page_count, 1);
        assert_eq!(page.page_size_name, "custom_small");

        let mut buf = vec![0u8; page.bytes_per_line as usize];
        for expected in &lines {
            assert!(reader.read_line(&mut buf).expect("line"));
            assert_eq!(&buf, expected);
        }
        assert!(!reader.read_line(&mut buf).expect("end of page"));
        assert!(reader.next_page().expect("eof").is_none());
    }

    #[test]
    fn short_stream_stops_early() {
        let header = small_header("black_1", 10);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(PWG_SYNC);
        bytes.extend_from_slice(&encode_pwg_header(&header));
        for _ in 0..4 {
            bytes.extend_from_slice(&encode_line(&vec![0xAA; header.bytes_per_line as usize], 1));
        }

        let mut reader = RasterReader::new(bytes.as_slice()).expect("reader");
        reader.next_page().expect("page").expect("one page");
        let mut buf = vec![0u8; header.bytes_per_line as usize];
        let mut count = 0;
        while reader.read_line(&mut buf).expect("line") {
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn line_repeat_and_fill_are_decoded() {
        let header = small_header("sgray_8", 3);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(PWG_SYNC);
        bytes.extend_from_slice(&encode_pwg_header(&header));
        // One record repeated three times: two black pixels, then fill blank.
        bytes.extend_from_slice(&[2, 1, 0x00, 128]);

        let mut reader = RasterReader::new(bytes.as_slice()).expect("reader");
        reader.next_page().expect("page").expect("one page");
        let mut buf = vec![0u8; 40];
        for _ in 0..3 {
            assert!(reader.read_line(&mut buf).expect("line"));
            assert_eq!(&buf[..2], &[0, 0]);
            assert!(buf[2..].iter().all(|b| *b == 0xFF));
        }
    }

    #[test]
    fn urf_stream_is_detected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(URF_SYNC);
        bytes.extend_from_slice(&1u32.to_be_bytes());
        let mut page = [0u8; URF_HEADER_LEN];
        page[0] = 8;
        page[1] = 0;
        page[12..16].copy_from_slice(&4u32.to_be_bytes());
        page[16..20].copy_from_slice(&2u32.to_be_bytes());
        page[20..24].copy_from_slice(&300u32.to_be_bytes());
        bytes.extend_from_slice(&page);
        bytes.extend_from_slice(&[1, 3, 0x40]);

        let mut reader = RasterReader::new(bytes.as_slice()).expect("reader");
        assert_eq!(reader.kind(), StreamKind::Urf);
        let header = reader.next_page().expect("page").expect("one page");
        assert_eq!(header.width, 4);
        assert_eq!(header.resolution, (300, 300));
        assert_eq!(header.color_space, ColorSpace::SGray);

        let mut buf = [0u8; 4];
        assert!(reader.read_line(&mut buf).expect("line 0"));
        assert!(reader.read_line(&mut buf).expect("line 1"));
        assert_eq!(buf, [0x40; 4]);
        assert!(reader.next_page().expect("eof").is_none());
    }

    fn urf_page(width: u32, height: u32, bits_per_pixel: u8, dpi: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(URF_SYNC);
        bytes.extend_from_slice(&1u32.to_be_bytes());
        let mut page = [0u8; URF_HEADER_LEN];
        page[0] = bits_per_pixel;
        page[12..16].copy_from_slice(&width.to_be_bytes());
        page[16..20].copy_from_slice(&height.to_be_bytes());
        page[20..24].copy_from_slice(&dpi.to_be_bytes());
        bytes.extend_from_slice(&page);
        bytes
    }

    #[test]
    fn oversized_urf_page_is_an_error() {
        let bytes = urf_page(0x1000_0000, 10, 8, 300);
        let mut reader = RasterReader::new(bytes.as_slice()).expect("reader");
        assert!(matches!(reader.next_page(), Err(DruckwerkError::Raster(_))));

        let bytes = urf_page(u32::MAX, u32::MAX, 8, 1);
        let mut reader = RasterReader::new(bytes.as_slice()).expect("reader");
        assert!(reader.next_page().is_err());
    }

    #[test]
    fn urf_page_size_is_in_points() {
        let bytes = urf_page(600, 300, 8, 300);
        let mut reader = RasterReader::new(bytes.as_slice()).expect("reader");
        let header = reader.next_page().expect("page").expect("one page");
        assert_eq!(header.page_size, (144, 72));
        assert_eq!(points(u32::MAX, 1), u32::MAX);
        assert_eq!(points(100, 0), 0);
    }

    #[test]
    fn hostile_pwg_depth_is_rejected() {
        // 4096 bits per pixel makes the line length consistent but huge.
        let mut header = small_header("sgray_8", 2);
        header.width = 1 << 18;
        header.bits_per_pixel = 4096;
        header.bytes_per_line = bytes_per_line(header.width, header.bits_per_pixel).expect("fits");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(PWG_SYNC);
        bytes.extend_from_slice(&encode_pwg_header(&header));

        let mut reader = RasterReader::new(bytes.as_slice()).expect("reader");
        let err = reader.next_page().expect_err("depth over the CUPS maximum");
        assert!(err.to_string().contains("4096"), "{err}");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(RasterReader::new(&b"%PDF-1.7"[..]).is_err());
        assert!(RasterReader::new(&b"Ra"[..]).is_err());
    }
}
