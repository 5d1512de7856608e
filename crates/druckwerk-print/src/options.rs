// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Option resolution.
//
// Every job option is looked up in three tiers: the job's own attribute,
// then the printer's `{name}-default`, then the driver's `{name}-default`.
// A tier only matches when its value has the expected type, so a malformed
// value falls through to the next tier instead of failing the job.

use druckwerk_core::attributes::AttributeSet;
use druckwerk_core::driver_data::DriverData;
use druckwerk_core::media::{MediaCol, size_from_name};
use druckwerk_core::types::{ColorMode, ContentOptimize, Orientation, Quality, Scaling, Sides};
use druckwerk_raster::dither::DitherMatrix;
use druckwerk_raster::header::PageHeader;
use tracing::{debug, instrument, warn};

/// Raster type of pipeline output.
pub const OUTPUT_RASTER_TYPE: &str = "black_1";

/// Resolution used when a driver declares none.
pub const FALLBACK_RESOLUTION: (i32, i32) = (300, 300);

/// Fully resolved options for one job execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    pub num_pages: u32,
    pub copies: u32,
    pub media: MediaCol,
    pub orientation: Orientation,
    pub color_mode: ColorMode,
    pub content_optimize: ContentOptimize,
    pub darkness: i32,
    pub quality: Quality,
    pub scaling: Scaling,
    pub speed: i32,
    /// Resolution in dots per inch.
    pub resolution: (i32, i32),
    pub sides: Sides,
    /// Output bin keyword, empty if the driver has no bins.
    pub output_bin: String,
    /// Resolved vendor attributes, keyed by their job attribute name.
    pub vendor: AttributeSet,
    /// Page header for rasterized output.  Raster documents replace it with
    /// each page's own header.
    pub header: PageHeader,
}

impl PrintOptions {
    /// Dither matrix for the resolved color mode and content hint.
    pub fn dither(&self) -> &'static DitherMatrix {
        DitherMatrix::for_content(self.color_mode, self.content_optimize)
    }
}

/// Attribute tiers searched by [`resolve`].
#[derive(Clone, Copy)]
pub struct Tiers<'a> {
    pub job: &'a AttributeSet,
    pub printer: &'a AttributeSet,
    pub driver: &'a AttributeSet,
}

impl<'a> Tiers<'a> {
    /// First tier where `get` yields a value.
    pub fn find<T>(&self, name: &str, get: impl Fn(&'a AttributeSet, &str) -> Option<T>) -> Option<T> {
        if let Some(value) = get(self.job, name) {
            return Some(value);
        }
        let default_name = format!("{name}-default");
        get(self.printer, &default_name).or_else(|| get(self.driver, &default_name))
    }

    pub fn integer(&self, name: &str) -> Option<i32> {
        self.find(name, |attrs, n| attrs.integer(n))
    }

    pub fn string(&self, name: &str) -> Option<&'a str> {
        self.find(name, |attrs, n| attrs.string(n))
    }
}

/// Resolve the options for a job.
#[instrument(skip_all, fields(num_pages = num_pages))]
pub fn resolve(tiers: Tiers<'_>, data: &DriverData, num_pages: u32) -> PrintOptions {
    let copies = tiers
        .integer("copies")
        .filter(|c| *c > 0)
        .map_or(1, |c| c as u32);

    let media = resolve_media(tiers, data);

    let orientation = tiers
        .integer("orientation-requested")
        .and_then(Orientation::from_ipp_enum)
        .unwrap_or(Orientation::None);

    let color_mode = tiers
        .string("print-color-mode")
        .and_then(ColorMode::from_keyword)
        .unwrap_or(ColorMode::BI_LEVEL);

    let content_optimize = tiers
        .string("print-content-optimize")
        .and_then(ContentOptimize::from_keyword)
        .unwrap_or(ContentOptimize::AUTO);

    let darkness = tiers.integer("print-darkness").unwrap_or(data.darkness_default);

    let quality = tiers
        .integer("print-quality")
        .and_then(Quality::from_ipp_enum)
        .unwrap_or(Quality::Normal);

    let scaling = tiers
        .string("print-scaling")
        .and_then(Scaling::from_keyword)
        .unwrap_or(data.scaling_default);

    let speed = tiers.integer("print-speed").unwrap_or(data.speed_default);

    let resolution = tiers
        .find("printer-resolution", |attrs, n| attrs.resolution(n))
        .filter(|(x, y)| *x > 0 && *y > 0)
        .unwrap_or_else(|| resolution_for_quality(data, quality));

    let sides = tiers
        .string("sides")
        .and_then(Sides::from_keyword)
        .unwrap_or(data.sides_default);

    let output_bin = tiers
        .string("output-bin")
        .or_else(|| data.bin_default_keyword())
        .unwrap_or_default()
        .to_string();

    let mut vendor = AttributeSet::new();
    for name in &data.vendor {
        if let Some(attr) = tiers.find(name, |attrs, n| attrs.get(n)) {
            vendor.add_values(name, attr.values.clone());
        }
    }

    let header = page_header(&media, data, resolution, sides);

    let options = PrintOptions {
        num_pages,
        copies,
        media,
        orientation,
        color_mode,
        content_optimize,
        darkness,
        quality,
        scaling,
        speed,
        resolution,
        sides,
        output_bin,
        vendor,
        header,
    };
    log_options(&options);
    options
}

/// `media-col` wins over `media`; the source falls back to the ready media
/// whose size matches, then to the default media's source.
fn resolve_media(tiers: Tiers<'_>, data: &DriverData) -> MediaCol {
    let mut media = data.media_default.clone();

    if let Some(col) = tiers.find("media-col", |attrs, n| attrs.collection(n)) {
        media.source.clear();
        media.import(col);
    } else if let Some(name) = tiers.string("media") {
        match size_from_name(name) {
            Some((width, length)) => {
                media.size_name = name.to_string();
                media.size_width = width;
                media.size_length = length;
                media.source.clear();
            }
            None => warn!(media = name, "ignoring unknown media size"),
        }
    }

    if media.source.is_empty() {
        media.source = data
            .media_ready
            .iter()
            .zip(&data.sources)
            .find(|(ready, _)| ready.size_name == media.size_name)
            .map(|(_, source)| source.clone())
            .unwrap_or_else(|| data.media_default.source.clone());
    }
    media
}

/// Draft picks the lowest resolution, normal the middle one, high the
/// highest.
pub fn resolution_for_quality(data: &DriverData, quality: Quality) -> (i32, i32) {
    let list = &data.resolutions;
    if list.is_empty() {
        return if data.resolution_default.0 > 0 && data.resolution_default.1 > 0 {
            data.resolution_default
        } else {
            FALLBACK_RESOLUTION
        };
    }
    let index = match quality {
        Quality::Draft => 0,
        Quality::Normal => list.len() / 2,
        Quality::High => list.len() - 1,
    };
    list[index]
}

fn page_header(media: &MediaCol, data: &DriverData, resolution: (i32, i32), sides: Sides) -> PageHeader {
    let (x, y) = (resolution.0.max(1) as u32, resolution.1.max(1) as u32);
    PageHeader::for_media(media, OUTPUT_RASTER_TYPE, x, y, sides)
        .or_else(|err| {
            warn!(error = %err, size = %media.size_name, "falling back to default media for page header");
            PageHeader::for_media(&data.media_default, OUTPUT_RASTER_TYPE, x, y, sides)
        })
        .unwrap_or_default()
}

fn log_options(options: &PrintOptions) {
    let header = &options.header;
    debug!(
        width = header.width,
        height = header.height,
        bits_per_color = header.bits_per_color,
        bits_per_pixel = header.bits_per_pixel,
        bytes_per_line = header.bytes_per_line,
        color_space = ?header.color_space,
        num_colors = header.num_colors,
        hw_resolution = ?header.resolution,
        "page header"
    );
    debug!(num_pages = options.num_pages, copies = options.copies, "options");
    debug!(
        size = %options.media.size_name,
        width = options.media.size_width,
        length = options.media.size_length,
        bottom_margin = options.media.bottom_margin,
        left_margin = options.media.left_margin,
        right_margin = options.media.right_margin,
        top_margin = options.media.top_margin,
        top_offset = options.media.top_offset,
        source = %options.media.source,
        tracking = options.media.tracking.keyword().unwrap_or(""),
        media_type = %options.media.media_type,
        "media"
    );
    debug!(
        orientation = options.orientation.ipp_enum_value(),
        color_mode = options.color_mode.keyword().unwrap_or(""),
        content_optimize = options.content_optimize.keyword().unwrap_or(""),
        darkness = options.darkness,
        quality = options.quality.ipp_enum_value(),
        speed = options.speed,
        resolution = %format!("{}x{}dpi", options.resolution.0, options.resolution.1),
        sides = options.sides.keyword().unwrap_or(""),
        output_bin = %options.output_bin,
        "print options"
    );
}
