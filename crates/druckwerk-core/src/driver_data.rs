// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Driver capability descriptor.
//
// A driver fills in one `DriverData` when a printer is created.  Everything
// protocol-visible about the printer's capabilities is synthesized from it;
// none of it is edited by hand afterwards.

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeSet;
use crate::media::MediaCol;
use crate::presets::Preset;
use crate::types::{
    ColorMode, ContentOptimize, Duplex, Finishings, IdentifyActions, LabelMode, MediaTracking,
    Orientation, Quality, RasterType, Scaling, Sides,
};

/// Capability descriptor supplied by a printer driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverData {
    /// "printer-make-and-model" value.
    pub make_and_model: String,
    /// Native raw format accepted by the driver's `print` callback, if any.
    pub format: Option<String>,
    /// Pages per minute (monochrome).
    pub ppm: i32,
    /// Pages per minute (color), 0 for monochrome printers.
    pub ppm_color: i32,

    // -- Resolutions --
    /// Supported resolutions in dots per inch, lowest first.
    pub resolutions: Vec<(i32, i32)>,
    /// Default resolution.
    pub resolution_default: (i32, i32),
    pub raster_types: RasterType,

    // -- Print options --
    pub color_supported: ColorMode,
    pub color_default: ColorMode,
    pub content_default: ContentOptimize,
    pub orientation_default: Orientation,
    pub quality_default: Quality,
    pub scaling_default: Scaling,
    pub sides_supported: Sides,
    pub sides_default: Sides,
    pub duplex: Duplex,
    pub finishings: Finishings,

    // -- Identification --
    pub identify_default: IdentifyActions,
    pub identify_supported: IdentifyActions,

    // -- Labels --
    pub mode_configured: LabelMode,
    pub mode_supported: LabelMode,
    pub tear_offset_configured: i32,
    /// Supported tear-off offset range (lower, upper); (0, 0) if unsupported.
    pub tear_offset_supported: (i32, i32),

    // -- Darkness and speed --
    pub darkness_configured: i32,
    pub darkness_default: i32,
    /// Number of distinct darkness levels (0 = not supported).
    pub darkness_supported: i32,
    pub speed_default: i32,
    /// Supported speed range in hundredths of mm/s; (0, 0) if unsupported.
    pub speed_supported: (i32, i32),

    // -- Media --
    pub borderless: bool,
    /// Bottom and top margin in hundredths of mm.
    pub bottom_top: i32,
    /// Left and right margin in hundredths of mm.
    pub left_right: i32,
    /// Supported media size names, including min/max pseudo-entries.
    pub media: Vec<String>,
    pub media_default: MediaCol,
    /// Media loaded in each source, parallel to `sources`.
    pub media_ready: Vec<MediaCol>,
    pub sources: Vec<String>,
    pub types: Vec<String>,
    pub left_offset_supported: (i32, i32),
    pub top_offset_supported: (i32, i32),
    pub tracking_supported: MediaTracking,

    // -- Output --
    pub bins: Vec<String>,
    pub bin_default: usize,
    pub input_face_up: bool,
    pub output_face_up: bool,
    pub has_supplies: bool,

    // -- Extensions --
    /// Names of vendor attributes accepted as job/default attributes.
    pub vendor: Vec<String>,
    /// Vendor capability attributes merged on top of the synthesized set.
    pub extra_attrs: AttributeSet,
    /// Presets declared by the driver.
    pub presets: Vec<Preset>,
}

impl Default for DriverData {
    fn default() -> Self {
        Self {
            make_and_model: String::new(),
            format: None,
            ppm: 1,
            ppm_color: 0,
            resolutions: Vec::new(),
            resolution_default: (0, 0),
            raster_types: RasterType::EMPTY,
            color_supported: ColorMode::AUTO | ColorMode::MONOCHROME,
            color_default: ColorMode::MONOCHROME,
            content_default: ContentOptimize::AUTO,
            orientation_default: Orientation::None,
            quality_default: Quality::Normal,
            scaling_default: Scaling::AUTO,
            sides_supported: Sides::ONE_SIDED,
            sides_default: Sides::ONE_SIDED,
            duplex: Duplex::None,
            finishings: Finishings::EMPTY,
            identify_default: IdentifyActions::EMPTY,
            identify_supported: IdentifyActions::EMPTY,
            mode_configured: LabelMode::EMPTY,
            mode_supported: LabelMode::EMPTY,
            tear_offset_configured: 0,
            tear_offset_supported: (0, 0),
            darkness_configured: 50,
            darkness_default: 0,
            darkness_supported: 0,
            speed_default: 0,
            speed_supported: (0, 0),
            borderless: false,
            bottom_top: 0,
            left_right: 0,
            media: Vec::new(),
            media_default: MediaCol::default(),
            media_ready: Vec::new(),
            sources: Vec::new(),
            types: Vec::new(),
            left_offset_supported: (0, 0),
            top_offset_supported: (0, 0),
            tracking_supported: MediaTracking::EMPTY,
            bins: Vec::new(),
            bin_default: 0,
            input_face_up: false,
            output_face_up: false,
            has_supplies: false,
            vendor: Vec::new(),
            extra_attrs: AttributeSet::new(),
            presets: Vec::new(),
        }
    }
}

impl DriverData {
    /// Default output bin keyword, if any bins are declared.
    pub fn bin_default_keyword(&self) -> Option<&str> {
        self.bins.get(self.bin_default).map(String::as_str)
    }
}
