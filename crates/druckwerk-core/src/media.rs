// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Media model.
//
// All media dimensions are in hundredths of millimetres, as in IPP
// `media-col`.  Size names follow the PWG 5101.1 self-describing format
// `class_name_WxHunit`, so the dimensions of any well-formed name can be
// recovered without a lookup table.

use serde::{Deserialize, Serialize};

use crate::attributes::{AttrValue, AttributeSet};
use crate::types::MediaTracking;

/// Hundredths of a millimetre per inch.
pub const HMM_PER_INCH: i32 = 2540;

/// Well-known sizes, used to name a size that arrives without one.
const KNOWN_SIZES: &[(&str, i32, i32)] = &[
    ("iso_a3_297x420mm", 29700, 42000),
    ("iso_a4_210x297mm", 21000, 29700),
    ("iso_a5_148x210mm", 14800, 21000),
    ("iso_a6_105x148mm", 10500, 14800),
    ("na_letter_8.5x11in", 21590, 27940),
    ("na_legal_8.5x14in", 21590, 35560),
    ("na_index-4x6_4x6in", 10160, 15240),
    ("na_5x7_5x7in", 12700, 17780),
    ("oe_photo-l_3.5x5in", 8890, 12700),
];

/// Parse the trailing `WxHunit` component of a PWG self-describing name.
///
/// Returns `(width, length)` in hundredths of millimetres.
pub fn size_from_name(name: &str) -> Option<(i32, i32)> {
    let dims = name.rsplit('_').next()?;
    let (numbers, scale) = if let Some(n) = dims.strip_suffix("mm") {
        (n, 100.0)
    } else if let Some(n) = dims.strip_suffix("in") {
        (n, f64::from(HMM_PER_INCH))
    } else {
        return None;
    };

    let (w, h) = numbers.split_once('x')?;
    let w: f64 = w.parse().ok()?;
    let h: f64 = h.parse().ok()?;
    if w <= 0.0 || h <= 0.0 {
        return None;
    }

    Some(((w * scale).round() as i32, (h * scale).round() as i32))
}

/// Name a size given in hundredths of millimetres.
///
/// Known sizes get their PWG name; anything else gets a `custom_` name that
/// still round-trips through [`size_from_name`].
pub fn name_for_size(width: i32, length: i32) -> String {
    if let Some((name, _, _)) = KNOWN_SIZES
        .iter()
        .find(|(_, w, l)| (w - width).abs() <= 1 && (l - length).abs() <= 1)
    {
        return (*name).to_string();
    }

    let dims = format!("{}x{}mm", format_mm(width), format_mm(length));
    format!("custom_{dims}_{dims}")
}

fn format_mm(hmm: i32) -> String {
    if hmm % 100 == 0 {
        format!("{}", hmm / 100)
    } else {
        let text = format!("{:.2}", f64::from(hmm) / 100.0);
        text.trim_end_matches('0').to_string()
    }
}

/// Whether a name is a min/max pseudo-entry for custom or roll media.
pub fn is_range_name(name: &str) -> bool {
    ["custom_min_", "custom_max_", "roll_min_", "roll_max_"]
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// A resolved media collection (`media-col`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCol {
    /// PWG size name (e.g. "iso_a4_210x297mm").
    pub size_name: String,
    pub size_width: i32,
    pub size_length: i32,
    pub bottom_margin: i32,
    pub left_margin: i32,
    pub right_margin: i32,
    pub top_margin: i32,
    /// Horizontal offset for labels.
    pub left_offset: i32,
    /// Vertical offset for labels.
    pub top_offset: i32,
    /// Source tray keyword (e.g. "main-roll"), empty if unset.
    pub source: String,
    pub tracking: MediaTracking,
    /// Media type keyword (e.g. "stationery"), empty if unset.
    pub media_type: String,
}

impl MediaCol {
    /// Media of the named size with uniform margins.
    pub fn from_size_name(name: &str, margin: i32) -> Option<Self> {
        let (size_width, size_length) = size_from_name(name)?;
        Some(Self {
            size_name: name.to_string(),
            size_width,
            size_length,
            bottom_margin: margin,
            left_margin: margin,
            right_margin: margin,
            top_margin: margin,
            ..Default::default()
        })
    }

    /// Whether all four margins are zero.
    pub fn is_borderless(&self) -> bool {
        self.bottom_margin == 0
            && self.left_margin == 0
            && self.right_margin == 0
            && self.top_margin == 0
    }

    /// Build a `media-col` collection value.
    pub fn to_attributes(&self) -> AttributeSet {
        let mut col = AttributeSet::new();
        let mut size = AttributeSet::new();
        size.add("x-dimension", AttrValue::Integer(self.size_width))
            .add("y-dimension", AttrValue::Integer(self.size_length));

        col.add("media-bottom-margin", AttrValue::Integer(self.bottom_margin))
            .add("media-left-margin", AttrValue::Integer(self.left_margin))
            .add("media-right-margin", AttrValue::Integer(self.right_margin))
            .add("media-size", AttrValue::Collection(size))
            .add("media-size-name", AttrValue::keyword(&self.size_name))
            .add("media-top-margin", AttrValue::Integer(self.top_margin));

        if self.left_offset != 0 {
            col.add("media-left-offset", AttrValue::Integer(self.left_offset));
        }
        if !self.source.is_empty() {
            col.add("media-source", AttrValue::keyword(&self.source));
        }
        if self.top_offset != 0 {
            col.add("media-top-offset", AttrValue::Integer(self.top_offset));
        }
        if let Some(tracking) = self.tracking.keyword() {
            col.add("media-tracking", AttrValue::keyword(tracking));
        }
        if !self.media_type.is_empty() {
            col.add("media-type", AttrValue::keyword(&self.media_type));
        }
        col
    }

    /// Import a `media-col` collection on top of this value.
    ///
    /// Members missing from the collection keep their current values; a
    /// size without a name gets one from [`name_for_size`].
    pub fn import(&mut self, col: &AttributeSet) {
        let mut have_name = false;
        if let Some(name) = col.string("media-size-name") {
            if let Some((w, l)) = size_from_name(name) {
                self.size_name = name.to_string();
                self.size_width = w;
                self.size_length = l;
                have_name = true;
            }
        }
        if let Some(size) = col.collection("media-size") {
            if let (Some(w), Some(l)) = (size.integer("x-dimension"), size.integer("y-dimension")) {
                self.size_width = w;
                self.size_length = l;
                if !have_name {
                    self.size_name = name_for_size(w, l);
                }
            }
        }

        if let Some(v) = col.integer("media-bottom-margin") {
            self.bottom_margin = v;
        }
        if let Some(v) = col.integer("media-left-margin") {
            self.left_margin = v;
        }
        if let Some(v) = col.integer("media-right-margin") {
            self.right_margin = v;
        }
        if let Some(v) = col.integer("media-top-margin") {
            self.top_margin = v;
        }
        if let Some(v) = col.integer("media-left-offset") {
            self.left_offset = v;
        }
        if let Some(v) = col.integer("media-top-offset") {
            self.top_offset = v;
        }
        if let Some(v) = col.string("media-source") {
            self.source = v.to_string();
        }
        if let Some(v) = col.string("media-tracking").and_then(MediaTracking::from_keyword) {
            self.tracking = v;
        }
        if let Some(v) = col.string("media-type") {
            self.media_type = v.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metric_and_imperial_names() {
        assert_eq!(size_from_name("iso_a4_210x297mm"), Some((21000, 29700)));
        assert_eq!(size_from_name("na_letter_8.5x11in"), Some((21590, 27940)));
        assert_eq!(size_from_name("roll_max_4x39.6in"), Some((10160, 100584)));
    }

    #[test]
    fn rejects_malformed_names() {
        assert_eq!(size_from_name("letter"), None);
        assert_eq!(size_from_name("iso_a4_210mm"), None);
        assert_eq!(size_from_name("iso_a4_0x297mm"), None);
    }

    #[test]
    fn names_known_and_custom_sizes() {
        assert_eq!(name_for_size(21000, 29700), "iso_a4_210x297mm");
        let custom = name_for_size(5000, 3050);
        assert_eq!(custom, "custom_50x30.5mm_50x30.5mm");
        assert_eq!(size_from_name(&custom), Some((5000, 3050)));
    }

    #[test]
    fn detects_range_pseudo_entries() {
        assert!(is_range_name("custom_min_1x1in"));
        assert!(is_range_name("roll_max_4x39.6in"));
        assert!(!is_range_name("na_letter_8.5x11in"));
    }

    #[test]
    fn media_col_import_overrides_present_members() {
        let mut media = MediaCol::from_size_name("na_letter_8.5x11in", 635).expect("valid name");
        media.source = "main".into();

        let mut col = AttributeSet::new();
        col.add("media-size-name", AttrValue::keyword("iso_a4_210x297mm"))
            .add("media-top-margin", AttrValue::Integer(0))
            .add("media-tracking", AttrValue::keyword("gap"));
        media.import(&col);

        assert_eq!(media.size_name, "iso_a4_210x297mm");
        assert_eq!(media.size_width, 21000);
        assert_eq!(media.top_margin, 0);
        assert_eq!(media.left_margin, 635);
        assert_eq!(media.source, "main");
        assert_eq!(media.tracking, MediaTracking::GAP);
    }

    #[test]
    fn media_col_to_attributes_and_back() {
        let mut media = MediaCol::from_size_name("oe_photo-l_3.5x5in", 0).expect("valid name");
        media.source = "photo".into();
        media.media_type = "photographic-glossy".into();

        let mut copy = MediaCol::default();
        copy.import(&media.to_attributes());
        assert_eq!(copy, media);
        assert!(copy.is_borderless());
    }
}
