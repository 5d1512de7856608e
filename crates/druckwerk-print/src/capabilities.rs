// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability synthesis.
//
// Everything a client can learn about what a printer supports is derived
// here from the driver's `DriverData`.  The function is pure: the same
// descriptor always produces the same attribute set, and the caller merges
// any vendor attributes on top.

use druckwerk_core::attributes::{AttrValue, AttributeSet};
use druckwerk_core::driver_data::DriverData;
use druckwerk_core::media::{MediaCol, size_from_name};
use druckwerk_core::types::{
    FORMAT_JPEG, FORMAT_OCTET_STREAM, FORMAT_PNG, FORMAT_PWG_RASTER, FORMAT_URF, Finishings,
    RasterType,
};
use tracing::{debug, instrument};

/// `finishings` value for "none".
pub const FINISHINGS_NONE: i32 = 3;

const JOB_CREATION_ATTRIBUTES: &[&str] = &[
    "copies",
    "document-format",
    "document-name",
    "ipp-attribute-fidelity",
    "job-name",
    "job-priority",
    "media",
    "media-col",
    "multiple-document-handling",
    "orientation-requested",
    "print-color-mode",
    "print-content-optimize",
    "print-quality",
    "printer-resolution",
];

const MEDIA_COL_MEMBERS: &[&str] = &[
    "media-bottom-margin",
    "media-left-margin",
    "media-right-margin",
    "media-size",
    "media-size-name",
    "media-top-margin",
];

const PRINTER_SETTABLE_ATTRIBUTES: &[&str] = &[
    "copies-default",
    "document-format-default",
    "label-mode-configured",
    "label-tear-off-configured",
    "media-col-default",
    "media-col-ready",
    "media-default",
    "media-ready",
    "multiple-document-handling-default",
    "orientation-requested-default",
    "print-color-mode-default",
    "print-content-optimize-default",
    "print-darkness-default",
    "print-quality-default",
    "print-speed-default",
    "printer-darkness-configured",
    "printer-geo-location",
    "printer-location",
    "printer-organization",
    "printer-organizational-unit",
    "printer-resolution-default",
];

// URF index tables: a keyword's position is its URF code.

const URF_SOURCES: &[&str] = &[
    "auto", "main", "alternate", "large-capacity", "manual", "envelope", "disc", "photo",
    "hagaki", "main-roll", "alternate-roll", "top", "middle", "bottom", "side", "left", "right",
    "center", "rear", "by-pass-tray", "tray-1", "tray-2", "tray-3", "tray-4", "tray-5", "tray-6",
    "tray-7", "tray-8", "tray-9", "tray-10", "tray-11", "tray-12", "tray-13", "tray-14",
    "tray-15", "tray-16", "tray-17", "tray-18", "tray-19", "tray-20", "roll-1", "roll-2",
    "roll-3", "roll-4", "roll-5", "roll-6", "roll-7", "roll-8", "roll-9", "roll-10",
];

const URF_TYPES: &[&str] = &[
    "auto",
    "stationery",
    "transparency",
    "envelope",
    "cardstock",
    "labels",
    "stationery-letterhead",
    "disc",
    "photographic-matte",
    "photographic-satin",
    "photographic-semi-gloss",
    "photographic-glossy",
    "photographic-high-gloss",
    "other",
];

const URF_BINS: &[&str] = &[
    "auto", "top", "middle", "bottom", "side", "left", "right", "center", "rear", "face-up",
    "face-down", "large-capacity", "stacker", "my-mailbox", "mailbox-1", "mailbox-2",
    "mailbox-3", "mailbox-4", "mailbox-5", "mailbox-6", "mailbox-7", "mailbox-8", "mailbox-9",
    "mailbox-10", "stacker-1", "stacker-2", "stacker-3", "stacker-4", "stacker-5", "stacker-6",
    "stacker-7", "stacker-8", "stacker-9", "stacker-10", "tray-1", "tray-2", "tray-3", "tray-4",
    "tray-5", "tray-6", "tray-7", "tray-8", "tray-9", "tray-10",
];

/// Fixed sizes and the optional custom size range of a media list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSplit<'a> {
    /// Fixed size names in input order.
    pub fixed: Vec<&'a str>,
    /// `((min_w, max_w), (min_l, max_l))` when both a min and a max entry exist.
    pub range: Option<((i32, i32), (i32, i32))>,
}

/// Separate fixed sizes from the `custom_min_`/`custom_max_`/`roll_min_`/
/// `roll_max_` pseudo-entries.
///
/// The result does not depend on where the pseudo-entries appear.  When
/// several minimums (or maximums) are listed, the smallest minimum and the
/// largest maximum win, per dimension.
pub fn split_media(media: &[String]) -> MediaSplit<'_> {
    let mut fixed = Vec::new();
    let mut min: Option<(i32, i32)> = None;
    let mut max: Option<(i32, i32)> = None;

    for name in media {
        let name = name.as_str();
        if name.starts_with("custom_min_") || name.starts_with("roll_min_") {
            let size = size_from_name(name).unwrap_or((0, 0));
            min = Some(min.map_or(size, |(w, l)| (w.min(size.0), l.min(size.1))));
        } else if name.starts_with("custom_max_") || name.starts_with("roll_max_") {
            let size = size_from_name(name).unwrap_or((0, 0));
            max = Some(max.map_or(size, |(w, l)| (w.max(size.0), l.max(size.1))));
        } else {
            fixed.push(name);
        }
    }

    let range = match (min, max) {
        (Some((min_w, min_l)), Some((max_w, max_l))) => Some(((min_w, max_w), (min_l, max_l))),
        _ => None,
    };
    MediaSplit { fixed, range }
}

/// Build the capability attribute set for a driver.
#[instrument(skip_all, fields(make_and_model = %data.make_and_model))]
pub fn synthesize(data: &DriverData) -> AttributeSet {
    let mut attrs = AttributeSet::new();

    // document-format-supported
    let mut formats = vec![FORMAT_OCTET_STREAM];
    if let Some(format) = data.format.as_deref().filter(|f| *f != FORMAT_OCTET_STREAM) {
        formats.push(format);
    }
    formats.extend([FORMAT_JPEG, FORMAT_PNG, FORMAT_PWG_RASTER, FORMAT_URF]);
    attrs.add_values(
        "document-format-supported",
        formats.iter().map(|f| AttrValue::MimeType((*f).to_string())).collect(),
    );

    let fn_token = add_finishings(&mut attrs, data.finishings);

    attrs.add_keywords("identify-actions-default", &data.identify_default.keywords());
    attrs.add_keywords("identify-actions-supported", &data.identify_supported.keywords());

    // job-creation-attributes-supported
    let mut creation: Vec<&str> = JOB_CREATION_ATTRIBUTES.to_vec();
    if data.darkness_supported > 0 {
        creation.push("print-darkness");
    }
    if data.speed_supported.1 > 0 {
        creation.push("print-speed");
    }
    creation.extend(data.vendor.iter().map(String::as_str));
    attrs.add_keywords("job-creation-attributes-supported", &creation);

    attrs.add_keywords("label-mode-supported", &data.mode_supported.keywords());
    if data.tear_offset_supported != (0, 0) {
        let (lower, upper) = data.tear_offset_supported;
        attrs.add("label-tear-offset-supported", AttrValue::Range { lower, upper });
    }

    // media-*-margin-supported
    let margins = |value: i32| -> Vec<i32> {
        if data.borderless { vec![0, value] } else { vec![value] }
    };
    attrs.add_integers("media-bottom-margin-supported", &margins(data.bottom_top));
    attrs.add_integers("media-left-margin-supported", &margins(data.left_right));
    attrs.add_integers("media-right-margin-supported", &margins(data.left_right));
    attrs.add_integers("media-top-margin-supported", &margins(data.bottom_top));

    add_media(&mut attrs, data);

    attrs.add_keywords("media-source-supported", &data.sources);
    attrs.add_keywords("media-supported", &data.media);
    if data.top_offset_supported.1 != 0 {
        let (lower, upper) = data.top_offset_supported;
        attrs.add("media-top-offset-supported", AttrValue::Range { lower, upper });
    }
    attrs.add_keywords("media-tracking-supported", &data.tracking_supported.keywords());
    attrs.add_keywords("media-type-supported", &data.types);

    attrs.add("multiple-document-jobs-supported", AttrValue::Boolean(false));
    attrs.add_keywords("output-bin-supported", &data.bins);

    // print-color-mode-*
    attrs.add_keywords("print-color-mode-supported", &data.color_supported.keywords());
    if let Some(mode) = data.color_default.keyword() {
        attrs.add("print-color-mode-default", AttrValue::keyword(mode));
    }

    if data.darkness_supported > 0 {
        attrs.add("print-darkness-supported", AttrValue::Integer(2 * data.darkness_supported));
        attrs.add("printer-darkness-supported", AttrValue::Integer(data.darkness_supported));
    }
    if data.speed_supported.1 > 0 {
        let (lower, upper) = data.speed_supported;
        attrs.add("print-speed-supported", AttrValue::Range { lower, upper });
    }

    attrs.add_keywords("printer-kind", &printer_kind(data));
    attrs.add("printer-make-and-model", AttrValue::text(&data.make_and_model));

    let resolutions: Vec<AttrValue> = data
        .resolutions
        .iter()
        .map(|&(x, y)| AttrValue::Resolution { x, y })
        .collect();
    attrs.add_values("printer-resolution-supported", resolutions.clone());
    attrs.add_keywords("printer-settable-attributes", PRINTER_SETTABLE_ATTRIBUTES);
    attrs.add_values("pwg-raster-document-resolution-supported", resolutions);

    if let Some(back) = data.duplex.sheet_back_keyword() {
        attrs.add("pwg-raster-document-sheet-back", AttrValue::keyword(back));
    }
    attrs.add_keywords("pwg-raster-document-type-supported", &data.raster_types.keywords());
    attrs.add_keywords("sides-supported", &data.sides_supported.keywords());

    if let Some(tokens) = urf_tokens(data, fn_token.as_deref()) {
        attrs.add_keywords("urf-supported", &tokens);
    }

    debug!(count = attrs.len(), "capability attributes synthesized");
    attrs
}

/// Add the finishing attributes and return the URF `FN` token.
fn add_finishings(attrs: &mut AttributeSet, finishings: Finishings) -> Option<String> {
    if finishings.is_empty() {
        return None;
    }

    let mut keywords = vec!["none"];
    let mut values = vec![FINISHINGS_NONE];
    let mut codes = Vec::new();
    // URF orders finishings punch, staple, trim, which is also bit order.
    for member in finishings.iter() {
        if let Some(keyword) = member.keyword() {
            keywords.push(keyword);
            values.push(member.ipp_enum_value());
            codes.push(member.ipp_enum_value().to_string());
        }
    }

    let database: Vec<AttrValue> = keywords
        .iter()
        .map(|keyword| {
            let mut col = AttributeSet::new();
            col.add("finishing-template", AttrValue::keyword(*keyword));
            AttrValue::Collection(col)
        })
        .collect();

    attrs.add_keywords("finishing-template-supported", &keywords);
    if let Some(first) = database.first() {
        attrs.add("finishing-col-default", first.clone());
    }
    attrs.add_values("finishing-col-database", database);
    attrs.add("finishing-col-supported", AttrValue::keyword("finishing-template"));
    attrs.add("finishings-default", AttrValue::Enum(FINISHINGS_NONE));
    attrs.add_enums("finishings-supported", &values);

    Some(format!("FN{}", codes.join("-")))
}

/// Add media-col-database, media-col-supported and media-size-supported.
fn add_media(attrs: &mut AttributeSet, data: &DriverData) {
    let split = split_media(&data.media);
    let mut database = Vec::new();
    let mut sizes = Vec::new();

    for name in &split.fixed {
        let (width, length) = size_from_name(name).unwrap_or((0, 0));
        let mut col = MediaCol {
            size_name: (*name).to_string(),
            size_width: width,
            size_length: length,
            ..Default::default()
        };
        if data.borderless && data.bottom_top > 0 && data.left_right > 0 {
            database.push(AttrValue::Collection(col.to_attributes()));
        }
        col.bottom_margin = data.bottom_top;
        col.top_margin = data.bottom_top;
        col.left_margin = data.left_right;
        col.right_margin = data.left_right;
        database.push(AttrValue::Collection(col.to_attributes()));

        if width > 0 && length > 0 {
            let mut size = AttributeSet::new();
            size.add("x-dimension", AttrValue::Integer(width))
                .add("y-dimension", AttrValue::Integer(length));
            sizes.push(AttrValue::Collection(size));
        }
    }

    if let Some(((min_w, max_w), (min_l, max_l))) = split.range {
        let mut size = AttributeSet::new();
        size.add("x-dimension", AttrValue::Range { lower: min_w, upper: max_w })
            .add("y-dimension", AttrValue::Range { lower: min_l, upper: max_l });

        let mut col = AttributeSet::new();
        col.add("media-size", AttrValue::Collection(size.clone()));
        database.push(AttrValue::Collection(col));
        sizes.push(AttrValue::Collection(size));
    }

    attrs.add_values("media-col-database", database);
    attrs.add_values("media-size-supported", sizes);

    let mut members: Vec<&str> = MEDIA_COL_MEMBERS.to_vec();
    if !data.sources.is_empty() {
        members.push("media-source");
    }
    if data.top_offset_supported.1 != 0 {
        members.push("media-top-offset");
    }
    if !data.tracking_supported.is_empty() {
        members.push("media-tracking");
    }
    if !data.types.is_empty() {
        members.push("media-type");
    }
    attrs.add_keywords("media-col-supported", &members);
}

/// `printer-kind` keywords inferred from media and label support.
fn printer_kind(data: &DriverData) -> Vec<&'static str> {
    let mut kinds = vec!["document"];
    let any_media = |needle: &str| data.media.iter().any(|m| m.contains(needle));
    let any_type = |prefix: &str| data.types.iter().any(|t| t.starts_with(prefix));

    if any_media("env") || any_type("envelope") {
        kinds.push("envelope");
    }
    if !data.mode_supported.is_empty() || any_type("labels") {
        kinds.push("label");
    }
    if any_media("photo") || any_type("photographic") {
        kinds.push("photo");
    }
    if data.media.iter().any(|m| m.starts_with("roll_")) {
        kinds.push("roll");
    }
    kinds
}

/// Encode `codes` for the keywords found in `table` as `{prefix}{a}-{b}...`.
fn urf_index_token(prefix: &str, keywords: &[String], table: &[&str]) -> Option<String> {
    let codes: Vec<String> = keywords
        .iter()
        .filter_map(|k| table.iter().position(|t| t == k))
        .map(|i| i.to_string())
        .collect();
    if codes.is_empty() {
        None
    } else {
        Some(format!("{prefix}{}", codes.join("-")))
    }
}

/// `urf-supported` tokens; `None` when the driver declares no resolutions.
fn urf_tokens(data: &DriverData, fn_token: Option<&str>) -> Option<Vec<String>> {
    let lowest = data.resolutions.iter().map(|r| r.0).min()?;
    let highest = data.resolutions.iter().map(|r| r.0).max().unwrap_or(lowest);
    let types = data.raster_types;
    let pick = |wide: RasterType, narrow: RasterType, both: &str, one: &str| -> Option<String> {
        if types.contains(wide) {
            Some(both.to_string())
        } else if types.contains(narrow) {
            Some(one.to_string())
        } else {
            None
        }
    };

    let mut tokens = vec!["V1.4".to_string(), "W8".to_string()];
    if types.contains(RasterType::SRGB_8) {
        tokens.push("SRGB24".into());
    }
    tokens.extend(pick(RasterType::ADOBE_RGB_16, RasterType::ADOBE_RGB_8, "ADOBERGB24-48", "ADOBERGB24"));
    tokens.extend(pick(RasterType::BLACK_16, RasterType::BLACK_8, "DEVW8-16", "DEVW8"));
    tokens.extend(pick(RasterType::RGB_16, RasterType::RGB_8, "DEVRGB24-48", "DEVRGB24"));
    tokens.extend(pick(RasterType::CMYK_16, RasterType::CMYK_8, "DEVCMYK32-64", "DEVCMYK32"));
    tokens.push("PQ3-4-5".into());

    let duplex = data.duplex.urf_mode();
    if duplex > 0 {
        tokens.push(format!("DM{duplex}"));
    }
    tokens.extend(fn_token.map(str::to_string));
    tokens.extend(urf_index_token("IS", &data.sources, URF_SOURCES));
    tokens.extend(urf_index_token("MT", &data.types, URF_TYPES));
    tokens.extend(urf_index_token("OB", &data.bins, URF_BINS));
    if data.input_face_up {
        tokens.push("IFU0".into());
    }
    if data.output_face_up {
        tokens.push("OFU0".into());
    }
    if lowest == highest {
        tokens.push(format!("RS{lowest}"));
    } else {
        tokens.push(format!("RS{lowest}-{highest}"));
    }
    Some(tokens)
}

#[cfg(test)]
mod tests {
    use druckwerk_core::types::{Duplex, LabelMode, MediaTracking};

    use super::*;

    fn label_printer() -> DriverData {
        DriverData {
            make_and_model: "Acme Label 2".into(),
            format: Some("application/vnd.acme-label".into()),
            resolutions: vec![(203, 203), (300, 300)],
            resolution_default: (203, 203),
            raster_types: RasterType::BLACK_1 | RasterType::SGRAY_8,
            mode_supported: LabelMode::TEAR_OFF | LabelMode::PEEL_OFF,
            tear_offset_supported: (-1500, 1500),
            darkness_supported: 16,
            speed_supported: (2540, 10160),
            media: vec![
                "roll_max_4x39.6in".into(),
                "na_index-4x6_4x6in".into(),
                "oe_2x1-label_2x1in".into(),
                "roll_min_0.75x0.25in".into(),
            ],
            media_default: MediaCol::from_size_name("na_index-4x6_4x6in", 0).expect("media"),
            sources: vec!["main-roll".into()],
            types: vec!["labels".into(), "continuous".into()],
            tracking_supported: MediaTracking::GAP | MediaTracking::MARK,
            top_offset_supported: (-1500, 1500),
            vendor: vec!["vendor-cut".into()],
            ..Default::default()
        }
    }

    #[test]
    fn document_formats_list_driver_format_once() {
        let attrs = synthesize(&label_printer());
        assert_eq!(
            attrs.strings("document-format-supported"),
            vec![
                "application/octet-stream",
                "application/vnd.acme-label",
                "image/jpeg",
                "image/png",
                "image/pwg-raster",
                "image/urf"
            ]
        );

        let plain = DriverData {
            format: Some(FORMAT_OCTET_STREAM.into()),
            ..Default::default()
        };
        assert_eq!(synthesize(&plain).strings("document-format-supported").len(), 5);
    }

    #[test]
    fn media_range_is_split_from_fixed_sizes() {
        let attrs = synthesize(&label_printer());
        let sizes = &attrs.get("media-size-supported").expect("sizes").values;
        assert_eq!(sizes.len(), 3);

        let range = sizes[2].as_collection().expect("range");
        assert_eq!(range.range("x-dimension"), Some((1905, 10160)));
        assert_eq!(range.range("y-dimension"), Some((635, 100584)));
        assert_eq!(attrs.strings("media-supported").len(), 4);
    }

    #[test]
    fn media_range_bounds_each_dimension() {
        let media: Vec<String> = [
            "custom_min_3x5in",
            "custom_min_4x2in",
            "na_letter_8.5x11in",
            "custom_max_8x30in",
            "custom_max_9x20in",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let split = split_media(&media);
        assert_eq!(split.fixed, vec!["na_letter_8.5x11in"]);
        assert_eq!(split.range, Some(((7620, 22860), (5080, 76200))));
    }

    #[test]
    fn media_split_ignores_entry_order() {
        let data = label_printer();
        let mut reversed = data.media.clone();
        reversed.reverse();
        let mut rotated = data.media.clone();
        rotated.rotate_left(1);

        let reference = split_media(&data.media);
        for media in [reversed, rotated] {
            let split = split_media(&media);
            assert_eq!(split.range, reference.range);
            let mut fixed = split.fixed.clone();
            fixed.sort_unstable();
            let mut expected = reference.fixed.clone();
            expected.sort_unstable();
            assert_eq!(fixed, expected);
        }
    }

    #[test]
    fn lone_min_entry_gives_no_range() {
        let media = vec!["custom_min_1x1in".to_string(), "iso_a4_210x297mm".to_string()];
        let split = split_media(&media);
        assert_eq!(split.range, None);
        assert_eq!(split.fixed, vec!["iso_a4_210x297mm"]);
    }

    #[test]
    fn borderless_adds_zero_margins_and_extra_database_entries() {
        let data = DriverData {
            borderless: true,
            bottom_top: 423,
            left_right: 318,
            media: vec!["na_letter_8.5x11in".into(), "iso_a4_210x297mm".into()],
            ..Default::default()
        };
        let attrs = synthesize(&data);
        assert_eq!(
            attrs.get("media-bottom-margin-supported").expect("bottom").values,
            vec![AttrValue::Integer(0), AttrValue::Integer(423)]
        );
        let database = &attrs.get("media-col-database").expect("database").values;
        assert_eq!(database.len(), 4);
        let first = database[0].as_collection().expect("col");
        let second = database[1].as_collection().expect("col");
        assert_eq!(first.integer("media-left-margin"), Some(0));
        assert_eq!(second.integer("media-left-margin"), Some(318));
    }

    #[test]
    fn finishings_start_with_none() {
        let data = DriverData {
            finishings: Finishings::STAPLE | Finishings::PUNCH | Finishings::TRIM,
            resolutions: vec![(600, 600)],
            ..Default::default()
        };
        let attrs = synthesize(&data);
        assert_eq!(
            attrs.strings("finishing-template-supported"),
            vec!["none", "punch", "staple", "trim"]
        );
        assert_eq!(
            attrs.get("finishings-supported").expect("finishings").values,
            vec![AttrValue::Enum(3), AttrValue::Enum(5), AttrValue::Enum(4), AttrValue::Enum(60)]
        );
        assert_eq!(attrs.integer("finishings-default"), Some(FINISHINGS_NONE));
        assert!(attrs.strings("urf-supported").contains(&"FN5-4-60"));
    }

    #[test]
    fn no_finishings_means_no_finishing_attributes() {
        let attrs = synthesize(&DriverData::default());
        assert!(!attrs.contains("finishings-supported"));
        assert!(!attrs.contains("finishing-col-database"));
    }

    #[test]
    fn urf_tokens_follow_capabilities() {
        let data = DriverData {
            resolutions: vec![(300, 300), (600, 600), (1200, 1200)],
            raster_types: RasterType::SRGB_8 | RasterType::BLACK_8 | RasterType::BLACK_16,
            duplex: Duplex::Flipped,
            sources: vec!["main".into(), "manual".into(), "nonexistent".into()],
            types: vec!["stationery".into(), "photographic-glossy".into()],
            bins: vec!["face-down".into()],
            input_face_up: true,
            ..Default::default()
        };
        let attrs = synthesize(&data);
        assert_eq!(
            attrs.strings("urf-supported"),
            vec![
                "V1.4", "W8", "SRGB24", "DEVW8-16", "PQ3-4-5", "DM2", "IS1-4", "MT1-11", "OB10",
                "IFU0", "RS300-1200"
            ]
        );
    }

    #[test]
    fn single_resolution_urf_token() {
        let data = DriverData {
            resolutions: vec![(203, 203)],
            ..Default::default()
        };
        let tokens = synthesize(&data);
        assert_eq!(tokens.strings("urf-supported").last(), Some(&"RS203"));
    }

    #[test]
    fn no_resolutions_means_no_urf() {
        let attrs = synthesize(&DriverData::default());
        assert!(!attrs.contains("urf-supported"));
        assert!(!attrs.contains("printer-resolution-supported"));
    }

    #[test]
    fn label_specific_attributes() {
        let attrs = synthesize(&label_printer());
        assert_eq!(attrs.strings("label-mode-supported"), vec!["peel-off", "tear-off"]);
        assert_eq!(attrs.range("label-tear-offset-supported"), Some((-1500, 1500)));
        assert_eq!(attrs.integer("print-darkness-supported"), Some(32));
        assert_eq!(attrs.integer("printer-darkness-supported"), Some(16));
        assert_eq!(attrs.range("print-speed-supported"), Some((2540, 10160)));
        assert_eq!(attrs.strings("printer-kind"), vec!["document", "label", "roll"]);

        let creation = attrs.strings("job-creation-attributes-supported");
        assert!(creation.contains(&"print-darkness"));
        assert!(creation.contains(&"print-speed"));
        assert_eq!(creation.last(), Some(&"vendor-cut"));

        let members = attrs.strings("media-col-supported");
        assert!(members.ends_with(&["media-source", "media-top-offset", "media-tracking", "media-type"]));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let data = label_printer();
        assert_eq!(synthesize(&data), synthesize(&data));
    }
}
