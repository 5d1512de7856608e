// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Named default bundles ("presets") and the line-oriented scanner that reads
// them from a preset file.
//
// File format:
//
// ```text
// <Preset id="1" name="Shipping Labels">
// media-col-default {name=na_index-4x6_4x6in source=main-roll tracking=gap}
// print-darkness-default 70
// printer-resolution-default 203x203dpi
// vendor-cut-default true
// </Preset>
// ```

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attributes::{AttrValue, AttributeSet};
use crate::error::{DruckwerkError, Result};
use crate::media::{MediaCol, size_from_name};
use crate::types::{
    ColorMode, ContentOptimize, IdentifyActions, LabelMode, MediaTracking, Orientation, Quality,
    Scaling, Sides,
};

/// A named bundle of default overrides.  `None` means "not overridden".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: u32,
    pub name: String,
    pub identify_default: Option<IdentifyActions>,
    pub mode_configured: Option<LabelMode>,
    pub tear_offset_configured: Option<i32>,
    pub media_default: Option<MediaCol>,
    /// Ready media overrides keyed by source index.
    pub media_ready: Vec<(usize, MediaCol)>,
    pub orientation_default: Option<Orientation>,
    pub bin_default: Option<usize>,
    pub color_default: Option<ColorMode>,
    pub content_default: Option<ContentOptimize>,
    pub darkness_default: Option<i32>,
    pub quality_default: Option<Quality>,
    pub scaling_default: Option<Scaling>,
    pub speed_default: Option<i32>,
    pub darkness_configured: Option<i32>,
    pub resolution_default: Option<(i32, i32)>,
    pub sides_default: Option<Sides>,
    /// Vendor `*-default` overrides.
    pub vendor_attrs: AttributeSet,
}

impl Preset {
    /// Render the overridden fields as printer `*-default` attributes.
    ///
    /// `bins` resolves the output-bin index back to its keyword.
    pub fn default_attributes(&self, bins: &[String]) -> AttributeSet {
        let mut attrs = AttributeSet::new();

        if let Some(v) = self.identify_default {
            attrs.add_keywords("identify-actions-default", &v.keywords());
        }
        if let Some(v) = self.mode_configured.and_then(LabelMode::keyword) {
            attrs.add("label-mode-configured", AttrValue::keyword(v));
        }
        if let Some(v) = self.tear_offset_configured {
            attrs.add("label-tear-offset-configured", AttrValue::Integer(v));
        }
        if let Some(media) = &self.media_default {
            attrs.add("media-col-default", AttrValue::Collection(media.to_attributes()));
            attrs.add("media-default", AttrValue::keyword(&media.size_name));
        }
        if let Some(v) = self.orientation_default {
            attrs.add("orientation-requested-default", AttrValue::Enum(v.ipp_enum_value()));
        }
        if let Some(bin) = self.bin_default.and_then(|i| bins.get(i)) {
            attrs.add("output-bin-default", AttrValue::keyword(bin));
        }
        if let Some(v) = self.color_default.and_then(ColorMode::keyword) {
            attrs.add("print-color-mode-default", AttrValue::keyword(v));
        }
        if let Some(v) = self.content_default.and_then(ContentOptimize::keyword) {
            attrs.add("print-content-optimize-default", AttrValue::keyword(v));
        }
        if let Some(v) = self.darkness_default {
            attrs.add("print-darkness-default", AttrValue::Integer(v));
        }
        if let Some(v) = self.quality_default {
            attrs.add("print-quality-default", AttrValue::Enum(v.ipp_enum_value()));
        }
        if let Some(v) = self.scaling_default.and_then(Scaling::keyword) {
            attrs.add("print-scaling-default", AttrValue::keyword(v));
        }
        if let Some(v) = self.speed_default {
            attrs.add("print-speed-default", AttrValue::Integer(v));
        }
        if let Some(v) = self.darkness_configured {
            attrs.add("printer-darkness-configured", AttrValue::Integer(v));
        }
        if let Some((x, y)) = self.resolution_default {
            attrs.add("printer-resolution-default", AttrValue::Resolution { x, y });
        }
        if let Some(v) = self.sides_default.and_then(Sides::keyword) {
            attrs.add("sides-default", AttrValue::keyword(v));
        }

        attrs.merge(&self.vendor_attrs);
        attrs
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Split a line into directive and optional value.
///
/// The split happens at the first space; for `<Directive value>` lines the
/// trailing `>` is dropped from the value.
fn split_line(line: &str) -> (&str, Option<&str>) {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.split_once(' ') {
        Some((key, value)) => {
            let value = if key.starts_with('<') {
                value.strip_suffix('>').unwrap_or(value)
            } else {
                value
            };
            (key, Some(value))
        }
        None => (line, None),
    }
}

/// Parse `name=value name2="quoted value" name3={nested value}` option text.
///
/// A single pair of surrounding braces is removed first, so a collection
/// value `{a=1 b=2}` parses the same as `a=1 b=2`.
pub fn parse_options(text: &str) -> Vec<(String, String)> {
    let text = text.trim();
    let text = text
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .unwrap_or(text);

    let mut options = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            name.push(c);
            chars.next();
        }
        if name.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            match chars.peek() {
                Some(&quote @ ('"' | '\'')) => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == quote {
                            break;
                        }
                        value.push(c);
                    }
                }
                Some('{') => {
                    let mut depth = 0usize;
                    for c in chars.by_ref() {
                        match c {
                            '{' => depth += 1,
                            '}' => depth = depth.saturating_sub(1),
                            _ => {}
                        }
                        value.push(c);
                        if depth == 0 {
                            break;
                        }
                    }
                }
                _ => {
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
            }
        }
        options.push((name, value));
    }

    options
}

/// Parse a `media-col` option string (keys: bottom, left, left-offset,
/// right, name, width, length, source, top, offset/top-offset, tracking,
/// type).  Unset members stay zero/empty.
pub fn parse_media_col(value: &str) -> MediaCol {
    let mut media = MediaCol::default();

    for (name, v) in parse_options(value) {
        let int = || v.trim().parse::<i32>().unwrap_or(0);
        match name.to_ascii_lowercase().as_str() {
            "bottom" => media.bottom_margin = int(),
            "left" => media.left_margin = int(),
            "left-offset" => media.left_offset = int(),
            "right" => media.right_margin = int(),
            "name" => media.size_name = v.clone(),
            "width" => media.size_width = int(),
            "length" => media.size_length = int(),
            "source" => media.source = v.clone(),
            "top" => media.top_margin = int(),
            "offset" | "top-offset" => media.top_offset = int(),
            "tracking" => media.tracking = MediaTracking::from_keyword(&v).unwrap_or_default(),
            "type" => media.media_type = v.clone(),
            other => debug!(key = other, "ignoring unknown media-col key"),
        }
    }

    if media.size_width == 0 && media.size_length == 0 {
        if let Some((w, l)) = size_from_name(&media.size_name) {
            media.size_width = w;
            media.size_length = l;
        }
    }

    media
}

fn parse_int(value: Option<&str>) -> Option<i32> {
    value.and_then(|v| v.trim().parse().ok())
}

fn keyword_list<T: Copy + std::ops::BitOr<Output = T>>(
    value: Option<&str>,
    lookup: fn(&str) -> Option<T>,
) -> Option<T> {
    value?
        .split(',')
        .filter_map(|k| lookup(k.trim()))
        .reduce(|acc, v| acc | v)
}

fn orientation_from_keyword(value: &str) -> Option<Orientation> {
    match value {
        "portrait" => Some(Orientation::Portrait),
        "landscape" => Some(Orientation::Landscape),
        "reverse-landscape" => Some(Orientation::ReverseLandscape),
        "reverse-portrait" => Some(Orientation::ReversePortrait),
        "none" => Some(Orientation::None),
        _ => value.parse().ok().and_then(Orientation::from_ipp_enum),
    }
}

fn quality_from_keyword(value: &str) -> Option<Quality> {
    match value {
        "draft" => Some(Quality::Draft),
        "normal" => Some(Quality::Normal),
        "high" => Some(Quality::High),
        _ => value.parse().ok().and_then(Quality::from_ipp_enum),
    }
}

/// Parse `300x600dpi` (or `300dpi`) into a resolution pair.
pub fn parse_resolution(value: &str) -> Option<(i32, i32)> {
    let dims = value.trim().strip_suffix("dpi")?;
    match dims.split_once('x') {
        Some((x, y)) => Some((x.parse().ok()?, y.parse().ok()?)),
        None => {
            let v = dims.parse().ok()?;
            Some((v, v))
        }
    }
}

/// Type a vendor `*-default` value using the matching `*-supported`
/// capability attribute, falling back to text.
fn vendor_value(supported: Option<&AttrValue>, value: &str) -> Option<AttrValue> {
    match supported {
        Some(AttrValue::Boolean(_)) => Some(AttrValue::Boolean(value == "true")),
        Some(AttrValue::Integer(_) | AttrValue::Range { .. }) => {
            Some(AttrValue::Integer(value.trim().parse().unwrap_or(0)))
        }
        Some(AttrValue::Keyword(_)) => Some(AttrValue::keyword(value)),
        Some(_) => None,
        None => Some(AttrValue::text(value)),
    }
}

/// Read presets from a preset file.
///
/// `bins` resolves `output-bin-default` keywords to indices and
/// `driver_attrs` types vendor overrides.  Lines outside a preset block are
/// ignored.  A malformed `<Preset>` header or a missing `</Preset>` is an
/// error carrying the line number.
pub fn parse_presets<R: BufRead>(
    reader: R,
    bins: &[String],
    driver_attrs: &AttributeSet,
) -> Result<Vec<Preset>> {
    let mut presets = Vec::new();
    let mut current: Option<Preset> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let linenum = index + 1;
        let (key, value) = split_line(&line);

        let Some(preset) = current.as_mut() else {
            if key.eq_ignore_ascii_case("<Preset") {
                current = Some(parse_preset_header(value, linenum)?);
            } else if !key.is_empty() {
                debug!(line = linenum, key, "ignoring line outside preset");
            }
            continue;
        };

        match key.to_ascii_lowercase().as_str() {
            "</preset>" => {
                if let Some(done) = current.take() {
                    debug!(id = done.id, name = %done.name, "preset parsed");
                    presets.push(done);
                }
            }
            "identify-actions-default" => {
                preset.identify_default = keyword_list(value, IdentifyActions::from_keyword);
            }
            "label-mode-configured" => {
                preset.mode_configured = value.and_then(LabelMode::from_keyword);
            }
            "label-tear-offset-configured" => preset.tear_offset_configured = parse_int(value),
            "media-col-default" => preset.media_default = value.map(parse_media_col),
            "orientation-requested-default" => {
                preset.orientation_default = value.and_then(orientation_from_keyword);
            }
            "output-bin-default" => {
                preset.bin_default = value.and_then(|v| bins.iter().position(|b| b == v));
            }
            "print-color-mode-default" => {
                preset.color_default = value.and_then(ColorMode::from_keyword);
            }
            "print-content-optimize-default" => {
                preset.content_default = value.and_then(ContentOptimize::from_keyword);
            }
            "print-darkness-default" => preset.darkness_default = parse_int(value),
            "print-quality-default" => {
                preset.quality_default = value.and_then(quality_from_keyword);
            }
            "print-scaling-default" => {
                preset.scaling_default = value.and_then(Scaling::from_keyword);
            }
            "print-speed-default" => preset.speed_default = parse_int(value),
            "printer-darkness-configured" => preset.darkness_configured = parse_int(value),
            "printer-resolution-default" => {
                preset.resolution_default = value.and_then(parse_resolution);
            }
            "sides-default" => preset.sides_default = value.and_then(Sides::from_keyword),
            lower if lower.starts_with("media-col-ready") => {
                match lower["media-col-ready".len()..].parse::<usize>() {
                    Ok(idx) => {
                        if let Some(v) = value {
                            preset.media_ready.retain(|(i, _)| *i != idx);
                            preset.media_ready.push((idx, parse_media_col(v)));
                        }
                    }
                    Err(_) => warn!(line = linenum, key, "bad media-col-ready index"),
                }
            }
            _ => {
                if let Some(base) = key.strip_suffix("-default") {
                    let supported = driver_attrs
                        .get(&format!("{base}-supported"))
                        .and_then(|a| a.first());
                    let value = value.unwrap_or("");
                    match vendor_value(supported, value) {
                        Some(v) => {
                            preset.vendor_attrs.add(key, v);
                        }
                        None => debug!(line = linenum, key, "vendor default has unsupported type"),
                    }
                } else {
                    debug!(line = linenum, key, "ignoring unknown preset key");
                }
            }
        }
    }

    match current {
        Some(open) => Err(DruckwerkError::Preset {
            line: 0,
            message: format!("preset '{}' is missing </Preset>", open.name),
        }),
        None => Ok(presets),
    }
}

fn parse_preset_header(value: Option<&str>, line: usize) -> Result<Preset> {
    let bad = |message: &str| DruckwerkError::Preset {
        line,
        message: message.to_string(),
    };

    let options = parse_options(value.ok_or_else(|| bad("missing preset attributes"))?);
    if options.len() != 2 {
        return Err(bad("preset needs exactly id and name"));
    }

    let id = options
        .iter()
        .find(|(k, _)| k == "id")
        .and_then(|(_, v)| v.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| bad("preset id must be a positive integer"))?;
    let name = options
        .iter()
        .find(|(k, _)| k == "name")
        .map(|(_, v)| v.clone())
        .ok_or_else(|| bad("preset name is missing"))?;

    Ok(Preset {
        id: u32::try_from(id).map_err(|_| bad("preset id out of range"))?,
        name,
        ..Default::default()
    })
}
