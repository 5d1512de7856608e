// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Druckwerk printer framework.
//
// Supported/default option sets are modelled as small bitset newtypes that
// carry their IPP keyword tables, so a single value (`ColorMode::BI_LEVEL`)
// and a supported set (`ColorMode::BI_LEVEL | ColorMode::MONOCHROME`) share
// one type.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Job identifier, unique within a printer and assigned monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u32);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Printer identifier, unique within a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrinterId(pub u32);

impl std::fmt::Display for PrinterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Job and printer states
// ---------------------------------------------------------------------------

/// Lifecycle states of a print job (RFC 8011 `job-state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    /// Queued, waiting for the printer.
    Pending,
    /// Held until explicitly released.
    Held,
    /// Being processed by a worker.
    Processing,
    /// Processing is stopped (printer stopped mid-job).
    Stopped,
    /// Canceled by a client or administrator.
    Canceled,
    /// Processing failed.
    Aborted,
    /// Printed successfully.
    Completed,
}

impl JobState {
    /// IPP enum value for `job-state`.
    pub fn ipp_enum_value(&self) -> i32 {
        match self {
            Self::Pending => 3,
            Self::Held => 4,
            Self::Processing => 5,
            Self::Stopped => 6,
            Self::Canceled => 7,
            Self::Aborted => 8,
            Self::Completed => 9,
        }
    }

    /// Whether this is one of the terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled | Self::Aborted | Self::Completed)
    }

    /// Keyword form used in logs.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Held => "pending-held",
            Self::Processing => "processing",
            Self::Stopped => "processing-stopped",
            Self::Canceled => "canceled",
            Self::Aborted => "aborted",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Printer states (RFC 8011 `printer-state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrinterState {
    Idle,
    Processing,
    Stopped,
}

impl PrinterState {
    /// IPP enum value for `printer-state`.
    pub fn ipp_enum_value(&self) -> i32 {
        match self {
            Self::Idle => 3,
            Self::Processing => 4,
            Self::Stopped => 5,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for PrinterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

// ---------------------------------------------------------------------------
// Keyword bitsets
// ---------------------------------------------------------------------------

macro_rules! keyword_set {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$cmeta:meta])* $konst:ident = $bit:expr => $kw:literal, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Empty set.
            pub const EMPTY: Self = Self(0);
            $( $(#[$cmeta])* pub const $konst: Self = Self($bit); )*

            const TABLE: &'static [(u32, &'static str)] = &[ $( ($bit, $kw), )* ];

            /// Whether every bit of `other` is set (and `other` is non-empty).
            pub fn contains(self, other: Self) -> bool {
                other.0 != 0 && self.0 & other.0 == other.0
            }

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            /// Individual set members in ascending bit order.
            pub fn iter(self) -> impl Iterator<Item = Self> {
                Self::TABLE
                    .iter()
                    .filter(move |(bit, _)| self.0 & bit != 0)
                    .map(|(bit, _)| Self(*bit))
            }

            /// Keywords of all set members in ascending bit order.
            pub fn keywords(self) -> Vec<&'static str> {
                Self::TABLE
                    .iter()
                    .filter(|(bit, _)| self.0 & bit != 0)
                    .map(|(_, kw)| *kw)
                    .collect()
            }

            /// Keyword of the lowest set member.
            pub fn keyword(self) -> Option<&'static str> {
                Self::TABLE
                    .iter()
                    .find(|(bit, _)| self.0 & bit != 0)
                    .map(|(_, kw)| *kw)
            }

            /// Look up a single member by keyword.
            pub fn from_keyword(keyword: &str) -> Option<Self> {
                Self::TABLE
                    .iter()
                    .find(|(_, kw)| *kw == keyword)
                    .map(|(bit, _)| Self(*bit))
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }
    };
}

keyword_set! {
    /// `print-color-mode` values.
    ColorMode {
        AUTO = 0x01 => "auto",
        AUTO_MONOCHROME = 0x02 => "auto-monochrome",
        BI_LEVEL = 0x04 => "bi-level",
        COLOR = 0x08 => "color",
        MONOCHROME = 0x10 => "monochrome",
        PROCESS_MONOCHROME = 0x20 => "process-monochrome",
    }
}

keyword_set! {
    /// `print-content-optimize` values.
    ContentOptimize {
        AUTO = 0x01 => "auto",
        GRAPHIC = 0x02 => "graphic",
        PHOTO = 0x04 => "photo",
        TEXT = 0x08 => "text",
        TEXT_AND_GRAPHIC = 0x10 => "text-and-graphic",
    }
}

keyword_set! {
    /// Finishing processes a driver can apply.
    Finishings {
        PUNCH = 0x01 => "punch",
        STAPLE = 0x02 => "staple",
        TRIM = 0x04 => "trim",
    }
}

impl Finishings {
    /// IPP `finishings` enum value for a single member.
    pub fn ipp_enum_value(self) -> i32 {
        match self {
            Self::PUNCH => 5,
            Self::STAPLE => 4,
            Self::TRIM => 60,
            _ => 3,
        }
    }
}

keyword_set! {
    /// `identify-actions` values.
    IdentifyActions {
        DISPLAY = 0x01 => "display",
        FLASH = 0x02 => "flash",
        SOUND = 0x04 => "sound",
        SPEAK = 0x08 => "speak",
    }
}

keyword_set! {
    /// `label-mode` values.
    LabelMode {
        APPLICATOR = 0x0001 => "applicator",
        CUTTER = 0x0002 => "cutter",
        CUTTER_DELAYED = 0x0004 => "cutter-delayed",
        KIOSK = 0x0008 => "kiosk",
        PEEL_OFF = 0x0010 => "peel-off",
        PEEL_OFF_PREPEEL = 0x0020 => "peel-off-prepeel",
        REWIND = 0x0040 => "rewind",
        RFID = 0x0080 => "rfid",
        TEAR_OFF = 0x0100 => "tear-off",
    }
}

keyword_set! {
    /// `media-tracking` values.
    MediaTracking {
        CONTINUOUS = 0x01 => "continuous",
        GAP = 0x02 => "gap",
        MARK = 0x04 => "mark",
        WEB = 0x08 => "web",
    }
}

keyword_set! {
    /// PWG raster `type` values (`pwg-raster-document-type-supported`).
    RasterType {
        ADOBE_RGB_8 = 0x0001 => "adobe-rgb_8",
        ADOBE_RGB_16 = 0x0002 => "adobe-rgb_16",
        BLACK_1 = 0x0004 => "black_1",
        BLACK_8 = 0x0008 => "black_8",
        BLACK_16 = 0x0010 => "black_16",
        CMYK_8 = 0x0020 => "cmyk_8",
        CMYK_16 = 0x0040 => "cmyk_16",
        RGB_8 = 0x0080 => "rgb_8",
        RGB_16 = 0x0100 => "rgb_16",
        SGRAY_8 = 0x0200 => "sgray_8",
        SGRAY_16 = 0x0400 => "sgray_16",
        SRGB_8 = 0x0800 => "srgb_8",
        SRGB_16 = 0x1000 => "srgb_16",
    }
}

keyword_set! {
    /// `print-scaling` values.
    Scaling {
        AUTO = 0x01 => "auto",
        AUTO_FIT = 0x02 => "auto-fit",
        FILL = 0x04 => "fill",
        FIT = 0x08 => "fit",
        NONE = 0x10 => "none",
    }
}

keyword_set! {
    /// `sides` values.
    Sides {
        ONE_SIDED = 0x01 => "one-sided",
        TWO_SIDED_LONG_EDGE = 0x02 => "two-sided-long-edge",
        TWO_SIDED_SHORT_EDGE = 0x04 => "two-sided-short-edge",
    }
}

keyword_set! {
    /// `printer-state-reasons` values (without "none").
    PrinterReasons {
        OTHER = 0x0001 => "other",
        COVER_OPEN = 0x0002 => "cover-open",
        INPUT_TRAY_MISSING = 0x0004 => "input-tray-missing",
        MARKER_SUPPLY_EMPTY = 0x0008 => "marker-supply-empty",
        MARKER_SUPPLY_LOW = 0x0010 => "marker-supply-low",
        MARKER_WASTE_ALMOST_FULL = 0x0020 => "marker-waste-almost-full",
        MARKER_WASTE_FULL = 0x0040 => "marker-waste-full",
        MEDIA_EMPTY = 0x0080 => "media-empty",
        MEDIA_JAM = 0x0100 => "media-jam",
        MEDIA_LOW = 0x0200 => "media-low",
        MEDIA_NEEDED = 0x0400 => "media-needed",
        OFFLINE = 0x0800 => "offline",
        SPOOL_AREA_FULL = 0x1000 => "spool-area-full",
        TONER_EMPTY = 0x2000 => "toner-empty",
        TONER_LOW = 0x4000 => "toner-low",
        DOOR_OPEN = 0x8000 => "door-open",
        IDENTIFY_PRINTER_REQUESTED = 0x10000 => "identify-printer-requested",
    }
}

// ---------------------------------------------------------------------------
// Enumerated options
// ---------------------------------------------------------------------------

/// Page orientation (`orientation-requested`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
    ReverseLandscape,
    ReversePortrait,
    /// Let the rasterizer pick based on aspect ratio.
    #[default]
    None,
}

impl Orientation {
    /// IPP enum value for `orientation-requested`.
    pub fn ipp_enum_value(&self) -> i32 {
        match self {
            Self::Portrait => 3,
            Self::Landscape => 4,
            Self::ReverseLandscape => 5,
            Self::ReversePortrait => 6,
            Self::None => 7,
        }
    }

    pub fn from_ipp_enum(value: i32) -> Option<Self> {
        match value {
            3 => Some(Self::Portrait),
            4 => Some(Self::Landscape),
            5 => Some(Self::ReverseLandscape),
            6 => Some(Self::ReversePortrait),
            7 => Some(Self::None),
            _ => None,
        }
    }
}

/// Print quality (`print-quality`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quality {
    Draft,
    #[default]
    Normal,
    High,
}

impl Quality {
    pub fn ipp_enum_value(&self) -> i32 {
        match self {
            Self::Draft => 3,
            Self::Normal => 4,
            Self::High => 5,
        }
    }

    pub fn from_ipp_enum(value: i32) -> Option<Self> {
        match value {
            3 => Some(Self::Draft),
            4 => Some(Self::Normal),
            5 => Some(Self::High),
            _ => None,
        }
    }
}

/// Duplex handling for the back side of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Duplex {
    /// No duplex support.
    #[default]
    None,
    /// Back side is not rotated.
    Normal,
    /// Back side is flipped.
    Flipped,
    /// Back side is rotated 180 degrees.
    Rotated,
    /// Back side is manually tumbled.
    ManualTumble,
}

impl Duplex {
    /// `pwg-raster-document-sheet-back` keyword, if duplexing is supported.
    pub fn sheet_back_keyword(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Normal => Some("normal"),
            Self::Flipped => Some("flipped"),
            Self::Rotated => Some("rotated"),
            Self::ManualTumble => Some("manual-tumble"),
        }
    }

    /// Numeric duplex mode used in the URF `DM` token.
    pub fn urf_mode(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Normal => 1,
            Self::Flipped => 2,
            Self::Rotated => 3,
            Self::ManualTumble => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Document formats
// ---------------------------------------------------------------------------

/// MIME type for PWG raster streams.
pub const FORMAT_PWG_RASTER: &str = "image/pwg-raster";

/// MIME type for Apple raster (URF) streams.
pub const FORMAT_URF: &str = "image/urf";

/// MIME type for JPEG images.
pub const FORMAT_JPEG: &str = "image/jpeg";

/// MIME type for PNG images.
pub const FORMAT_PNG: &str = "image/png";

/// Generic auto-typed / raw format.
pub const FORMAT_OCTET_STREAM: &str = "application/octet-stream";

/// Infer a document MIME type from a file extension.
pub fn format_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "pwg" | "ras" => Some(FORMAT_PWG_RASTER),
        "urf" => Some(FORMAT_URF),
        "jpg" | "jpeg" => Some(FORMAT_JPEG),
        "png" => Some(FORMAT_PNG),
        _ => None,
    }
}
