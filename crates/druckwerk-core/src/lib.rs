// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckwerk: core types, attribute model, presets, and error definitions
// shared across all crates.

pub mod attributes;
pub mod config;
pub mod driver_data;
pub mod error;
pub mod media;
pub mod presets;
pub mod types;

pub use attributes::{AttrValue, Attribute, AttributeSet};
pub use config::SystemConfig;
pub use driver_data::DriverData;
pub use error::{DruckwerkError, Result};
pub use media::MediaCol;
pub use presets::Preset;
pub use types::*;
