// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer driver interface.
//
// A driver turns resolved options and raster lines into device bytes.  The
// raster callbacks follow the job/page/line protocol; `print` handles the
// driver's native raw format without rasterizing.  Every callback returns
// `false` to abort the job.

use std::path::PathBuf;
use std::sync::Arc;

use druckwerk_core::driver_data::DriverData;
use druckwerk_core::error::Result;
use druckwerk_core::types::IdentifyActions;

use crate::device::Device;
use crate::job::Job;
use crate::options::PrintOptions;
use crate::printer::Printer;

/// Raster and raw output callbacks for one printer.
pub trait Driver: Send + Sync {
    fn start_job(&self, job: &Job, options: &PrintOptions, device: &mut dyn Device) -> bool;

    /// Begin page `page` (1-based).
    fn start_page(&self, job: &Job, options: &PrintOptions, device: &mut dyn Device, page: u32) -> bool;

    /// Emit device line `y` (0-based) of the current page.
    fn write_line(
        &self,
        job: &Job,
        options: &PrintOptions,
        device: &mut dyn Device,
        y: u32,
        line: &[u8],
    ) -> bool;

    fn end_page(&self, job: &Job, options: &PrintOptions, device: &mut dyn Device, page: u32) -> bool;

    fn end_job(&self, job: &Job, options: &PrintOptions, device: &mut dyn Device) -> bool;

    /// Send a document in the driver's native format straight to the device.
    fn print(&self, _job: &Job, _options: &PrintOptions, _device: &mut dyn Device) -> bool {
        false
    }

    /// Release driver resources when the printer is deleted.
    fn delete(&self, _printer_name: &str, _data: &DriverData) {}

    /// Make the printer identify itself.
    fn identify(&self, _printer: &Printer, _actions: IdentifyActions, _message: Option<&str>) {}

    /// Path of a test page document, if the driver provides one.
    fn testpage(&self, _printer: &Printer) -> Option<PathBuf> {
        None
    }
}

/// Creates drivers by name.
pub trait DriverFactory: Send + Sync {
    /// Fill in driver data and return the callbacks for `driver_name`.
    fn create(
        &self,
        driver_name: &str,
        device_uri: &str,
        device_id: Option<&str>,
    ) -> Result<(DriverData, Arc<dyn Driver>)>;

    /// Pick a driver name from a device's IEEE-1284 id.
    fn auto_add(&self, _printer_name: &str, _device_uri: &str, _device_id: &str) -> Option<String> {
        None
    }
}

/// Look up a key in an IEEE-1284 device id (`MFG:Acme;MDL:Label 2;`).
///
/// Keys are matched case-insensitively; the long and short forms of the
/// manufacturer, model and command-set keys are interchangeable.
pub fn device_id_value<'a>(device_id: &'a str, key: &str) -> Option<&'a str> {
    let aliases: &[&str] = match key.to_ascii_uppercase().as_str() {
        "MFG" | "MANUFACTURER" => &["MFG", "MANUFACTURER"],
        "MDL" | "MODEL" => &["MDL", "MODEL"],
        "CMD" | "COMMAND SET" => &["CMD", "COMMAND SET"],
        _ => return find_key(device_id, key),
    };
    aliases.iter().find_map(|k| find_key(device_id, k))
}

fn find_key<'a>(device_id: &'a str, key: &str) -> Option<&'a str> {
    device_id
        .split(';')
        .filter_map(|pair| pair.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
        .map(|(_, v)| v.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "MANUFACTURER:Acme;MDL:Label 2;CMD:PBM,PWG;";

    #[test]
    fn device_id_lookup_accepts_aliases() {
        assert_eq!(device_id_value(ID, "MFG"), Some("Acme"));
        assert_eq!(device_id_value(ID, "model"), Some("Label 2"));
        assert_eq!(device_id_value(ID, "COMMAND SET"), Some("PBM,PWG"));
        assert_eq!(device_id_value(ID, "SN"), None);
    }
}
