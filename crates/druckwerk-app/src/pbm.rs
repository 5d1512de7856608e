// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sample driver writing portable bitmaps (PBM, P4).
//
// Each page becomes one binary PBM image; multi-page jobs are concatenated
// images, which PBM readers accept.  PBM files submitted directly are the
// driver's raw format and are copied to the device unchanged.

use std::io::Read;
use std::sync::Arc;

use druckwerk_core::driver_data::DriverData;
use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::media::MediaCol;
use druckwerk_core::types::{ColorMode, IdentifyActions, RasterType};
use druckwerk_print::device::Device;
use druckwerk_print::driver::{Driver, DriverFactory, device_id_value};
use druckwerk_print::job::Job;
use druckwerk_print::options::PrintOptions;
use druckwerk_print::printer::Printer;
use tracing::{debug, info, warn};

/// MIME type of PBM documents.
pub const PBM_FORMAT: &str = "image/x-portable-bitmap";

/// Name the factory answers to.
pub const PBM_DRIVER: &str = "pbm";

/// 1/4 inch in hundredths of millimeters.
const MARGIN: i32 = 635;

pub struct PbmDriver;

impl Driver for PbmDriver {
    fn start_job(&self, job: &Job, options: &PrintOptions, _device: &mut dyn Device) -> bool {
        if options.header.bits_per_pixel != 1 {
            warn!(
                job_id = %job.id(),
                bits_per_pixel = options.header.bits_per_pixel,
                "PBM output needs 1-bit raster"
            );
            return false;
        }
        debug!(job_id = %job.id(), copies = options.copies, "PBM job started");
        true
    }

    fn start_page(&self, _job: &Job, options: &PrintOptions, device: &mut dyn Device, page: u32) -> bool {
        let header = format!("P4\n{} {}\n", options.header.width, options.header.height);
        debug!(page, width = options.header.width, height = options.header.height, "PBM page");
        device.write(header.as_bytes()).is_ok()
    }

    fn write_line(&self, _job: &Job, _options: &PrintOptions, device: &mut dyn Device, _y: u32, line: &[u8]) -> bool {
        device.write(line).is_ok()
    }

    fn end_page(&self, _job: &Job, _options: &PrintOptions, device: &mut dyn Device, _page: u32) -> bool {
        device.flush().is_ok()
    }

    fn end_job(&self, job: &Job, _options: &PrintOptions, device: &mut dyn Device) -> bool {
        debug!(job_id = %job.id(), pages = job.impressions_completed(), "PBM job finished");
        device.flush().is_ok()
    }

    fn print(&self, job: &Job, _options: &PrintOptions, device: &mut dyn Device) -> bool {
        let Some(path) = job.filename() else {
            return false;
        };
        let copied = std::fs::File::open(&path).map_err(DruckwerkError::from).and_then(|mut file| {
            let mut buf = [0u8; 8192];
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    return Ok(());
                }
                device.write(&buf[..n])?;
            }
        });
        match copied {
            Ok(()) => {
                job.set_impressions_completed(1);
                true
            }
            Err(e) => {
                warn!(job_id = %job.id(), error = %e, "raw copy failed");
                job.set_message(format!("Unable to copy document: {e}"));
                false
            }
        }
    }

    fn identify(&self, printer: &Printer, actions: IdentifyActions, message: Option<&str>) {
        info!(printer = %printer.name(), actions = ?actions.keywords(), message, "identify requested");
    }
}

/// The PBM driver's capabilities.
pub fn driver_data() -> DriverData {
    let media: Vec<String> = ["na_letter_8.5x11in", "iso_a4_210x297mm", "na_index-4x6_4x6in"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let letter = MediaCol::from_size_name("na_letter_8.5x11in", MARGIN)
        .map(|mut m| {
            m.source = "main".into();
            m
        })
        .unwrap_or_default();

    DriverData {
        make_and_model: "Druckwerk PBM Printer".into(),
        format: Some(PBM_FORMAT.into()),
        ppm: 10,
        resolutions: vec![(150, 150), (300, 300)],
        resolution_default: (300, 300),
        raster_types: RasterType::BLACK_1,
        color_supported: ColorMode::AUTO | ColorMode::MONOCHROME | ColorMode::BI_LEVEL,
        color_default: ColorMode::MONOCHROME,
        identify_supported: IdentifyActions::DISPLAY,
        identify_default: IdentifyActions::DISPLAY,
        bottom_top: MARGIN,
        left_right: MARGIN,
        media,
        media_default: letter.clone(),
        media_ready: vec![letter],
        sources: vec!["main".into()],
        types: vec!["stationery".into()],
        ..Default::default()
    }
}

/// Creates PBM drivers.
pub struct PbmDriverFactory;

impl DriverFactory for PbmDriverFactory {
    fn create(
        &self,
        driver_name: &str,
        _device_uri: &str,
        _device_id: Option<&str>,
    ) -> Result<(DriverData, Arc<dyn Driver>)> {
        if driver_name != PBM_DRIVER {
            return Err(DruckwerkError::UnknownDriver(driver_name.to_string()));
        }
        Ok((driver_data(), Arc::new(PbmDriver)))
    }

    fn auto_add(&self, _printer_name: &str, _device_uri: &str, device_id: &str) -> Option<String> {
        let commands = device_id_value(device_id, "CMD")?;
        commands
            .split(',')
            .any(|c| c.trim().eq_ignore_ascii_case("PBM"))
            .then(|| PBM_DRIVER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use druckwerk_core::attributes::AttributeSet;
    use druckwerk_core::config::SystemConfig;
    use druckwerk_core::types::JobState;
    use druckwerk_print::system::System;
    use druckwerk_raster::{ColorSpace, PageHeader, RasterWriter};

    use super::*;

    fn system(dir: &std::path::Path) -> System {
        let config = SystemConfig {
            spool_dir: dir.join("spool"),
            device_retry_ms: 10,
            ..Default::default()
        };
        System::new(config, Arc::new(PbmDriverFactory))
    }

    #[test]
    fn raster_job_becomes_a_pbm_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("out.pbm");
        let system = system(dir.path());
        let printer = system
            .create_printer("pbm", Some(PBM_DRIVER), &format!("file://{}", out.display()), None)
            .expect("printer");

        let header = PageHeader {
            resolution: (300, 300),
            width: 16,
            height: 4,
            bits_per_color: 1,
            bits_per_pixel: 1,
            bytes_per_line: 2,
            color_space: ColorSpace::Black,
            num_colors: 1,
            total_page_count: 1,
            ..Default::default()
        };
        let mut bytes = Vec::new();
        let mut writer = RasterWriter::new(&mut bytes).expect("writer");
        writer.start_page(&header).expect("page");
        for y in 0..4u8 {
            writer.write_line(&[0xFF, y]).expect("line");
        }
        writer.finish().expect("finish");
        let doc = dir.path().join("page.pwg");
        std::fs::write(&doc, &bytes).expect("write");

        let job = printer.submit_file(&doc, None, AttributeSet::new()).expect("submit");
        printer.wait_for_jobs();

        assert_eq!(job.state(), JobState::Completed);
        let written = std::fs::read(&out).expect("output");
        let mut expected = b"P4\n16 4\n".to_vec();
        for y in 0..4u8 {
            expected.extend_from_slice(&[0xFF, y]);
        }
        assert_eq!(written, expected);
    }

    #[test]
    fn pbm_documents_are_copied_raw() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("raw.pbm");
        let system = system(dir.path());
        let printer = system
            .create_printer("pbm", Some(PBM_DRIVER), &format!("file://{}", out.display()), None)
            .expect("printer");

        let doc = dir.path().join("in.pbm");
        std::fs::write(&doc, b"P4\n8 1\n\x81").expect("write");
        let job = printer
            .submit_file(&doc, Some(PBM_FORMAT), AttributeSet::new())
            .expect("submit");
        printer.wait_for_jobs();

        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(job.impressions_completed(), 1);
        assert_eq!(std::fs::read(&out).expect("output"), b"P4\n8 1\n\x81");
    }

    #[test]
    fn auto_add_matches_command_set() {
        let factory = PbmDriverFactory;
        assert_eq!(
            factory.auto_add("p", "file:///tmp/x", "MFG:Acme;MDL:Bitmapper;CMD:PCL,PBM;"),
            Some(PBM_DRIVER.to_string())
        );
        assert_eq!(factory.auto_add("p", "file:///tmp/x", "MFG:Acme;CMD:PCL;"), None);
        assert!(matches!(
            factory.create("zpl", "file:///tmp/x", None),
            Err(DruckwerkError::UnknownDriver(_))
        ));
    }
}
