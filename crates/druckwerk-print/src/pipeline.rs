// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster pipeline.
//
// Streams a job's document through the driver callbacks:
//
//   start_job -> { start_page -> write_line(0..height) -> end_page }* -> end_job
//
// Raster documents pass their lines through verbatim.  Images are decoded to
// gray, placed on the page and dithered to 1 bit, once per copy.  Documents
// in the driver's own format skip rasterizing and go to `Driver::print`.
//
// Any callback failure aborts the job.  Once `start_job` has succeeded,
// `end_job` is still called so the driver can release its state, unless
// `end_page` fails while closing a partial page.

use std::fs::File;
use std::io::BufReader;

use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::types::{FORMAT_JPEG, FORMAT_PNG, FORMAT_PWG_RASTER, FORMAT_URF};
use druckwerk_raster::{ImageRasterizer, RasterReader, decode_gray};
use tracing::{debug, info, instrument, warn};

use crate::device::Device;
use crate::driver::Driver;
use crate::job::Job;
use crate::options::PrintOptions;
use crate::printer::Printer;

/// How a document is processed, chosen once per job from its format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PWG raster or Apple URF, already in device page format.
    Raster,
    /// A continuous-tone image that needs placement and dithering.
    Image,
    /// The driver's native format, sent as-is.
    Raw,
}

impl DocumentKind {
    /// `None` for formats nothing can print.
    pub fn classify(format: &str, driver_format: Option<&str>) -> Option<Self> {
        let format = format.trim();
        if format.eq_ignore_ascii_case(FORMAT_PWG_RASTER) || format.eq_ignore_ascii_case(FORMAT_URF) {
            Some(Self::Raster)
        } else if format.eq_ignore_ascii_case(FORMAT_JPEG) || format.eq_ignore_ascii_case(FORMAT_PNG) {
            Some(Self::Image)
        } else if driver_format.is_some_and(|native| native.eq_ignore_ascii_case(format)) {
            Some(Self::Raw)
        } else {
            None
        }
    }
}

fn document_path(job: &Job) -> Result<std::path::PathBuf> {
    job.filename()
        .ok_or_else(|| DruckwerkError::InvalidArgument(format!("job {} has no document", job.id())))
}

/// Call `end_job`, logging a failure.  The job is already failing.
fn finish_failed(driver: &dyn Driver, job: &Job, options: &PrintOptions, device: &mut dyn Device) {
    if !driver.end_job(job, options, device) {
        warn!("end_job failed while aborting");
    }
}

// ---------------------------------------------------------------------------
// Raster documents
// ---------------------------------------------------------------------------

/// Print a PWG raster or URF document.
///
/// A page that cannot be read to its declared height is closed with
/// `end_page` and `end_job` before the job aborts.  If `end_page` fails
/// there, `end_job` is skipped.
#[instrument(skip_all, fields(job_id = %job.id()))]
pub fn run_raster(printer: &Printer, job: &Job, driver: &dyn Driver, device: &mut dyn Device) -> Result<()> {
    let path = document_path(job)?;
    let file = File::open(&path)?;
    let mut reader = RasterReader::new(BufReader::new(file))?;

    let Some(mut header) = reader.next_page()? else {
        return Err(DruckwerkError::Raster("document contains no pages".into()));
    };

    let impressions = header.total_page_count;
    job.set_impressions(impressions);
    let mut options = printer.resolve_options(job, impressions);
    options.header = header.clone();
    info!(kind = ?reader.kind(), impressions, "raster document");

    if !driver.start_job(job, &options, device) {
        return Err(DruckwerkError::DriverCallback("start_job"));
    }

    let mut page = 0u32;
    loop {
        page += 1;
        job.add_impression();
        options.header = header.clone();
        debug!(page, width = header.width, height = header.height, "page");

        if !driver.start_page(job, &options, device, page) {
            finish_failed(driver, job, &options, device);
            return Err(DruckwerkError::DriverCallback("start_page"));
        }

        let mut line = vec![0u8; header.bytes_per_line as usize];
        let mut read_error = None;
        for y in 0..header.height {
            match reader.read_line(&mut line) {
                Ok(true) => {}
                Ok(false) => {
                    read_error = Some(DruckwerkError::Raster(format!(
                        "page {page} ended at line {y} of {}",
                        header.height
                    )));
                    break;
                }
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            }
            if !driver.write_line(job, &options, device, y, &line) {
                finish_failed(driver, job, &options, device);
                return Err(DruckwerkError::DriverCallback("write_line"));
            }
        }

        if !driver.end_page(job, &options, device, page) {
            if read_error.is_none() {
                finish_failed(driver, job, &options, device);
            }
            return Err(DruckwerkError::DriverCallback("end_page"));
        }
        if let Some(e) = read_error {
            warn!(page, error = %e, "unable to read page");
            finish_failed(driver, job, &options, device);
            return Err(e);
        }

        match reader.next_page() {
            Ok(Some(next)) => header = next,
            Ok(None) => break,
            Err(e) => {
                finish_failed(driver, job, &options, device);
                return Err(e);
            }
        }
    }

    if !driver.end_job(job, &options, device) {
        return Err(DruckwerkError::DriverCallback("end_job"));
    }
    info!(pages = page, "raster document printed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Print a JPEG or PNG document, one page per copy.
#[instrument(skip_all, fields(job_id = %job.id()))]
pub fn run_image(printer: &Printer, job: &Job, driver: &dyn Driver, device: &mut dyn Device) -> Result<()> {
    let path = document_path(job)?;
    let image = decode_gray(&path)?;

    let options = printer.resolve_options(job, 1);
    job.set_impressions(options.copies);
    info!(
        width = image.width(),
        height = image.height(),
        copies = options.copies,
        "image document"
    );

    let rasterizer = ImageRasterizer::new(
        &image,
        &options.header,
        &options.media,
        options.orientation,
        options.dither(),
    )?;

    if !driver.start_job(job, &options, device) {
        return Err(DruckwerkError::DriverCallback("start_job"));
    }

    let mut line = vec![0u8; rasterizer.bytes_per_line()];
    for copy in 0..options.copies {
        if !driver.start_page(job, &options, device, 1) {
            finish_failed(driver, job, &options, device);
            return Err(DruckwerkError::DriverCallback("start_page"));
        }
        for y in 0..rasterizer.height() {
            rasterizer.render_line(y, &mut line);
            if !driver.write_line(job, &options, device, y, &line) {
                finish_failed(driver, job, &options, device);
                return Err(DruckwerkError::DriverCallback("write_line"));
            }
        }
        if !driver.end_page(job, &options, device, 1) {
            finish_failed(driver, job, &options, device);
            return Err(DruckwerkError::DriverCallback("end_page"));
        }
        job.add_impression();
        debug!(copy = copy + 1, "copy printed");
    }

    if !driver.end_job(job, &options, device) {
        return Err(DruckwerkError::DriverCallback("end_job"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Raw documents
// ---------------------------------------------------------------------------

/// Hand a document in the driver's native format to `Driver::print`.
#[instrument(skip_all, fields(job_id = %job.id()))]
pub fn run_raw(printer: &Printer, job: &Job, driver: &dyn Driver, device: &mut dyn Device) -> Result<()> {
    document_path(job)?;
    let options = printer.resolve_options(job, 1);
    job.set_impressions(options.copies);

    if !driver.print(job, &options, device) {
        return Err(DruckwerkError::DriverCallback("print"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_formats() {
        assert_eq!(DocumentKind::classify("image/pwg-raster", None), Some(DocumentKind::Raster));
        assert_eq!(DocumentKind::classify("image/urf", None), Some(DocumentKind::Raster));
        assert_eq!(DocumentKind::classify("image/jpeg", None), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::classify("IMAGE/PNG", None), Some(DocumentKind::Image));
        assert_eq!(
            DocumentKind::classify("application/vnd.zebra-zpl", Some("application/vnd.zebra-zpl")),
            Some(DocumentKind::Raw)
        );
        assert_eq!(DocumentKind::classify("application/pdf", Some("application/vnd.zebra-zpl")), None);
        assert_eq!(DocumentKind::classify("text/plain", None), None);
    }

    #[test]
    fn raster_beats_driver_format() {
        assert_eq!(
            DocumentKind::classify("image/pwg-raster", Some("image/pwg-raster")),
            Some(DocumentKind::Raster)
        );
    }
}
