// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recording driver, device and factory shared by the controller tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use druckwerk_core::config::SystemConfig;
use druckwerk_core::driver_data::DriverData;
use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::media::MediaCol;
use druckwerk_core::types::{JobId, RasterType};
use druckwerk_raster::{ColorSpace, PageHeader, RasterWriter};

use crate::device::{Device, DeviceScheme};
use crate::driver::{Driver, DriverFactory};
use crate::job::Job;
use crate::options::PrintOptions;
use crate::printer::Printer;
use crate::system::System;

pub const RAW_FORMAT: &str = "application/vnd.test-raw";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open,
    Close,
    StartJob,
    StartPage(u32),
    WriteLine(u32),
    EndPage(u32),
    EndJob,
    Print,
    Delete,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Event>>>);

impl Recorder {
    pub fn push(&self, event: Event) {
        self.0.lock().expect("recorder").push(event);
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.0.lock().expect("recorder"))
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockDriver {
    events: Recorder,
    /// Callback name and how many calls succeed before it fails.
    fail: Mutex<Option<(&'static str, usize)>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    /// Callback that panics once.
    panic_on: Mutex<Option<&'static str>>,
    line_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    lines: AtomicUsize,
    started: Mutex<Vec<JobId>>,
}

impl MockDriver {
    pub fn new(events: Recorder) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    pub fn fail_on(&self, callback: &'static str, successes: usize) {
        *self.fail.lock().expect("fail") = Some((callback, successes));
    }

    pub fn panic_on(&self, callback: &'static str) {
        *self.panic_on.lock().expect("panic") = Some(callback);
    }

    pub fn set_line_delay(&self, delay: Duration) {
        *self.line_delay.lock().expect("delay") = delay;
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn lines_written(&self) -> usize {
        self.lines.load(Ordering::SeqCst)
    }

    pub fn started_jobs(&self) -> Vec<JobId> {
        self.started.lock().expect("started").clone()
    }

    fn call(&self, callback: &'static str) -> bool {
        let panics = {
            let mut panic_on = self.panic_on.lock().expect("panic");
            if *panic_on == Some(callback) {
                *panic_on = None;
                true
            } else {
                false
            }
        };
        if panics {
            panic!("{callback} blew up");
        }
        let mut calls = self.calls.lock().expect("calls");
        let count = calls.entry(callback).or_insert(0);
        let ok = match *self.fail.lock().expect("fail") {
            Some((name, successes)) if name == callback => *count < successes,
            _ => true,
        };
        *count += 1;
        ok
    }
}

impl Driver for MockDriver {
    fn start_job(&self, job: &Job, _options: &PrintOptions, _device: &mut dyn Device) -> bool {
        self.events.push(Event::StartJob);
        let ok = self.call("start_job");
        if ok {
            self.started.lock().expect("started").push(job.id());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        }
        ok
    }

    fn start_page(&self, _job: &Job, _options: &PrintOptions, _device: &mut dyn Device, page: u32) -> bool {
        self.events.push(Event::StartPage(page));
        self.call("start_page")
    }

    fn write_line(&self, _job: &Job, _options: &PrintOptions, device: &mut dyn Device, y: u32, line: &[u8]) -> bool {
        self.events.push(Event::WriteLine(y));
        let delay = *self.line_delay.lock().expect("delay");
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.lines.fetch_add(1, Ordering::SeqCst);
        self.call("write_line") && device.write(line).is_ok()
    }

    fn end_page(&self, _job: &Job, _options: &PrintOptions, _device: &mut dyn Device, page: u32) -> bool {
        self.events.push(Event::EndPage(page));
        self.call("end_page")
    }

    fn end_job(&self, _job: &Job, _options: &PrintOptions, _device: &mut dyn Device) -> bool {
        self.events.push(Event::EndJob);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.call("end_job")
    }

    fn print(&self, job: &Job, _options: &PrintOptions, device: &mut dyn Device) -> bool {
        self.events.push(Event::Print);
        let Some(path) = job.filename() else {
            return false;
        };
        match std::fs::read(path) {
            Ok(bytes) => device.write(&bytes).is_ok(),
            Err(_) => false,
        }
    }

    fn delete(&self, _printer_name: &str, _data: &DriverData) {
        self.events.push(Event::Delete);
    }
}

pub fn driver_data() -> DriverData {
    let media_default = MediaCol::from_size_name("na_index-4x6_4x6in", 0).expect("4x6");
    DriverData {
        make_and_model: "Test Label 4".into(),
        format: Some(RAW_FORMAT.into()),
        resolutions: vec![(100, 100)],
        resolution_default: (100, 100),
        raster_types: RasterType::BLACK_1,
        media: vec!["na_index-4x6_4x6in".into(), "na_letter_8.5x11in".into()],
        media_default: media_default.clone(),
        media_ready: vec![media_default],
        sources: vec!["main-roll".into()],
        ..Default::default()
    }
}

pub struct MockFactory {
    pub driver: Arc<MockDriver>,
}

impl DriverFactory for MockFactory {
    fn create(
        &self,
        driver_name: &str,
        _device_uri: &str,
        _device_id: Option<&str>,
    ) -> Result<(DriverData, Arc<dyn Driver>)> {
        match driver_name {
            "test" => Ok((driver_data(), self.driver.clone() as Arc<dyn Driver>)),
            other => Err(DruckwerkError::UnknownDriver(other.to_string())),
        }
    }

    fn auto_add(&self, _printer_name: &str, _device_uri: &str, device_id: &str) -> Option<String> {
        device_id.contains("MDL:Label").then(|| "test".to_string())
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

pub struct MockDevice {
    events: Recorder,
    bytes: Arc<AtomicUsize>,
}

impl Device for MockDevice {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.bytes.fetch_add(data.len(), Ordering::SeqCst);
        Ok(())
    }

    fn get_id(&mut self) -> Option<String> {
        Some("MFG:Acme;MDL:Label 4;CMD:TEST;".into())
    }

    fn close(&mut self) -> Result<()> {
        self.events.push(Event::Close);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockScheme {
    events: Recorder,
    opens: AtomicU32,
    fail_next: AtomicU32,
    pub bytes: Arc<AtomicUsize>,
}

impl MockScheme {
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Make the next `count` opens fail.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }
}

impl DeviceScheme for MockScheme {
    fn open(&self, _uri: &str, on_error: &dyn Fn(&str)) -> Option<Box<dyn Device>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            on_error("connection refused");
            return None;
        }
        self.events.push(Event::Open);
        Some(Box::new(MockDevice {
            events: self.events.clone(),
            bytes: Arc::clone(&self.bytes),
        }))
    }
}

// ---------------------------------------------------------------------------
// Test bed
// ---------------------------------------------------------------------------

pub struct TestBed {
    pub dir: tempfile::TempDir,
    pub events: Recorder,
    pub driver: Arc<MockDriver>,
    pub scheme: Arc<MockScheme>,
    pub system: System,
}

impl TestBed {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut SystemConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = SystemConfig {
            name: "Test System".into(),
            spool_dir: dir.path().join("spool"),
            device_retry_ms: 5,
            clean_delay_secs: 0,
            ..Default::default()
        };
        adjust(&mut config);

        let events = Recorder::default();
        let driver = Arc::new(MockDriver::new(events.clone()));
        let scheme = Arc::new(MockScheme {
            events: events.clone(),
            ..Default::default()
        });
        let factory = Arc::new(MockFactory {
            driver: Arc::clone(&driver),
        });
        let system = System::new(config, factory);
        system.devices().register("mock", scheme.clone());

        Self {
            dir,
            events,
            driver,
            scheme,
            system,
        }
    }

    pub fn printer(&self, name: &str) -> Arc<Printer> {
        self.system
            .create_printer(name, Some("test"), "mock://printer", None)
            .expect("create printer")
    }
}

/// Write a PWG raster document of `pages` pages, each declaring `lines`
/// lines.  The last page stops after `written` lines.
pub fn write_raster(path: &Path, pages: u32, lines: u32, written: u32) {
    let header = PageHeader {
        page_size_name: "custom_test".into(),
        page_size: (12, lines * 72 / 100),
        resolution: (100, 100),
        width: 16,
        height: lines,
        bits_per_color: 1,
        bits_per_pixel: 1,
        bytes_per_line: 2,
        color_space: ColorSpace::Black,
        num_colors: 1,
        num_copies: 1,
        total_page_count: pages,
        ..Default::default()
    };

    let mut bytes = Vec::new();
    {
        let mut writer = RasterWriter::new(&mut bytes).expect("writer");
        for page in 1..=pages {
            writer.start_page(&header).expect("page");
            let count = if page == pages { written } else { lines };
            for y in 0..count {
                writer.write_line(&[y as u8, 0xF0]).expect("line");
            }
        }
        if written == lines {
            writer.finish().expect("finish");
        }
    }
    std::fs::write(path, bytes).expect("write raster");
}

/// Spin until `condition` holds, failing after five seconds.
pub fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached");
        std::thread::sleep(Duration::from_millis(1));
    }
}
