// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer registry.
//
// The system owns the configuration, the driver factory, the device scheme
// registry and the printers.  Creating a printer validates its arguments,
// picks a driver (optionally from the device's IEEE-1284 id), derives a
// unique resource path and a stable UUID, and never leaves a half-built
// printer registered.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use druckwerk_core::config::SystemConfig;
use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::types::PrinterId;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::device::DeviceRegistry;
use crate::driver::DriverFactory;
use crate::printer::{Printer, PrinterSetup};
use crate::spool::sanitize_name;

/// Resource path of the single printer of a single-queue system.
pub const SINGLE_QUEUE_RESOURCE: &str = "/ipp/print";

/// Highest numeric suffix tried when resource paths collide.
const MAX_RESOURCE_SUFFIX: u32 = 9;

/// Deterministic printer UUID from the system and printer names.
pub fn printer_uuid(system_name: &str, printer_name: &str) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(system_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(printer_name.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

/// Printers, drivers and devices of one printer application.
pub struct System {
    config: Arc<SystemConfig>,
    factory: Arc<dyn DriverFactory>,
    devices: Arc<DeviceRegistry>,
    printers: RwLock<Vec<Arc<Printer>>>,
    next_printer_id: AtomicU32,
    shutdown: AtomicBool,
}

impl System {
    pub fn new(config: SystemConfig, factory: Arc<dyn DriverFactory>) -> Self {
        info!(name = %config.name, spool = %config.spool_dir.display(), multi_queue = config.multi_queue, "system created");
        Self {
            config: Arc::new(config),
            factory,
            devices: Arc::new(DeviceRegistry::new()),
            printers: RwLock::new(Vec::new()),
            next_printer_id: AtomicU32::new(1),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Device schemes available to printers.
    pub fn devices(&self) -> &Arc<DeviceRegistry> {
        &self.devices
    }

    pub fn printers(&self) -> Vec<Arc<Printer>> {
        self.printers.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn find_printer(&self, id: PrinterId) -> Option<Arc<Printer>> {
        self.printers().into_iter().find(|p| p.id() == id)
    }

    /// Case-insensitive lookup by name.
    pub fn find_printer_by_name(&self, name: &str) -> Option<Arc<Printer>> {
        self.printers().into_iter().find(|p| p.name().eq_ignore_ascii_case(name))
    }

    pub fn find_printer_by_resource(&self, resource: &str) -> Option<Arc<Printer>> {
        self.printers().into_iter().find(|p| p.resource() == resource)
    }

    /// Create and register a printer.
    ///
    /// Without a driver name the driver is chosen by the factory from the
    /// device id, which is read from the device when not supplied.
    #[instrument(skip(self, device_id), fields(system = %self.config.name))]
    pub fn create_printer(
        &self,
        name: &str,
        driver_name: Option<&str>,
        device_uri: &str,
        device_id: Option<&str>,
    ) -> Result<Arc<Printer>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DruckwerkError::InvalidArgument("printer name is empty".into()));
        }
        if device_uri.trim().is_empty() {
            return Err(DruckwerkError::InvalidArgument("device URI is empty".into()));
        }
        if self.shutdown.load(Ordering::Acquire) {
            return Err(DruckwerkError::InvalidArgument("system is shutting down".into()));
        }
        if self.find_printer_by_name(name).is_some() {
            return Err(DruckwerkError::PrinterExists(name.to_string()));
        }

        let mut device_id = device_id.map(str::to_string);
        let driver_name = match driver_name.filter(|d| !d.is_empty()) {
            Some(driver) => driver.to_string(),
            None => self.auto_driver(name, device_uri, &mut device_id)?,
        };

        let (driver_data, driver) = self
            .factory
            .create(&driver_name, device_uri, device_id.as_deref())
            .map_err(|e| match e {
                DruckwerkError::UnknownDriver(_) => e,
                other => {
                    warn!(driver = %driver_name, error = %other, "driver setup failed");
                    DruckwerkError::DriverSetup(driver_name.clone())
                }
            })?;

        let mut printers = self.printers.write().unwrap_or_else(PoisonError::into_inner);
        if printers.iter().any(|p| p.name().eq_ignore_ascii_case(name)) {
            return Err(DruckwerkError::PrinterExists(name.to_string()));
        }
        let resource = self.resource_for(name, &printers)?;

        let id = PrinterId(self.next_printer_id.fetch_add(1, Ordering::AcqRel));
        let printer = Printer::new(PrinterSetup {
            id,
            name: name.to_string(),
            resource,
            uuid: printer_uuid(&self.config.name, name),
            device_uri: device_uri.to_string(),
            device_id,
            driver_name,
            driver,
            driver_data,
            devices: Arc::clone(&self.devices),
            config: Arc::clone(&self.config),
        });
        printers.push(Arc::clone(&printer));
        Ok(printer)
    }

    /// Ask the factory for a driver matching the device id.
    fn auto_driver(&self, name: &str, device_uri: &str, device_id: &mut Option<String>) -> Result<String> {
        if device_id.is_none() {
            let opened = self.devices.open(device_uri, &|message: &str| {
                debug!(uri = device_uri, message, "unable to query device id");
            });
            if let Some(mut device) = opened {
                *device_id = device.get_id();
                if let Err(e) = device.close() {
                    warn!(uri = device_uri, error = %e, "device close failed");
                }
            }
        }
        let id = device_id.as_deref().ok_or(DruckwerkError::NoDriver)?;
        let driver = self
            .factory
            .auto_add(name, device_uri, id)
            .ok_or(DruckwerkError::NoDriver)?;
        info!(printer = name, device_id = id, driver = %driver, "driver chosen from device id");
        Ok(driver)
    }

    fn resource_for(&self, name: &str, printers: &[Arc<Printer>]) -> Result<String> {
        if !self.config.multi_queue {
            if printers.is_empty() {
                return Ok(SINGLE_QUEUE_RESOURCE.to_string());
            }
            return Err(DruckwerkError::PrinterExists(name.to_string()));
        }

        let base = format!("{SINGLE_QUEUE_RESOURCE}/{}", sanitize_name(name));
        let taken = |resource: &str| printers.iter().any(|p| p.resource() == resource);
        if !taken(&base) {
            return Ok(base);
        }
        (2..=MAX_RESOURCE_SUFFIX)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !taken(candidate))
            .ok_or_else(|| DruckwerkError::PrinterExists(name.to_string()))
    }

    /// Unregister and delete a printer.
    pub fn delete_printer(&self, id: PrinterId) -> Result<()> {
        let printer = {
            let mut printers = self.printers.write().unwrap_or_else(PoisonError::into_inner);
            let index = printers
                .iter()
                .position(|p| p.id() == id)
                .ok_or(DruckwerkError::PrinterNotFound(id.0))?;
            printers.remove(index)
        };
        printer.delete();
        Ok(())
    }

    /// Run the cleanup pass of every printer whose cleanup time has come.
    pub fn clean_jobs(&self) {
        let now = Instant::now();
        for printer in self.printers() {
            if printer.clean_after().is_some_and(|due| due <= now) {
                printer.clean_jobs();
            }
        }
    }

    /// Block until every printer's worker threads have exited.
    pub fn wait_for_jobs(&self) {
        for printer in self.printers() {
            printer.wait_for_jobs();
        }
    }

    /// Stop accepting printers and delete every printer.
    #[instrument(skip_all, fields(system = %self.config.name))]
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        let printers = std::mem::take(&mut *self.printers.write().unwrap_or_else(PoisonError::into_inner));
        info!(printers = printers.len(), "shutting down");
        for printer in printers {
            printer.delete();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use druckwerk_core::attributes::AttributeSet;
    use druckwerk_core::types::JobState;

    use super::*;
    use crate::test_support::{Event, TestBed, write_raster};

    #[test]
    fn uuid_is_stable_per_name() {
        let a = printer_uuid("Druckwerk", "office");
        assert_eq!(a, printer_uuid("Druckwerk", "office"));
        assert_ne!(a, printer_uuid("Druckwerk", "lobby"));
        assert_ne!(a, printer_uuid("Other", "office"));
        assert_eq!(a.get_version_num(), 4);
    }

    #[test]
    fn create_assigns_ids_and_resources() {
        let bed = TestBed::new();
        let first = bed.printer("Office Laser");
        let second = bed.printer("Office  Laser");

        assert_eq!(first.id(), PrinterId(1));
        assert_eq!(second.id(), PrinterId(2));
        assert_eq!(first.resource(), "/ipp/print/office_laser");
        assert_eq!(second.resource(), "/ipp/print/office_laser_2");
        assert_eq!(first.uuid(), printer_uuid("Test System", "Office Laser"));
        assert!(
            bed.system
                .find_printer_by_resource("/ipp/print/office_laser_2")
                .is_some_and(|p| p.id() == second.id())
        );
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let bed = TestBed::new();
        bed.printer("office");
        let err = bed
            .system
            .create_printer("OFFICE", Some("test"), "mock://printer", None)
            .expect_err("duplicate");
        assert!(matches!(err, DruckwerkError::PrinterExists(_)));
        assert_eq!(bed.system.printers().len(), 1);
    }

    #[test]
    fn invalid_arguments() {
        let bed = TestBed::new();
        assert!(matches!(
            bed.system.create_printer("  ", Some("test"), "mock://printer", None),
            Err(DruckwerkError::InvalidArgument(_))
        ));
        assert!(matches!(
            bed.system.create_printer("office", Some("test"), "", None),
            Err(DruckwerkError::InvalidArgument(_))
        ));
        assert!(matches!(
            bed.system.create_printer("office", Some("nope"), "mock://printer", None),
            Err(DruckwerkError::UnknownDriver(_))
        ));
        assert!(bed.system.printers().is_empty());
    }

    #[test]
    fn driver_is_chosen_from_device_id() {
        let bed = TestBed::new();
        let printer = bed
            .system
            .create_printer("label", None, "mock://printer", None)
            .expect("auto driver");
        assert_eq!(printer.driver_name(), "test");
        assert_eq!(printer.device_id(), Some("MFG:Acme;MDL:Label 4;CMD:TEST;"));
        assert_eq!(bed.events.take(), vec![Event::Open, Event::Close]);
    }

    #[test]
    fn no_driver_without_a_match() {
        let bed = TestBed::new();
        let err = bed
            .system
            .create_printer("other", None, "mock://printer", Some("MFG:Acme;MDL:Inkjet;"))
            .expect_err("no driver");
        assert!(matches!(err, DruckwerkError::NoDriver));
    }

    #[test]
    fn single_queue_allows_one_printer() {
        let bed = TestBed::with_config(|config| config.multi_queue = false);
        let printer = bed.printer("only");
        assert_eq!(printer.resource(), SINGLE_QUEUE_RESOURCE);
        assert!(
            bed.system
                .create_printer("second", Some("test"), "mock://printer", None)
                .is_err()
        );
    }

    #[test]
    fn clean_jobs_runs_when_due() {
        let bed = TestBed::with_config(|config| config.max_completed_jobs = 0);
        let printer = bed.printer("office");
        let doc = bed.dir.path().join("page.pwg");
        write_raster(&doc, 1, 2, 2);

        let job = printer.submit_file(&doc, None, AttributeSet::new()).expect("submit");
        bed.system.wait_for_jobs();
        assert_eq!(job.state(), JobState::Completed);

        bed.system.clean_jobs();
        assert!(printer.find_job(job.id()).is_none());
    }

    #[test]
    fn delete_and_shutdown() {
        let bed = TestBed::new();
        let office = bed.printer("office");
        bed.printer("lobby");

        bed.system.delete_printer(office.id()).expect("delete");
        assert!(office.is_deleted());
        assert!(bed.system.find_printer(office.id()).is_none());
        assert!(matches!(
            bed.system.delete_printer(office.id()),
            Err(DruckwerkError::PrinterNotFound(1))
        ));

        bed.system.shutdown();
        assert!(bed.system.printers().is_empty());
        assert!(bed.system.is_shutdown());
        assert!(
            bed.system
                .create_printer("late", Some("test"), "mock://printer", None)
                .is_err()
        );
    }
}
