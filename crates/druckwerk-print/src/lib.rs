// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckwerk print: printers, jobs and the job pipeline.
//
// Provides the device layer, the driver interface, capability synthesis,
// option resolution, the raster pipeline, the job lifecycle and printer
// controllers, and the printer registry.

pub mod capabilities;
pub mod device;
pub mod driver;
pub mod job;
pub mod options;
pub mod pipeline;
pub mod printer;
pub mod retry;
pub mod spool;
pub mod system;

#[cfg(test)]
pub(crate) mod test_support;

pub use capabilities::synthesize;
pub use device::{Device, DeviceRegistry, DeviceScheme, FileDevice, FileScheme};
pub use driver::{Driver, DriverFactory, device_id_value};
pub use job::{Job, JobSummary};
pub use options::{PrintOptions, Tiers, resolve};
pub use pipeline::DocumentKind;
pub use printer::{ListenerGuard, Printer, WhichJobs};
pub use system::{System, printer_uuid};
