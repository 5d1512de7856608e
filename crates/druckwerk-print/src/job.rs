// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print jobs and the job lifecycle controller.
//
// A job's immutable identity (id, owner, submitted attributes, format) is
// plain data; its mutable fields sit behind the job's own lock.  Code that
// needs both the printer and job locks takes the printer lock first.
//
// `process` runs on the job's worker thread: it classifies the document,
// acquires the printer's device, drives the pipeline and hands the job back
// to the printer for completion bookkeeping.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use chrono::{DateTime, Utc};
use druckwerk_core::attributes::AttributeSet;
use druckwerk_core::types::{JobId, JobState, PrinterId};
use serde::Serialize;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::pipeline::{self, DocumentKind};
use crate::printer::Printer;

/// Mutable job fields, guarded by the job lock.
#[derive(Debug)]
pub(crate) struct JobFields {
    pub state: JobState,
    pub message: Option<String>,
    pub processing: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub impressions: u32,
    pub impcompleted: u32,
    /// Spool file holding the document.
    pub filename: Option<PathBuf>,
    /// The document is still being received.
    pub receiving: bool,
}

/// One print job.
pub struct Job {
    id: JobId,
    uuid: Uuid,
    printer: Weak<Printer>,
    printer_id: PrinterId,
    printer_name: String,
    name: String,
    attrs: AttributeSet,
    format: String,
    created: DateTime<Utc>,
    cancel: Arc<AtomicBool>,
    fields: RwLock<JobFields>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("printer", &self.printer_name)
            .field("name", &self.name)
            .field("format", &self.format)
            .field("state", &self.state())
            .finish()
    }
}

/// Serializable snapshot of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub id: u32,
    pub uuid: Uuid,
    pub printer: String,
    pub name: String,
    pub format: String,
    pub state: JobState,
    pub state_keyword: &'static str,
    pub message: Option<String>,
    pub created: DateTime<Utc>,
    pub processing: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub impressions: u32,
    pub impressions_completed: u32,
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        printer: &Arc<Printer>,
        name: String,
        attrs: AttributeSet,
        format: String,
    ) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            printer: Arc::downgrade(printer),
            printer_id: printer.id(),
            printer_name: printer.name().to_string(),
            name,
            attrs,
            format,
            created: Utc::now(),
            cancel: Arc::new(AtomicBool::new(false)),
            fields: RwLock::new(JobFields {
                state: JobState::Held,
                message: None,
                processing: None,
                completed: None,
                impressions: 0,
                impcompleted: 0,
                filename: None,
                receiving: true,
            }),
        }
    }

    // -- Identity --

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Owning printer, if it still exists.
    pub fn printer(&self) -> Option<Arc<Printer>> {
        self.printer.upgrade()
    }

    pub fn printer_id(&self) -> PrinterId {
        self.printer_id
    }

    pub fn printer_name(&self) -> &str {
        &self.printer_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes submitted with the job.
    pub fn attributes(&self) -> &AttributeSet {
        &self.attrs
    }

    /// Document MIME type.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    // -- Mutable fields --

    fn read(&self) -> std::sync::RwLockReadGuard<'_, JobFields> {
        self.fields.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with the job lock held for writing.
    pub(crate) fn update<T>(&self, f: impl FnOnce(&mut JobFields) -> T) -> T {
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut fields)
    }

    pub fn state(&self) -> JobState {
        self.read().state
    }

    pub fn message(&self) -> Option<String> {
        self.read().message.clone()
    }

    /// Set the diagnostic message shown with the job state.
    pub fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|f| f.message = Some(message));
    }

    pub fn processing_time(&self) -> Option<DateTime<Utc>> {
        self.read().processing
    }

    pub fn completed_time(&self) -> Option<DateTime<Utc>> {
        self.read().completed
    }

    pub fn impressions(&self) -> u32 {
        self.read().impressions
    }

    pub fn impressions_completed(&self) -> u32 {
        self.read().impcompleted
    }

    /// Drivers that count impressions themselves (raw jobs) report here.
    pub fn set_impressions_completed(&self, count: u32) {
        self.update(|f| f.impcompleted = count);
    }

    pub(crate) fn add_impression(&self) {
        self.update(|f| f.impcompleted += 1);
    }

    pub(crate) fn set_impressions(&self, count: u32) {
        self.update(|f| f.impressions = count);
    }

    pub fn filename(&self) -> Option<PathBuf> {
        self.read().filename.clone()
    }

    pub fn is_receiving(&self) -> bool {
        self.read().receiving
    }

    /// Cancellation has been requested.  Observed when the job completes.
    pub fn is_canceled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn summary(&self) -> JobSummary {
        let fields = self.read();
        JobSummary {
            id: self.id.0,
            uuid: self.uuid,
            printer: self.printer_name.clone(),
            name: self.name.clone(),
            format: self.format.clone(),
            state: fields.state,
            state_keyword: fields.state.keyword(),
            message: fields.message.clone(),
            created: self.created,
            processing: fields.processing,
            completed: fields.completed,
            impressions: fields.impressions,
            impressions_completed: fields.impcompleted,
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Process a job on its worker thread.  Never panics across the worker
/// boundary on job errors; they end in the Aborted state.
pub(crate) fn process(printer: Arc<Printer>, job: Arc<Job>) {
    let span = info_span!("job", printer = %printer.name(), job_id = %job.id());
    let _enter = span.enter();

    let driver_format = printer.driver_format();
    let Some(kind) = DocumentKind::classify(job.format(), driver_format.as_deref()) else {
        let message = format!("Unable to process job with format '{}'.", job.format());
        error!(format = %job.format(), "{message}");
        job.update(|f| {
            f.message = Some(message);
            f.state = JobState::Aborted;
        });
        printer.finish_job(&job, None);
        return;
    };
    info!(format = %job.format(), ?kind, "processing job");

    let Some(mut device) = printer.acquire_device(&job) else {
        if !job.is_canceled() {
            warn!("no device, aborting job");
            job.update(|f| {
                f.message = Some("Printer was deleted before the device opened.".into());
                f.state = JobState::Aborted;
            });
        }
        printer.finish_job(&job, None);
        return;
    };
    printer.mark_processing();

    let driver = printer.driver();
    // A panicking driver callback or decoder still retires the job and
    // returns the device.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match kind {
        DocumentKind::Raster => pipeline::run_raster(&printer, &job, driver.as_ref(), device.as_mut()),
        DocumentKind::Image => pipeline::run_image(&printer, &job, driver.as_ref(), device.as_mut()),
        DocumentKind::Raw => pipeline::run_raw(&printer, &job, driver.as_ref(), device.as_mut()),
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(error = %e, "job aborted");
            job.update(|f| {
                f.message.get_or_insert_with(|| e.to_string());
                f.state = JobState::Aborted;
            });
        }
        Err(payload) => {
            let reason = panic_reason(payload.as_ref());
            error!(reason, "job processing panicked");
            job.update(|f| {
                f.message = Some(format!("Job processing failed: {reason}"));
                f.state = JobState::Aborted;
            });
        }
    }
    if let Err(e) = device.flush() {
        warn!(error = %e, "device flush failed");
    }

    printer.finish_job(&job, Some(device));
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(reason) = payload.downcast_ref::<&'static str>() {
        reason
    } else if let Some(reason) = payload.downcast_ref::<String>() {
        reason
    } else {
        "unknown panic"
    }
}
