// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer controller.
//
// A printer owns its job collections, its device handle, state and reasons,
// defaults and presets.  All of it sits behind one read/write lock.  The lock
// is held only for short state changes: device I/O and document processing
// happen with no printer lock held.
//
// Job collections:
//   all_jobs        every job until it is deleted
//   active_jobs     held, pending and processing jobs
//   completed_jobs  canceled, aborted and completed jobs
//
// A job is in exactly one of active/completed.  Jobs are dispatched one at a
// time per printer in job id order; each runs on its own worker thread.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use druckwerk_core::attributes::{AttrValue, AttributeSet};
use druckwerk_core::config::SystemConfig;
use druckwerk_core::driver_data::DriverData;
use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::presets::{Preset, parse_presets};
use druckwerk_core::types::{
    FORMAT_JPEG, FORMAT_OCTET_STREAM, FORMAT_PNG, FORMAT_PWG_RASTER, FORMAT_URF, IdentifyActions, JobId,
    JobState, PrinterId, PrinterReasons, PrinterState, format_from_extension,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::capabilities;
use crate::device::{Device, DeviceRegistry};
use crate::driver::Driver;
use crate::job::{self, Job};
use crate::options::{self, PrintOptions, Tiers};
use crate::retry::{Attempt, RetryLoop};
use crate::spool::{self, OpenMode};

/// Poll interval while another job holds the device.
const DEVICE_BUSY_POLL: Duration = Duration::from_millis(10);

/// Which job collection to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhichJobs {
    All,
    Active,
    Completed,
}

/// Everything needed to construct a printer.
pub(crate) struct PrinterSetup {
    pub id: PrinterId,
    pub name: String,
    pub resource: String,
    pub uuid: Uuid,
    pub device_uri: String,
    pub device_id: Option<String>,
    pub driver_name: String,
    pub driver: Arc<dyn Driver>,
    pub driver_data: DriverData,
    pub devices: Arc<DeviceRegistry>,
    pub config: Arc<SystemConfig>,
}

struct PrinterInner {
    state: PrinterState,
    reasons: PrinterReasons,
    state_time: DateTime<Utc>,
    is_accepting: bool,
    paused: bool,
    driver_data: DriverData,
    /// Synthesized capabilities plus driver extras.  Never edited directly.
    driver_attrs: AttributeSet,
    /// Printer defaults and static attributes.
    attrs: AttributeSet,
    device: Option<Box<dyn Device>>,
    /// A job has taken the device out of `device`.
    device_in_use: bool,
    all_jobs: BTreeMap<JobId, Arc<Job>>,
    active_jobs: BTreeMap<JobId, Arc<Job>>,
    completed_jobs: BTreeMap<JobId, Arc<Job>>,
    processing_job: Option<JobId>,
    next_job_id: u32,
    /// 0 means unlimited.
    max_active_jobs: usize,
    max_completed_jobs: usize,
    presets: Vec<Preset>,
    clean_after: Option<Instant>,
}

impl PrinterInner {
    fn set_state(&mut self, state: PrinterState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "printer state");
            self.state = state;
            self.state_time = Utc::now();
        }
    }

    /// Stamp a terminal state and move the job to the completed collection.
    fn retire(&mut self, job: &Job, state: JobState) {
        job.update(|f| {
            f.state = state;
            f.completed = Some(Utc::now());
        });
        if let Some(job) = self.active_jobs.remove(&job.id()) {
            self.completed_jobs.insert(job.id(), job);
        }
    }

    fn schedule_clean(&mut self, delay: Duration) {
        if self.clean_after.is_none() {
            self.clean_after = Some(Instant::now() + delay);
        }
    }
}

/// A logical printer bound to one device and one driver.
pub struct Printer {
    id: PrinterId,
    name: String,
    resource: String,
    uuid: Uuid,
    device_uri: String,
    device_id: Option<String>,
    driver_name: String,
    driver: Arc<dyn Driver>,
    devices: Arc<DeviceRegistry>,
    config: Arc<SystemConfig>,
    inner: RwLock<PrinterInner>,
    listeners: AtomicUsize,
    deleted: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Printer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Printer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("resource", &self.resource)
            .field("device_uri", &self.device_uri)
            .field("driver", &self.driver_name)
            .finish()
    }
}

impl Printer {
    pub(crate) fn new(setup: PrinterSetup) -> Arc<Self> {
        let PrinterSetup {
            id,
            name,
            resource,
            uuid,
            device_uri,
            device_id,
            driver_name,
            driver,
            driver_data,
            devices,
            config,
        } = setup;

        let mut driver_attrs = capabilities::synthesize(&driver_data);
        driver_attrs.merge(&driver_data.extra_attrs);

        let presets = driver_data.presets.clone();
        let mut attrs = static_attributes(id, &name, &uuid);
        attrs.add_values("job-presets-supported", preset_summaries(&presets, &driver_data.bins));

        let inner = PrinterInner {
            state: PrinterState::Idle,
            reasons: PrinterReasons::EMPTY,
            state_time: Utc::now(),
            is_accepting: true,
            paused: false,
            driver_data,
            driver_attrs,
            attrs,
            device: None,
            device_in_use: false,
            all_jobs: BTreeMap::new(),
            active_jobs: BTreeMap::new(),
            completed_jobs: BTreeMap::new(),
            processing_job: None,
            next_job_id: 1,
            max_active_jobs: if config.multi_queue { 0 } else { 1 },
            max_completed_jobs: config.max_completed_jobs,
            presets,
            clean_after: None,
        };

        info!(printer = %name, id = %id, %resource, uri = %device_uri, driver = %driver_name, "printer created");
        Arc::new(Self {
            id,
            name,
            resource,
            uuid,
            device_uri,
            device_id,
            driver_name,
            driver,
            devices,
            config,
            inner: RwLock::new(inner),
            listeners: AtomicUsize::new(0),
            deleted: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, PrinterInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PrinterInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Identity and configuration
    // -----------------------------------------------------------------------

    pub fn id(&self) -> PrinterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource path, e.g. `/ipp/print/office`.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn device_uri(&self) -> &str {
        &self.device_uri
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub(crate) fn driver(&self) -> Arc<dyn Driver> {
        Arc::clone(&self.driver)
    }

    pub fn driver_data(&self) -> DriverData {
        self.read().driver_data.clone()
    }

    /// Native raw format of the driver, if any.
    pub fn driver_format(&self) -> Option<String> {
        self.read().driver_data.format.clone()
    }

    /// Replace the driver data and resynthesize the capability attributes.
    #[instrument(skip_all, fields(printer = %self.name))]
    pub fn set_driver_data(&self, data: DriverData) {
        let mut driver_attrs = capabilities::synthesize(&data);
        driver_attrs.merge(&data.extra_attrs);

        let mut inner = self.write();
        inner.driver_data = data;
        inner.driver_attrs = driver_attrs;
        debug!(attributes = inner.driver_attrs.len(), "driver attributes updated");
    }

    /// Synthesized capability attributes.
    pub fn driver_attributes(&self) -> AttributeSet {
        self.read().driver_attrs.clone()
    }

    /// Printer defaults and static attributes.
    pub fn attributes(&self) -> AttributeSet {
        self.read().attrs.clone()
    }

    /// Set a printer default such as `print-darkness-default`.
    pub fn set_default(&self, name: &str, value: AttrValue) {
        self.write().attrs.add(name, value);
    }

    /// Resolve the options for `job` from the job, printer and driver tiers.
    pub fn resolve_options(&self, job: &Job, num_pages: u32) -> PrintOptions {
        let inner = self.read();
        let tiers = Tiers {
            job: job.attributes(),
            printer: &inner.attrs,
            driver: &inner.driver_attrs,
        };
        options::resolve(tiers, &inner.driver_data, num_pages)
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub fn state(&self) -> PrinterState {
        self.read().state
    }

    pub fn state_time(&self) -> DateTime<Utc> {
        self.read().state_time
    }

    pub fn reasons(&self) -> PrinterReasons {
        self.read().reasons
    }

    /// `printer-state-reasons` keywords, `none` when empty.
    pub fn reason_keywords(&self) -> Vec<&'static str> {
        let inner = self.read();
        let mut keywords = inner.reasons.keywords();
        if inner.paused {
            keywords.push("paused");
        }
        if keywords.is_empty() {
            keywords.push("none");
        }
        keywords
    }

    /// Add and remove state reasons.
    pub fn set_reasons(&self, add: PrinterReasons, remove: PrinterReasons) {
        let mut inner = self.write();
        inner.reasons.remove(remove);
        inner.reasons.insert(add);
    }

    pub fn is_accepting(&self) -> bool {
        self.read().is_accepting
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.write().is_accepting = accepting;
        info!(printer = %self.name, accepting, "printer accepting jobs changed");
    }

    pub fn is_paused(&self) -> bool {
        self.read().paused
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_processing(&self) {
        self.write().set_state(PrinterState::Processing);
    }

    /// Stop dispatching jobs.  A job already processing runs to completion.
    pub fn pause(&self) {
        let mut inner = self.write();
        inner.paused = true;
        if inner.processing_job.is_none() {
            inner.set_state(PrinterState::Stopped);
        }
        info!(printer = %self.name, "printer paused");
    }

    /// Resume dispatching jobs.
    pub fn resume(self: &Arc<Self>) {
        {
            let mut inner = self.write();
            inner.paused = false;
            if inner.processing_job.is_none() {
                inner.set_state(PrinterState::Idle);
            }
        }
        info!(printer = %self.name, "printer resumed");
        self.check_jobs();
    }

    // -----------------------------------------------------------------------
    // Jobs
    // -----------------------------------------------------------------------

    /// Jobs of one collection, newest first.
    pub fn jobs(&self, which: WhichJobs) -> Vec<Arc<Job>> {
        let inner = self.read();
        let map = match which {
            WhichJobs::All => &inner.all_jobs,
            WhichJobs::Active => &inner.active_jobs,
            WhichJobs::Completed => &inner.completed_jobs,
        };
        map.values().rev().cloned().collect()
    }

    pub fn find_job(&self, id: JobId) -> Option<Arc<Job>> {
        self.read().all_jobs.get(&id).cloned()
    }

    pub fn active_job_count(&self) -> usize {
        self.read().active_jobs.len()
    }

    pub fn processing_job(&self) -> Option<JobId> {
        self.read().processing_job
    }

    /// Create a job that is still receiving its document.
    #[instrument(skip(self, attrs), fields(printer = %self.name))]
    pub fn create_job(self: &Arc<Self>, name: &str, format: &str, attrs: AttributeSet) -> Result<Arc<Job>> {
        if self.is_deleted() {
            return Err(DruckwerkError::PrinterNotFound(self.id.0));
        }
        let mut inner = self.write();
        if !inner.is_accepting {
            return Err(DruckwerkError::NotAccepting);
        }
        if inner.max_active_jobs > 0 && inner.active_jobs.len() >= inner.max_active_jobs {
            return Err(DruckwerkError::TooManyJobs(self.name.clone()));
        }

        let id = JobId(inner.next_job_id);
        inner.next_job_id += 1;
        let job = Arc::new(Job::new(id, self, name.to_string(), attrs, format.to_string()));
        inner.all_jobs.insert(id, Arc::clone(&job));
        inner.active_jobs.insert(id, Arc::clone(&job));
        info!(job_id = %id, "job created");
        Ok(job)
    }

    /// Mark a job's document as received and queue it.
    ///
    /// The job is held when `job-hold-until` asks for it, and canceled if a
    /// cancel arrived while the document was still being received.
    pub fn finish_document(self: &Arc<Self>, id: JobId, path: PathBuf) -> Result<()> {
        {
            let mut inner = self.write();
            let job = inner
                .active_jobs
                .get(&id)
                .cloned()
                .ok_or(DruckwerkError::JobNotFound(id.0))?;
            let hold = job
                .attributes()
                .string("job-hold-until")
                .is_some_and(|until| until != "no-hold");

            job.update(|f| {
                f.filename = Some(path);
                f.receiving = false;
            });
            if job.is_canceled() {
                inner.retire(&job, JobState::Canceled);
                inner.schedule_clean(self.config.clean_delay());
            } else if hold {
                job.update(|f| f.state = JobState::Held);
            } else {
                job.update(|f| f.state = JobState::Pending);
            }
            debug!(job_id = %id, state = %job.state(), "document received");
        }
        self.check_jobs();
        Ok(())
    }

    /// Spool `reader` as the document for `job` and queue it.  A failed copy
    /// aborts the job.
    pub fn submit_reader(self: &Arc<Self>, job: &Arc<Job>, mut reader: impl Read) -> Result<()> {
        let resource = spool::job_resource_name(job.id(), job.name());
        let ext = self.spool_extension(job.format());

        let copied = spool::open(&self.config.spool_dir, self.id, &resource, Some(ext), OpenMode::Write)
            .and_then(|mut handle| {
                let mut file = handle.file.take().ok_or_else(|| {
                    DruckwerkError::InvalidArgument(format!("spool file {} not opened", handle.path.display()))
                })?;
                std::io::copy(&mut reader, &mut file)?;
                file.sync_all()?;
                Ok(handle.path)
            });

        match copied {
            Ok(path) => self.finish_document(job.id(), path),
            Err(e) => {
                error!(printer = %self.name, job_id = %job.id(), error = %e, "unable to spool document");
                if let Err(e) = spool::open(&self.config.spool_dir, self.id, &resource, Some(ext), OpenMode::Remove) {
                    warn!(error = %e, "unable to remove partial spool file");
                }
                job.set_message(format!("Unable to spool document: {e}"));
                let mut inner = self.write();
                job.update(|f| f.receiving = false);
                inner.retire(job, JobState::Aborted);
                inner.schedule_clean(self.config.clean_delay());
                Err(e)
            }
        }
    }

    /// Create a job for a file on disk.  The format is guessed from the
    /// extension when not given.
    pub fn submit_file(
        self: &Arc<Self>,
        path: &Path,
        format: Option<&str>,
        attrs: AttributeSet,
    ) -> Result<Arc<Job>> {
        let format = match format {
            Some(format) => format.to_string(),
            None => self.guess_format(path),
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".into());

        let file = File::open(path)?;
        let job = self.create_job(&name, &format, attrs)?;
        self.submit_reader(&job, file)?;
        Ok(job)
    }

    fn guess_format(&self, path: &Path) -> String {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(format_from_extension)
            .unwrap_or(FORMAT_OCTET_STREAM)
            .to_string()
    }

    fn spool_extension(&self, format: &str) -> &'static str {
        match format {
            FORMAT_PWG_RASTER => "pwg",
            FORMAT_URF => "urf",
            FORMAT_JPEG => "jpg",
            FORMAT_PNG => "png",
            _ => "prn",
        }
    }

    /// Hold a pending job.
    pub fn hold_job(&self, id: JobId) -> Result<()> {
        let inner = self.write();
        let job = inner.active_jobs.get(&id).ok_or(DruckwerkError::JobNotFound(id.0))?;
        job.update(|f| match f.state {
            JobState::Pending => {
                f.state = JobState::Held;
                Ok(())
            }
            state => Err(DruckwerkError::InvalidJobState {
                job_id: id.0,
                action: "held",
                state: state.to_string(),
            }),
        })?;
        info!(printer = %self.name, job_id = %id, "job held");
        Ok(())
    }

    /// Release a held job and dispatch it.
    pub fn release_job(self: &Arc<Self>, id: JobId) -> Result<()> {
        {
            let inner = self.write();
            let job = inner.active_jobs.get(&id).ok_or(DruckwerkError::JobNotFound(id.0))?;
            job.update(|f| match f.state {
                JobState::Held if !f.receiving => {
                    f.state = JobState::Pending;
                    Ok(())
                }
                state => Err(DruckwerkError::InvalidJobState {
                    job_id: id.0,
                    action: "released",
                    state: state.to_string(),
                }),
            })?;
        }
        info!(printer = %self.name, job_id = %id, "job released");
        self.check_jobs();
        Ok(())
    }

    /// Cancel one job.  A processing job, or a held job still receiving its
    /// document, is only flagged; it becomes Canceled when it finishes.
    pub fn cancel_job(&self, id: JobId) -> Result<()> {
        let mut inner = self.write();
        let Some(job) = inner.active_jobs.get(&id).cloned() else {
            return Err(match inner.all_jobs.get(&id) {
                Some(job) => DruckwerkError::InvalidJobState {
                    job_id: id.0,
                    action: "canceled",
                    state: job.state().to_string(),
                },
                None => DruckwerkError::JobNotFound(id.0),
            });
        };
        if cancel_locked(&mut inner, &job) {
            inner.schedule_clean(self.config.clean_delay());
        }
        info!(printer = %self.name, job_id = %id, "job canceled");
        Ok(())
    }

    /// Cancel every active job.  Does nothing when no job is active.
    #[instrument(skip_all, fields(printer = %self.name))]
    pub fn cancel_all_jobs(&self) {
        let mut inner = self.write();
        let jobs: Vec<Arc<Job>> = inner.active_jobs.values().cloned().collect();
        let mut changed = false;
        for job in &jobs {
            changed |= cancel_locked(&mut inner, job);
        }
        if changed {
            inner.schedule_clean(self.config.clean_delay());
            info!(count = jobs.len(), "active jobs canceled");
        }
    }

    /// Dispatch the next pending job, if the printer is free.
    pub fn check_jobs(self: &Arc<Self>) {
        if self.is_deleted() {
            return;
        }
        let job = {
            let mut inner = self.write();
            if inner.paused || inner.processing_job.is_some() {
                return;
            }
            let Some(job) = inner
                .active_jobs
                .values()
                .find(|job| job.state() == JobState::Pending)
                .cloned()
            else {
                return;
            };
            job.update(|f| {
                f.state = JobState::Processing;
                f.processing = Some(Utc::now());
            });
            inner.processing_job = Some(job.id());
            job
        };

        debug!(printer = %self.name, job_id = %job.id(), "dispatching job");
        let printer = Arc::clone(self);
        let worker_job = Arc::clone(&job);
        let spawned = std::thread::Builder::new()
            .name(format!("job-{}", job.id()))
            .spawn(move || job::process(printer, worker_job));

        match spawned {
            Ok(handle) => {
                let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
                workers.retain(|w| !w.is_finished());
                workers.push(handle);
            }
            Err(e) => {
                error!(printer = %self.name, job_id = %job.id(), error = %e, "unable to start job thread");
                job.update(|f| {
                    f.message = Some(format!("Unable to start job thread: {e}"));
                    f.state = JobState::Aborted;
                });
                self.finish_job(&job, None);
            }
        }
    }

    /// Completion bookkeeping for a job leaving the worker.
    ///
    /// Takes the device back, records the terminal state, moves the job to
    /// the completed collection and dispatches the next job.  The device is
    /// closed once nothing is processing and no listener needs it.
    pub(crate) fn finish_job(self: &Arc<Self>, job: &Arc<Job>, device: Option<Box<dyn Device>>) {
        let state = {
            let mut inner = self.write();
            let state = job.update(|f| {
                if job.is_canceled() {
                    JobState::Canceled
                } else if f.state == JobState::Processing {
                    JobState::Completed
                } else {
                    f.state
                }
            });
            inner.retire(job, state);

            if inner.processing_job == Some(job.id()) {
                inner.processing_job = None;
            }
            if let Some(device) = device {
                inner.device = Some(device);
                inner.device_in_use = false;
            }
            let idle = if inner.paused { PrinterState::Stopped } else { PrinterState::Idle };
            inner.set_state(idle);
            inner.schedule_clean(self.config.clean_delay());
            state
        };

        info!(
            printer = %self.name,
            job_id = %job.id(),
            state = %state,
            impressions = job.impressions_completed(),
            "job finished"
        );

        if self.is_deleted() {
            return;
        }
        self.check_jobs();
        self.close_device_if_idle();
    }

    /// Block until every worker thread has exited.
    pub fn wait_for_jobs(&self) {
        loop {
            let handles = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if handle.join().is_err() {
                    error!(printer = %self.name, "job thread panicked");
                }
            }
        }
    }

    /// Delete completed jobs beyond the retention limit, oldest first,
    /// together with their spool files.
    #[instrument(skip_all, fields(printer = %self.name))]
    pub fn clean_jobs(&self) {
        let removed: Vec<Arc<Job>> = {
            let mut inner = self.write();
            inner.clean_after = None;
            let excess = inner.completed_jobs.len().saturating_sub(inner.max_completed_jobs);
            let ids: Vec<JobId> = inner.completed_jobs.keys().take(excess).copied().collect();
            ids.into_iter()
                .filter_map(|id| {
                    inner.completed_jobs.remove(&id);
                    inner.all_jobs.remove(&id)
                })
                .collect()
        };
        for job in &removed {
            remove_spool_file(job);
        }
        if !removed.is_empty() {
            info!(count = removed.len(), "completed jobs deleted");
        }
    }

    /// When the next cleanup pass is due.
    pub fn clean_after(&self) -> Option<Instant> {
        self.read().clean_after
    }

    // -----------------------------------------------------------------------
    // Device
    // -----------------------------------------------------------------------

    /// Take the printer's device for `job`, opening it if needed.
    ///
    /// Open failures retry forever at the configured interval; the first one
    /// is logged and stops the printer.  Returns `None` if the printer is
    /// deleted or the job canceled while waiting.
    pub(crate) fn acquire_device(&self, job: &Job) -> Option<Box<dyn Device>> {
        let retry = RetryLoop::new(self.config.device_retry_interval(), DEVICE_BUSY_POLL)
            .cancel_on(Arc::clone(&self.deleted))
            .cancel_on(job.cancel_flag());

        retry.run(
            || self.try_take_device(),
            |message| {
                error!(printer = %self.name, uri = %self.device_uri, %message, "unable to open device, retrying");
                self.write().set_state(PrinterState::Stopped);
            },
        )
    }

    fn try_take_device(&self) -> Attempt<Box<dyn Device>> {
        {
            let mut inner = self.write();
            if inner.device_in_use {
                return Attempt::Busy;
            }
            inner.device_in_use = true;
            if let Some(device) = inner.device.take() {
                return Attempt::Ready(device);
            }
        }

        let failure = std::cell::RefCell::new(None::<String>);
        let opened = self.devices.open(&self.device_uri, &|message: &str| {
            failure.borrow_mut().get_or_insert_with(|| message.to_string());
        });
        match opened {
            Some(device) => {
                debug!(printer = %self.name, uri = %self.device_uri, "device opened");
                Attempt::Ready(device)
            }
            None => {
                self.write().device_in_use = false;
                Attempt::Failed(failure.into_inner().unwrap_or_else(|| "device unavailable".into()))
            }
        }
    }

    /// Whether the printer holds an open device.
    pub fn has_open_device(&self) -> bool {
        let inner = self.read();
        inner.device.is_some() || inner.device_in_use
    }

    fn close_device_if_idle(&self) {
        let device = {
            let mut inner = self.write();
            if inner.processing_job.is_some() || inner.device_in_use || self.listeners.load(Ordering::Acquire) > 0 {
                return;
            }
            inner.device.take()
        };
        if let Some(device) = device {
            close_device(&self.name, device);
        }
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Register a listener thread (raw socket, USB gadget) that keeps the
    /// device open.  The registration ends when the guard is dropped.
    pub fn register_listener(self: &Arc<Self>) -> ListenerGuard {
        let count = self.listeners.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(printer = %self.name, listeners = count, "listener registered");
        ListenerGuard {
            printer: Arc::clone(self),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Presets
    // -----------------------------------------------------------------------

    pub fn presets(&self) -> Vec<Preset> {
        self.read().presets.clone()
    }

    /// Add a preset.  Ids and names must be unique; id 0 picks the next id.
    pub fn add_preset(&self, mut preset: Preset) -> Result<u32> {
        let mut inner = self.write();
        admit_preset(&inner.presets, &mut preset)?;
        let id = preset.id;
        info!(printer = %self.name, preset = %preset.name, id, "preset added");
        inner.presets.push(preset);
        refresh_preset_summary(&mut inner);
        Ok(id)
    }

    /// Remove a preset by name.  Returns whether it existed.
    pub fn remove_preset(&self, name: &str) -> bool {
        let mut inner = self.write();
        let before = inner.presets.len();
        inner.presets.retain(|p| p.name != name);
        let removed = inner.presets.len() != before;
        if removed {
            refresh_preset_summary(&mut inner);
            info!(printer = %self.name, preset = name, "preset removed");
        }
        removed
    }

    /// Copy a preset's overrides into the printer defaults.
    pub fn apply_preset(&self, name: &str) -> Result<()> {
        let mut inner = self.write();
        let preset = inner
            .presets
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| DruckwerkError::InvalidArgument(format!("no preset named '{name}'")))?;
        let defaults = preset.default_attributes(&inner.driver_data.bins);
        inner.attrs.merge(&defaults);
        debug!(printer = %self.name, preset = name, count = defaults.len(), "preset applied");
        Ok(())
    }

    /// Read presets from a preset file and add them.  Returns how many were
    /// added.  Nothing is added unless every preset in the file is accepted.
    pub fn load_presets(&self, reader: impl BufRead) -> Result<usize> {
        let parsed = {
            let inner = self.read();
            parse_presets(reader, &inner.driver_data.bins, &inner.driver_attrs)?
        };

        let mut inner = self.write();
        let mut merged = inner.presets.clone();
        for mut preset in parsed {
            admit_preset(&merged, &mut preset)?;
            merged.push(preset);
        }
        let count = merged.len() - inner.presets.len();
        inner.presets = merged;
        refresh_preset_summary(&mut inner);
        info!(printer = %self.name, count, "presets loaded");
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Driver actions
    // -----------------------------------------------------------------------

    /// Ask the driver to identify the printer.  Uses the default actions
    /// when none are given.
    pub fn identify(&self, actions: Option<IdentifyActions>, message: Option<&str>) {
        let actions = actions.unwrap_or_else(|| self.read().driver_data.identify_default);
        info!(printer = %self.name, actions = ?actions.keywords(), "identify");
        self.driver.identify(self, actions, message);
        self.set_reasons(PrinterReasons::EMPTY, PrinterReasons::IDENTIFY_PRINTER_REQUESTED);
    }

    /// Submit the driver's test page, if it has one.
    pub fn print_test_page(self: &Arc<Self>) -> Result<Option<Arc<Job>>> {
        let Some(path) = self.driver.testpage(self) else {
            debug!(printer = %self.name, "driver has no test page");
            return Ok(None);
        };
        let mut attrs = AttributeSet::new();
        attrs.add("job-name", AttrValue::Name("Test Page".into()));
        self.submit_file(&path, None, attrs).map(Some)
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    /// Delete the printer.
    ///
    /// Cancels active jobs, waits for listeners and workers to exit, runs the
    /// driver's delete callback, removes spool files and closes the device.
    #[instrument(skip_all, fields(printer = %self.name))]
    pub fn delete(&self) {
        if self.deleted.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("deleting printer");
        self.cancel_all_jobs();

        let poll = self.config.listener_poll_interval();
        while self.listeners.load(Ordering::Acquire) > 0 {
            std::thread::sleep(poll);
        }
        self.wait_for_jobs();

        let data = self.read().driver_data.clone();
        self.driver.delete(&self.name, &data);

        let (jobs, device) = {
            let mut inner = self.write();
            inner.active_jobs.clear();
            inner.completed_jobs.clear();
            inner.processing_job = None;
            inner.presets.clear();
            inner.device_in_use = false;
            (std::mem::take(&mut inner.all_jobs), inner.device.take())
        };
        for job in jobs.values() {
            remove_spool_file(job);
        }
        if let Some(device) = device {
            close_device(&self.name, device);
        }
        info!(jobs = jobs.len(), "printer deleted");
    }
}

/// Decrements the listener count when dropped.
pub struct ListenerGuard {
    printer: Arc<Printer>,
}

impl ListenerGuard {
    /// Listener threads poll this to notice printer deletion.
    pub fn should_exit(&self) -> bool {
        self.printer.is_deleted()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let left = self.printer.listeners.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!(printer = %self.printer.name, listeners = left, "listener exited");
        if left == 0 && !self.printer.is_deleted() {
            self.printer.close_device_if_idle();
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Cancel one active job under the printer lock.  Returns whether anything
/// changed.
fn cancel_locked(inner: &mut PrinterInner, job: &Arc<Job>) -> bool {
    let (state, receiving) = job.update(|f| (f.state, f.receiving));
    let in_flight = state == JobState::Processing || (state == JobState::Held && receiving);
    if !in_flight {
        inner.retire(job, JobState::Canceled);
        return true;
    }
    if job.is_canceled() {
        return false;
    }
    job.request_cancel();
    true
}

fn remove_spool_file(job: &Job) {
    if let Some(path) = job.filename() {
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "spool file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "unable to remove spool file"),
        }
    }
}

fn close_device(printer: &str, mut device: Box<dyn Device>) {
    match device.close() {
        Ok(()) => debug!(printer, "device closed"),
        Err(e) => warn!(printer, error = %e, "device close failed"),
    }
}

fn static_attributes(id: PrinterId, name: &str, uuid: &Uuid) -> AttributeSet {
    let urn = format!("urn:uuid:{uuid}");
    let mut attrs = AttributeSet::new();
    attrs
        .add("copies-default", AttrValue::Integer(1))
        .add("device-uuid", AttrValue::Uri(urn.clone()))
        .add("document-format-default", AttrValue::MimeType(FORMAT_OCTET_STREAM.into()))
        .add("job-hold-until-default", AttrValue::keyword("no-hold"))
        .add_keywords("job-hold-until-supported", &["indefinite", "no-hold"])
        .add("job-priority-default", AttrValue::Integer(50))
        .add("job-priority-supported", AttrValue::Integer(1))
        .add_keywords(
            "multiple-document-handling-supported",
            &["separate-documents-uncollated-copies", "separate-documents-collated-copies"],
        )
        .add_enums("orientation-requested-supported", &[3, 4, 5, 6, 7])
        .add_keywords(
            "print-content-optimize-supported",
            &["auto", "graphic", "photo", "text", "text-and-graphic"],
        )
        .add_enums("print-quality-supported", &[3, 4, 5])
        .add_keywords("print-scaling-supported", &["auto", "auto-fit", "fill", "fit", "none"])
        .add("printer-id", AttrValue::Integer(id.0 as i32))
        .add("printer-info", AttrValue::text(name))
        .add("printer-name", AttrValue::Name(name.into()))
        .add("printer-uuid", AttrValue::Uri(urn))
        .add_keywords(
            "which-jobs-supported",
            &[
                "completed",
                "not-completed",
                "aborted",
                "all",
                "canceled",
                "pending",
                "pending-held",
                "processing",
                "processing-stopped",
            ],
        );
    attrs
}

/// `job-presets-supported` entries: the preset name plus its overrides,
/// named as job attributes.
fn preset_summaries(presets: &[Preset], bins: &[String]) -> Vec<AttrValue> {
    presets
        .iter()
        .map(|preset| {
            let mut col = AttributeSet::new();
            col.add("preset-name", AttrValue::Name(preset.name.clone()));
            for attr in preset.default_attributes(bins).iter() {
                let member = attr.name.strip_suffix("-default").unwrap_or(attr.name.as_str());
                col.add_values(member, attr.values.clone());
            }
            AttrValue::Collection(col)
        })
        .collect()
}

/// Check a new preset against `presets`, assigning the next id when it has
/// none.
fn admit_preset(presets: &[Preset], preset: &mut Preset) -> Result<()> {
    if preset.name.trim().is_empty() {
        return Err(DruckwerkError::InvalidArgument("preset name is empty".into()));
    }
    if preset.id == 0 {
        preset.id = presets.iter().map(|p| p.id).max().unwrap_or(0) + 1;
    }
    if presets.iter().any(|p| p.id == preset.id || p.name == preset.name) {
        return Err(DruckwerkError::InvalidArgument(format!(
            "preset {} '{}' already exists",
            preset.id, preset.name
        )));
    }
    Ok(())
}

fn refresh_preset_summary(inner: &mut PrinterInner) {
    let summaries = preset_summaries(&inner.presets, &inner.driver_data.bins);
    inner.attrs.remove("job-presets-supported");
    inner.attrs.add_values("job-presets-supported", summaries);
}
