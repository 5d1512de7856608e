// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Druckwerk.

use thiserror::Error;

/// Top-level error type for all Druckwerk operations.
#[derive(Debug, Error)]
pub enum DruckwerkError {
    // -- Configuration errors --
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no printer driver callback registered")]
    NoDriver,

    #[error("unknown driver '{0}'")]
    UnknownDriver(String),

    #[error("printer '{0}' already exists")]
    PrinterExists(String),

    #[error("driver setup failed for '{0}'")]
    DriverSetup(String),

    #[error("printer {0} not found")]
    PrinterNotFound(u32),

    // -- Job errors --
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("job {0} not found")]
    JobNotFound(u32),

    #[error("job {job_id} cannot be {action} in state {state}")]
    InvalidJobState {
        job_id: u32,
        action: &'static str,
        state: String,
    },

    #[error("printer is not accepting jobs")]
    NotAccepting,

    #[error("printer '{0}' has too many active jobs")]
    TooManyJobs(String),

    // -- Device errors --
    #[error("unable to open device '{uri}': {message}")]
    DeviceOpen { uri: String, message: String },

    #[error("no device scheme registered for '{0}'")]
    UnknownScheme(String),

    #[error("device I/O failed: {0}")]
    DeviceIo(String),

    // -- Decode errors --
    #[error("raster stream error: {0}")]
    Raster(String),

    #[error("image decode failed: {0}")]
    Image(String),

    #[error("driver callback '{0}' failed")]
    DriverCallback(&'static str),

    // -- Preset errors --
    #[error("preset file line {line}: {message}")]
    Preset { line: usize, message: String },

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DruckwerkError>;
