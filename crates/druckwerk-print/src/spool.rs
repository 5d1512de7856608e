// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spool file naming and access.
//
// Printer-scoped files live in the system spool directory as
// `p{printer_id:05}-{name}[.ext]`.  Names are sanitized so that any
// resource name maps to a portable file name.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use druckwerk_core::error::Result;
use druckwerk_core::types::{JobId, PrinterId};
use tracing::debug;

/// Longest sanitized name component.
pub const MAX_NAME_LEN: usize = 63;

/// How to open a spool file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Create or truncate, owner read/write only.
    Write,
    /// Delete the file.
    Remove,
}

/// An opened (or removed) spool file.
#[derive(Debug)]
pub struct SpoolHandle {
    pub path: PathBuf,
    /// `None` for [`OpenMode::Remove`].
    pub file: Option<File>,
}

/// Lower-case `name`, keep `[a-z0-9.-]` and collapse every other run of
/// characters into one `_`.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len().min(MAX_NAME_LEN));
    let mut pending_underscore = false;

    for c in name.chars() {
        if out.len() >= MAX_NAME_LEN {
            break;
        }
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            if pending_underscore {
                out.push('_');
                pending_underscore = false;
                if out.len() >= MAX_NAME_LEN {
                    break;
                }
            }
            out.push(c);
        } else {
            pending_underscore = true;
        }
    }
    if pending_underscore && out.len() < MAX_NAME_LEN {
        out.push('_');
    }
    out
}

/// Path of a printer-scoped spool file.
pub fn spool_path(dir: &Path, printer: PrinterId, name: &str, ext: Option<&str>) -> PathBuf {
    let mut file = format!("p{:05}-{}", printer.0, sanitize_name(name));
    if let Some(ext) = ext.filter(|e| !e.is_empty()) {
        file.push('.');
        file.push_str(ext);
    }
    dir.join(file)
}

/// Resource name used for a job's document file.
pub fn job_resource_name(job: JobId, name: &str) -> String {
    format!("j{:09}-{}", job.0, name)
}

/// Open, create or remove a spool file.  The spool directory is created on
/// demand for writes.
pub fn open(
    dir: &Path,
    printer: PrinterId,
    name: &str,
    ext: Option<&str>,
    mode: OpenMode,
) -> Result<SpoolHandle> {
    let path = spool_path(dir, printer, name, ext);
    let file = match mode {
        OpenMode::Read => Some(File::open(&path)?),
        OpenMode::Write => {
            std::fs::create_dir_all(dir)?;
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            Some(options.open(&path)?)
        }
        OpenMode::Remove => {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            None
        }
    };
    debug!(path = %path.display(), ?mode, "spool file");
    Ok(SpoolHandle { path, file })
}
