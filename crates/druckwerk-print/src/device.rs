// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output device abstraction.
//
// A device is an open byte sink (USB endpoint, socket, file) addressed by a
// URI.  Schemes are pluggable: a `DeviceRegistry` maps the URI scheme to a
// `DeviceScheme` that knows how to open it.  The built-in `file` scheme
// writes to a path, generating a file name when the path is a directory.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use druckwerk_core::error::{DruckwerkError, Result};
use tracing::{debug, info, warn};

/// An open connection to a printer.
pub trait Device: Send + Sync {
    /// Write bytes to the device.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Flush buffered output.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// IEEE-1284 device ID, if the device reports one.
    fn get_id(&mut self) -> Option<String> {
        None
    }

    /// Flush and release the connection.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

/// Opens devices for one URI scheme.
pub trait DeviceScheme: Send + Sync {
    /// Open `uri`, reporting failures through `on_error`.
    fn open(&self, uri: &str, on_error: &dyn Fn(&str)) -> Option<Box<dyn Device>>;
}

/// Extract the scheme from a device URI (`usb://...` gives `usb`).
pub fn uri_scheme(uri: &str) -> Option<&str> {
    let (scheme, rest) = uri.split_once(':')?;
    if scheme.is_empty()
        || !rest.starts_with("//")
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return None;
    }
    Some(scheme)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registered device schemes, keyed by URI scheme.
pub struct DeviceRegistry {
    schemes: RwLock<HashMap<String, Arc<dyn DeviceScheme>>>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    /// Registry with the built-in `file` scheme.
    pub fn new() -> Self {
        let registry = Self {
            schemes: RwLock::new(HashMap::new()),
        };
        registry.register("file", Arc::new(FileScheme));
        registry
    }

    /// Register (or replace) the handler for `scheme`.
    pub fn register(&self, scheme: &str, handler: Arc<dyn DeviceScheme>) {
        debug!(scheme, "device scheme registered");
        self.schemes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scheme.to_ascii_lowercase(), handler);
    }

    pub fn is_registered(&self, scheme: &str) -> bool {
        self.schemes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&scheme.to_ascii_lowercase())
    }

    /// Look up the handler for a URI.
    pub fn scheme_for(&self, uri: &str) -> Result<Arc<dyn DeviceScheme>> {
        let scheme = uri_scheme(uri)
            .ok_or_else(|| DruckwerkError::InvalidArgument(format!("bad device URI '{uri}'")))?;
        self.schemes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scheme.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| DruckwerkError::UnknownScheme(scheme.to_string()))
    }

    /// Open a device.  Failures, including unknown schemes, are reported
    /// through `on_error` and yield `None`.
    pub fn open(&self, uri: &str, on_error: &dyn Fn(&str)) -> Option<Box<dyn Device>> {
        match self.scheme_for(uri) {
            Ok(handler) => handler.open(uri, on_error),
            Err(e) => {
                on_error(&e.to_string());
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// File devices
// ---------------------------------------------------------------------------

/// `file://` scheme: writes to a regular file.
pub struct FileScheme;

static FILE_COUNTER: AtomicU32 = AtomicU32::new(0);

impl FileScheme {
    /// Resolve a `file://` URI to the path that will be written.
    pub fn target_path(uri: &str) -> Option<PathBuf> {
        let rest = uri.strip_prefix("file://")?;
        let path = rest.split(['?', '#']).next().unwrap_or(rest);
        if path.is_empty() {
            return None;
        }
        let path = Path::new(path);
        if path.is_dir() {
            let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
            let seq = FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
            Some(path.join(format!("druckwerk-{stamp}-{seq:04}.prn")))
        } else {
            Some(path.to_path_buf())
        }
    }
}

impl DeviceScheme for FileScheme {
    fn open(&self, uri: &str, on_error: &dyn Fn(&str)) -> Option<Box<dyn Device>> {
        let Some(path) = Self::target_path(uri) else {
            on_error(&format!("bad file URI '{uri}'"));
            return None;
        };
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                info!(path = %path.display(), "file device opened");
                Some(Box::new(FileDevice {
                    path,
                    out: Some(BufWriter::new(file)),
                }))
            }
            Err(e) => {
                on_error(&format!("unable to open '{}': {e}", path.display()));
                None
            }
        }
    }
}

/// A device that appends to a file.
pub struct FileDevice {
    path: PathBuf,
    out: Option<BufWriter<File>>,
}

impl FileDevice {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.out
            .as_mut()
            .ok_or_else(|| DruckwerkError::DeviceIo(format!("{} is closed", self.path.display())))
    }
}

impl Device for FileDevice {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer()?
            .write_all(data)
            .map_err(|e| DruckwerkError::DeviceIo(e.to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        match self.out.as_mut() {
            Some(out) => out.flush().map_err(|e| DruckwerkError::DeviceIo(e.to_string())),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush().map_err(|e| DruckwerkError::DeviceIo(e.to_string()))?;
            debug!(path = %self.path.display(), "file device closed");
        }
        Ok(())
    }
}

impl Drop for FileDevice {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "file device close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn scheme_parsing() {
        assert_eq!(uri_scheme("usb://HP/LaserJet?serial=1"), Some("usb"));
        assert_eq!(uri_scheme("file:///tmp/out.prn"), Some("file"));
        assert_eq!(uri_scheme("socket://10.0.0.2:9100"), Some("socket"));
        assert_eq!(uri_scheme("/dev/usb/lp0"), None);
        assert_eq!(uri_scheme("mailto:someone"), None);
    }

    #[test]
    fn file_device_writes_and_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.prn");
        let uri = format!("file://{}", path.display());
        let registry = DeviceRegistry::new();

        for chunk in [&b"abc"[..], &b"def"[..]] {
            let mut device = registry.open(&uri, &|_| {}).expect("open");
            device.write(chunk).expect("write");
            device.close().expect("close");
        }
        assert_eq!(std::fs::read(&path).expect("read"), b"abcdef");
    }

    #[test]
    fn directory_uri_gets_a_generated_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uri = format!("file://{}", dir.path().display());
        let target = FileScheme::target_path(&uri).expect("target");
        assert_eq!(target.parent(), Some(dir.path()));
        assert!(target.to_string_lossy().ends_with(".prn"));
    }

    #[test]
    fn unknown_scheme_reports_through_callback() {
        let registry = DeviceRegistry::new();
        let messages = Mutex::new(Vec::new());
        let device = registry.open("usb://Acme/Label", &|m| {
            messages.lock().expect("lock").push(m.to_string());
        });
        assert!(device.is_none());
        let messages = messages.into_inner().expect("messages");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("usb"));
    }

    #[test]
    fn writing_after_close_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uri = format!("file://{}", dir.path().join("x.prn").display());
        let mut device = FileScheme.open(&uri, &|_| {}).expect("open");
        device.close().expect("close");
        assert!(device.write(b"late").is_err());
    }
}
