//! Non-blocking character device file descriptors.

// Rust guideline compliant 2026-02

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::unix::AsyncFd;

/// A device file opened non-blocking and read through the tokio reactor.
///
/// Registration with the reactor happens on the first read, so the device
/// can be opened outside the runtime.
pub(crate) struct DeviceFd {
    path: PathBuf,
    file: Option<File>,
    fd: Option<AsyncFd<File>>,
}

impl std::fmt::Debug for DeviceFd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceFd")
            .field("path", &self.path)
            .field("registered", &self.fd.is_some())
            .finish()
    }
}

impl DeviceFd {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .with_context(|| format!("Failed to open device {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            fd: None,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn raw_fd(&self) -> Option<i32> {
        match (&self.fd, &self.file) {
            (Some(fd), _) => Some(fd.get_ref().as_raw_fd()),
            (None, Some(file)) => Some(file.as_raw_fd()),
            (None, None) => None,
        }
    }

    /// Read whatever is available, waiting until something is.
    pub(crate) async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fd.is_none() {
            let Some(file) = self.file.take() else {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "device closed"));
            };
            self.fd = Some(AsyncFd::new(file)?);
        }
        let Some(fd) = &self.fd else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "device closed"));
        };

        loop {
            let mut guard = fd.readable().await?;
            match guard.try_io(|inner| Read::read(&mut inner.get_ref(), buf)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    /// `ioctl` whose argument is a pointer to a `u32`.
    pub(crate) fn ioctl_set_u32(&self, request: u64, value: u32) -> io::Result<()> {
        let fd = self
            .raw_fd()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "device closed"))?;
        let value: libc::c_uint = value;
        // SAFETY: `fd` is an open descriptor owned by `self` and `value`
        // outlives the call.
        let rc = unsafe { libc::ioctl(fd, request as _, &value as *const libc::c_uint) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// `ioctl` whose argument is passed by value.
    pub(crate) fn ioctl_value(&self, request: u64, value: libc::c_ulong) -> io::Result<()> {
        let fd = self
            .raw_fd()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "device closed"))?;
        // SAFETY: `fd` is an open descriptor owned by `self`; the argument is
        // a plain integer.
        let rc = unsafe { libc::ioctl(fd, request as _, value) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Close the device. Later reads fail with `NotConnected`.
    pub(crate) fn close(&mut self) {
        self.fd = None;
        self.file = None;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.fd.is_none() && self.file.is_none()
    }
}
