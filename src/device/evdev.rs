//! evdev `input_event` records and the evdev key source.
//!
//! On 64-bit Linux an `input_event` is 24 bytes:
//!
//! ```text
//! offset  size  field
//!      0     8  tv_sec
//!      8     8  tv_usec
//!     16     2  type
//!     18     2  code
//!     20     4  value
//! ```

// Rust guideline compliant 2026-02

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::fd::DeviceFd;
use super::{keys, DeviceKey, InputSource};

/// Size of one `input_event` record.
pub const INPUT_EVENT_SIZE: usize = 24;

/// Event type of key events.
pub const EV_KEY: u16 = 0x01;

/// `EVIOCGRAB`: `_IOW('E', 0x90, int)`.
const EVIOCGRAB: u64 = 0x4004_4590;

/// Records read per `read` call.
const MAX_EVENTS_PER_READ: usize = 64;

/// One decoded `input_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Seconds part of the timestamp.
    pub sec: i64,
    /// Microseconds part of the timestamp.
    pub usec: i64,
    /// Event type (`EV_KEY`, ...).
    pub kind: u16,
    /// Event code (key code for `EV_KEY`).
    pub code: u16,
    /// Event value (`0` release, `1` press, `2` auto-repeat for keys).
    pub value: i32,
}

impl InputEvent {
    /// Decode a native-endian record.
    #[must_use]
    pub fn from_bytes(buf: &[u8; INPUT_EVENT_SIZE]) -> Self {
        let mut sec = [0u8; 8];
        let mut usec = [0u8; 8];
        let mut value = [0u8; 4];
        sec.copy_from_slice(&buf[0..8]);
        usec.copy_from_slice(&buf[8..16]);
        value.copy_from_slice(&buf[20..24]);
        Self {
            sec: i64::from_ne_bytes(sec),
            usec: i64::from_ne_bytes(usec),
            kind: u16::from_ne_bytes([buf[16], buf[17]]),
            code: u16::from_ne_bytes([buf[18], buf[19]]),
            value: i32::from_ne_bytes(value),
        }
    }

    /// The key this event reports, if it is a key event.
    #[must_use]
    pub fn to_key(&self) -> Option<DeviceKey> {
        if self.kind != EV_KEY {
            return None;
        }
        Some(DeviceKey {
            code: self.code,
            name: keys::key_label(self.code),
            pressed: self.value != 0,
        })
    }
}

/// Decode every whole record in `buf`.
pub fn decode_events(buf: &[u8]) -> impl Iterator<Item = InputEvent> + '_ {
    buf.chunks_exact(INPUT_EVENT_SIZE).filter_map(|chunk| {
        let record: &[u8; INPUT_EVENT_SIZE] = chunk.try_into().ok()?;
        Some(InputEvent::from_bytes(record))
    })
}

/// Key source reading an evdev device (`/dev/input/eventN`).
#[derive(Debug)]
pub struct EvdevSource {
    name: String,
    fd: DeviceFd,
    pending: VecDeque<DeviceKey>,
    grabbed: bool,
}

impl EvdevSource {
    /// Open an evdev device.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            name: path.display().to_string(),
            fd: DeviceFd::open(path)?,
            pending: VecDeque::new(),
            grabbed: false,
        })
    }

    /// Grab the device so its events stop reaching anyone else (the console
    /// included), or release the grab.
    pub fn grab(&mut self, grab: bool) -> Result<()> {
        self.fd
            .ioctl_value(EVIOCGRAB, libc::c_ulong::from(grab))
            .with_context(|| format!("Failed to grab {}", self.fd.path().display()))?;
        self.grabbed = grab;
        Ok(())
    }
}

impl Drop for EvdevSource {
    fn drop(&mut self) {
        if self.grabbed {
            let _ = self.fd.ioctl_value(EVIOCGRAB, 0);
        }
    }
}

#[async_trait(?Send)]
impl InputSource for EvdevSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_key(&mut self) -> Result<Option<DeviceKey>> {
        let mut buf = [0u8; INPUT_EVENT_SIZE * MAX_EVENTS_PER_READ];
        while self.pending.is_empty() {
            let n = self
                .fd
                .read(&mut buf)
                .await
                .with_context(|| format!("Failed to read {}", self.name))?;
            if n == 0 {
                return Ok(None);
            }
            self.pending
                .extend(decode_events(&buf[..n]).filter_map(|ev| ev.to_key()));
        }
        Ok(self.pending.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: u16, code: u16, value: i32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(INPUT_EVENT_SIZE);
        buf.extend_from_slice(&12i64.to_ne_bytes());
        buf.extend_from_slice(&345i64.to_ne_bytes());
        buf.extend_from_slice(&kind.to_ne_bytes());
        buf.extend_from_slice(&code.to_ne_bytes());
        buf.extend_from_slice(&value.to_ne_bytes());
        buf
    }

    #[test]
    fn test_decode_key_events() {
        let mut buf = record(EV_KEY, 103, 1);
        buf.extend(record(0x00, 0, 0)); // EV_SYN
        buf.extend(record(EV_KEY, 103, 0));
        buf.extend([1, 2, 3]); // trailing partial record

        let events: Vec<InputEvent> = decode_events(&buf).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].sec, 12);
        assert_eq!(events[0].usec, 345);

        let keys: Vec<DeviceKey> = events.iter().filter_map(InputEvent::to_key).collect();
        assert_eq!(
            keys,
            vec![
                DeviceKey {
                    code: 103,
                    name: "KEY_UP".to_string(),
                    pressed: true
                },
                DeviceKey {
                    code: 103,
                    name: "KEY_UP".to_string(),
                    pressed: false
                },
            ]
        );
    }

    #[test]
    fn test_open_missing_device_fails() {
        assert!(EvdevSource::open(Path::new("/nonexistent/event0")).is_err());
    }
}
