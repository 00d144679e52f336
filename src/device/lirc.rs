//! lirc scancode records and the lirc scancode source.
//!
//! A `struct lirc_scancode` is 24 bytes, packed:
//!
//! ```text
//! offset  size  field
//!      0     8  timestamp (ns, monotonic)
//!      8     2  flags     (1 = toggle, 2 = repeat)
//!     10     2  rc_proto
//!     12     4  keycode
//!     16     8  scancode
//! ```

// Rust guideline compliant 2026-02

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::fd::DeviceFd;
use super::ScancodeSource;
use crate::keymap::ScanKey;

/// Size of one `lirc_scancode` record.
pub const SCANCODE_SIZE: usize = 24;

/// `LIRC_SET_REC_MODE`: `_IOW('i', 0x12, __u32)`.
const LIRC_SET_REC_MODE: u64 = 0x4004_6912;

/// `LIRC_MODE_SCANCODE`.
const LIRC_MODE_SCANCODE: u32 = 0x0000_0008;

/// Records read per `read` call.
const MAX_SCANCODES_PER_READ: usize = 64;

/// Toggle bit flag.
pub const FLAG_TOGGLE: u16 = 1;

/// Repeat flag.
pub const FLAG_REPEAT: u16 = 2;

/// sysfs protocol name of a kernel `rc_proto` id.
#[must_use]
pub fn protocol_name(id: u16) -> &'static str {
    match id {
        1 => "other",
        2 | 3 => "rc-5",
        4 => "rc-5-sz",
        5 => "jvc",
        6..=8 => "sony",
        9..=11 => "nec",
        12 => "sanyo",
        13 | 14 => "mce_kbd",
        15..=19 => "rc-6",
        20 => "sharp",
        21 => "xmp",
        22 => "cec",
        23 => "imon",
        24..=26 => "rc-mm",
        27 => "xbox-dvd",
        _ => "unknown",
    }
}

/// One decoded scancode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scancode {
    /// Monotonic timestamp in nanoseconds.
    pub timestamp_ns: u64,
    /// `FLAG_TOGGLE` / `FLAG_REPEAT` bits.
    pub flags: u16,
    /// Kernel protocol id.
    pub protocol: u16,
    /// Key code the current keymap assigns, if any.
    pub keycode: u32,
    /// Raw scancode.
    pub scancode: u64,
}

impl Scancode {
    /// Decode a native-endian record.
    #[must_use]
    pub fn from_bytes(buf: &[u8; SCANCODE_SIZE]) -> Self {
        let mut timestamp = [0u8; 8];
        let mut keycode = [0u8; 4];
        let mut scancode = [0u8; 8];
        timestamp.copy_from_slice(&buf[0..8]);
        keycode.copy_from_slice(&buf[12..16]);
        scancode.copy_from_slice(&buf[16..24]);
        Self {
            timestamp_ns: u64::from_ne_bytes(timestamp),
            flags: u16::from_ne_bytes([buf[8], buf[9]]),
            protocol: u16::from_ne_bytes([buf[10], buf[11]]),
            keycode: u32::from_ne_bytes(keycode),
            scancode: u64::from_ne_bytes(scancode),
        }
    }

    /// sysfs name of the protocol.
    #[must_use]
    pub fn protocol_name(&self) -> &'static str {
        protocol_name(self.protocol)
    }

    /// Whether the repeat flag is set.
    #[must_use]
    pub fn is_repeat(&self) -> bool {
        self.flags & FLAG_REPEAT != 0
    }

    /// Protocol name plus scancode, as stored in keymaps.
    #[must_use]
    pub fn scan_key(&self) -> ScanKey {
        ScanKey::new(self.protocol_name(), self.scancode)
    }
}

/// Decode every whole record in `buf`.
pub fn decode_scancodes(buf: &[u8]) -> impl Iterator<Item = Scancode> + '_ {
    buf.chunks_exact(SCANCODE_SIZE).filter_map(|chunk| {
        let record: &[u8; SCANCODE_SIZE] = chunk.try_into().ok()?;
        Some(Scancode::from_bytes(record))
    })
}

/// Scancode source reading a lirc device (`/dev/lircN`) in scancode mode.
#[derive(Debug)]
pub struct LircSource {
    fd: DeviceFd,
    pending: VecDeque<Scancode>,
    protocols_limited: bool,
}

impl LircSource {
    /// Open a lirc device and switch it to scancode mode.
    pub fn open(path: &Path) -> Result<Self> {
        let fd = DeviceFd::open(path)?;
        fd.ioctl_set_u32(LIRC_SET_REC_MODE, LIRC_MODE_SCANCODE)
            .with_context(|| format!("Failed to set scancode mode on {}", path.display()))?;
        Ok(Self {
            fd,
            pending: VecDeque::new(),
            protocols_limited: false,
        })
    }

    /// Record that not every protocol could be enabled on the device.
    pub fn set_protocols_limited(&mut self, limited: bool) {
        self.protocols_limited = limited;
    }
}

#[async_trait(?Send)]
impl ScancodeSource for LircSource {
    async fn next_scancode(&mut self) -> Result<Option<Scancode>> {
        let mut buf = [0u8; SCANCODE_SIZE * MAX_SCANCODES_PER_READ];
        while self.pending.is_empty() {
            if self.fd.is_closed() {
                return Ok(None);
            }
            let n = self
                .fd
                .read(&mut buf)
                .await
                .with_context(|| format!("Failed to read {}", self.fd.path().display()))?;
            if n == 0 {
                return Ok(None);
            }
            self.pending.extend(decode_scancodes(&buf[..n]));
        }
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) {
        self.pending.clear();
        self.fd.close();
    }

    fn protocols_limited(&self) -> bool {
        self.protocols_limited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: u64, flags: u16, proto: u16, scancode: u64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SCANCODE_SIZE);
        buf.extend_from_slice(&ts.to_ne_bytes());
        buf.extend_from_slice(&flags.to_ne_bytes());
        buf.extend_from_slice(&proto.to_ne_bytes());
        buf.extend_from_slice(&0u32.to_ne_bytes());
        buf.extend_from_slice(&scancode.to_ne_bytes());
        buf
    }

    #[test]
    fn test_decode_scancodes() {
        let mut buf = record(1_000, 0, 9, 0x45);
        buf.extend(record(2_000, FLAG_REPEAT, 2, 0x1001));

        let codes: Vec<Scancode> = decode_scancodes(&buf).collect();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].timestamp_ns, 1_000);
        assert_eq!(codes[0].scan_key(), ScanKey::new("nec", 0x45));
        assert!(!codes[0].is_repeat());
        assert_eq!(codes[1].protocol_name(), "rc-5");
        assert!(codes[1].is_repeat());
    }

    #[test]
    fn test_protocol_names() {
        assert_eq!(protocol_name(0), "unknown");
        assert_eq!(protocol_name(11), "nec");
        assert_eq!(protocol_name(19), "rc-6");
        assert_eq!(protocol_name(27), "xbox-dvd");
        assert_eq!(protocol_name(200), "unknown");
    }
}
