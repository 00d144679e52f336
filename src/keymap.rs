//! IR remote keymaps in the `ir-keytable` TOML format.
//!
//! ```toml
//! [[protocols]]
//! name = "kiosk"
//! protocol = "nec"
//!
//! [protocols.scancodes]
//! 0x45 = "KEY_POWER"
//! 0x46 = "KEY_UP"
//! ```
//!
//! Scancode keys are parsed the way `ir-keytable` parses them (`0x` hex,
//! leading `0` octal, otherwise decimal) and always written back as hex.

// Rust guideline compliant 2026-02

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// One learned remote code: protocol name plus scancode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanKey {
    /// Protocol name as used by sysfs (`nec`, `rc-5`, ...).
    pub protocol: String,
    /// Scancode.
    pub scancode: u64,
}

impl ScanKey {
    /// Create a scan key.
    pub fn new(protocol: impl Into<String>, scancode: u64) -> Self {
        Self {
            protocol: protocol.into(),
            scancode,
        }
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:0x{:02x}", self.protocol, self.scancode)
    }
}

/// Parse a scancode the way `strtoull(s, NULL, 0)` does.
pub fn parse_scancode(s: &str) -> Result<u64> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        u64::from_str_radix(&s[1..], 8)
    } else {
        s.parse()
    };
    parsed.with_context(|| format!("Invalid scancode '{s}'"))
}

mod hex_scancodes {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<u64, String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (code, key) in map {
            out.serialize_entry(&format!("0x{code:02x}"), key)?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<u64, String>, D::Error> {
        BTreeMap::<String, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(code, key)| {
                super::parse_scancode(&code)
                    .map(|code| (code, key))
                    .map_err(|e| D::Error::custom(format!("{e:#}")))
            })
            .collect()
    }
}

/// Scancodes of one protocol.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolMap {
    /// Keymap name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Protocol name.
    pub protocol: String,
    /// Protocol variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Scancode to key name (`KEY_*`).
    #[serde(default, with = "hex_scancodes")]
    pub scancodes: BTreeMap<u64, String>,
}

/// A remote keymap.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Keymap {
    /// Per-protocol scancode tables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<ProtocolMap>,
}

impl Keymap {
    /// Parse TOML text.
    ///
    /// Every mapped name must be a key or button name.
    pub fn from_toml(text: &str) -> Result<Self> {
        let keymap: Self = toml::from_str(text).context("Failed to parse keymap")?;
        for (code, key) in keymap.scancodes() {
            check_key_name(key).with_context(|| format!("Bad mapping for {code}"))?;
        }
        Ok(keymap)
    }

    /// Render as TOML text.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize keymap")
    }

    /// Every `(code, key)` mapping, protocol by protocol.
    pub fn scancodes(&self) -> impl Iterator<Item = (ScanKey, &str)> + '_ {
        self.protocols.iter().flat_map(|p| {
            p.scancodes
                .iter()
                .map(move |(code, key)| (ScanKey::new(p.protocol.clone(), *code), key.as_str()))
        })
    }

    /// Codes grouped by key name.
    #[must_use]
    pub fn by_key(&self) -> BTreeMap<String, Vec<ScanKey>> {
        let mut out: BTreeMap<String, Vec<ScanKey>> = BTreeMap::new();
        for (code, key) in self.scancodes() {
            out.entry(key.to_string()).or_default().push(code);
        }
        out
    }

    /// Map `code` to `key`, creating the protocol table if needed.
    pub fn set_scancode(&mut self, code: &ScanKey, key: &str) {
        let index = match self.protocols.iter().position(|p| p.protocol == code.protocol) {
            Some(index) => index,
            None => {
                self.protocols.push(ProtocolMap {
                    protocol: code.protocol.clone(),
                    ..ProtocolMap::default()
                });
                self.protocols.len() - 1
            }
        };
        self.protocols[index]
            .scancodes
            .insert(code.scancode, key.to_string());
    }

    /// Remove every code mapped to `key`.
    pub fn clear_key(&mut self, key: &str) {
        for protocol in &mut self.protocols {
            protocol.scancodes.retain(|_, k| k != key);
        }
    }

    /// Remove every code, keeping the protocol tables.
    pub fn clear_all(&mut self) {
        for protocol in &mut self.protocols {
            protocol.scancodes.clear();
        }
    }

    /// Copy without protocols that have no scancodes.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            protocols: self
                .protocols
                .iter()
                .filter(|p| !p.scancodes.is_empty())
                .cloned()
                .collect(),
        }
    }
}

/// Where keymaps are loaded from and saved to.
pub trait KeymapStore {
    /// Load the keymap. A missing keymap is empty, not an error.
    fn load(&self) -> Result<Keymap>;

    /// Save the keymap.
    fn save(&self, keymap: &Keymap) -> Result<()>;

    /// Human-readable location, for messages.
    fn location(&self) -> String;
}

/// [`KeymapStore`] backed by a TOML file.
#[derive(Debug, Clone)]
pub struct TomlKeymapStore {
    path: PathBuf,
    trim: bool,
}

impl TomlKeymapStore {
    /// Store at `path`. With `trim`, empty protocol tables are dropped on
    /// save.
    ///
    /// `ir-keytable` crashes on keymaps with no protocols at all, so callers
    /// that may save an empty keymap should leave `trim` off.
    pub fn new(path: impl Into<PathBuf>, trim: bool) -> Self {
        Self {
            path: path.into(),
            trim,
        }
    }

    /// File path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeymapStore for TomlKeymapStore {
    fn load(&self) -> Result<Keymap> {
        if !self.path.exists() {
            return Ok(Keymap::default());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read keymap {}", self.path.display()))?;
        Keymap::from_toml(&text).with_context(|| format!("Invalid keymap {}", self.path.display()))
    }

    fn save(&self, keymap: &Keymap) -> Result<()> {
        let text = if self.trim {
            keymap.trimmed().to_toml()?
        } else {
            keymap.to_toml()?
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create keymap directory {}", parent.display())
                })?;
            }
        }
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write keymap {}", self.path.display()))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Validate a key name (`KEY_*` or `BTN_*`).
pub fn check_key_name(key: &str) -> Result<()> {
    let suffix = key.strip_prefix("KEY_").or_else(|| key.strip_prefix("BTN_"));
    if suffix.is_none_or(str::is_empty) {
        bail!("Invalid key name '{key}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[protocols]]
name = "remote"
protocol = "nec"

[protocols.scancodes]
0x45 = "KEY_POWER"
"070" = "KEY_UP"
"17" = "KEY_DOWN"

[[protocols]]
protocol = "rc-5"
"#;

    #[test]
    fn test_parse_scancode_bases() {
        assert_eq!(parse_scancode("0x1f").ok(), Some(31));
        assert_eq!(parse_scancode("0X1F").ok(), Some(31));
        assert_eq!(parse_scancode("017").ok(), Some(15));
        assert_eq!(parse_scancode("17").ok(), Some(17));
        assert_eq!(parse_scancode("0").ok(), Some(0));
        assert!(parse_scancode("0xzz").is_err());
    }

    #[test]
    fn test_load_sample() {
        let keymap = Keymap::from_toml(SAMPLE).expect("Should parse keymap");
        assert_eq!(keymap.protocols.len(), 2);
        assert_eq!(keymap.protocols[0].name.as_deref(), Some("remote"));
        assert_eq!(keymap.protocols[0].scancodes.get(&0x45).map(String::as_str), Some("KEY_POWER"));
        assert_eq!(keymap.protocols[0].scancodes.get(&56).map(String::as_str), Some("KEY_UP"));
        assert_eq!(keymap.protocols[0].scancodes.get(&17).map(String::as_str), Some("KEY_DOWN"));
        assert!(keymap.protocols[1].scancodes.is_empty());
    }

    #[test]
    fn test_scancodes_written_as_hex() {
        let mut keymap = Keymap::default();
        keymap.set_scancode(&ScanKey::new("nec", 5), "KEY_ENTER");
        let text = keymap.to_toml().expect("Should serialize");
        assert!(text.contains("0x05"), "{text}");

        let back = Keymap::from_toml(&text).expect("Should parse");
        assert_eq!(back, keymap);
    }

    #[test]
    fn test_set_clear_and_group() {
        let mut keymap = Keymap::from_toml(SAMPLE).expect("Should parse keymap");
        keymap.set_scancode(&ScanKey::new("rc-5", 0x10), "KEY_UP");
        keymap.set_scancode(&ScanKey::new("sony", 0x20), "KEY_ESC");
        assert_eq!(keymap.protocols.len(), 3);

        let by_key = keymap.by_key();
        assert_eq!(
            by_key.get("KEY_UP"),
            Some(&vec![ScanKey::new("nec", 56), ScanKey::new("rc-5", 0x10)])
        );

        keymap.clear_key("KEY_UP");
        assert!(!keymap.by_key().contains_key("KEY_UP"));
        assert!(keymap.by_key().contains_key("KEY_POWER"));

        keymap.clear_all();
        assert_eq!(keymap.scancodes().count(), 0);
        assert_eq!(keymap.protocols.len(), 3);
        assert!(keymap.trimmed().protocols.is_empty());
    }

    #[test]
    fn test_store_trim_and_missing_file() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("maps").join("remote.toml");

        let store = TomlKeymapStore::new(&path, true);
        assert_eq!(store.load().expect("Missing file is empty"), Keymap::default());

        let mut keymap = Keymap::from_toml(SAMPLE).expect("Should parse keymap");
        store.save(&keymap).expect("Should save");
        let loaded = store.load().expect("Should load");
        assert_eq!(loaded.protocols.len(), 1);
        assert_eq!(loaded.protocols[0].protocol, "nec");

        keymap.clear_all();
        TomlKeymapStore::new(&path, false)
            .save(&keymap)
            .expect("Should save untrimmed");
        let loaded = store.load().expect("Should load");
        assert_eq!(loaded.protocols.len(), 2);
    }

    #[test]
    fn test_scan_key_display_and_key_names() {
        assert_eq!(ScanKey::new("nec", 0x5).to_string(), "nec:0x05");
        assert_eq!(ScanKey::new("rc-6", 0x800f).to_string(), "rc-6:0x800f");
        assert!(check_key_name("KEY_UP").is_ok());
        assert!(check_key_name("KEY_").is_err());
        assert!(check_key_name("UP").is_err());
        assert!(check_key_name("BTN_LEFT").is_ok());

        let bad = "[[protocols]]\nprotocol = \"nec\"\n[protocols.scancodes]\n0x01 = \"UP\"\n";
        let err = Keymap::from_toml(bad).expect_err("Bad key name should fail");
        assert!(format!("{err:#}").contains("Invalid key name 'UP'"));
    }
}
