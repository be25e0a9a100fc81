//! Persisted user settings
//!
//! The handful of settings a user can change at runtime (timing, indicator
//! behavior, a forced host OS) are kept in a single versioned record.  It is
//! stored as a tagged CBOR map, so fields can be added later without
//! breaking older records, followed by a CRC-16 of the CBOR bytes.
//!
//! Where the bytes live is up to the board; it provides a [`SettingsStore`].

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use crc::{Crc, CRC_16_IBM_SDLC};
use minicbor::{Decode, Encode};

use crate::host::HostOs;
use crate::keymap::{Keymap, Timing};
use crate::log::{info, warn};

/// The record format this code reads and writes.
pub const SETTINGS_VERSION: u16 = 1;

/// CBOR tag on the settings record, "hlcsetg".
pub const SETTINGS_TAG: u64 = 0x686c6373657467;

/// The CRC used on the stored record.
pub const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Identifies a record in the settings store.
pub type SettingsKey = u16;

/// Where the user settings record is stored.
pub const USER_SETTINGS: SettingsKey = 0x0001;

/// The persistent settings storage, outside of this crate.
pub trait SettingsStore {
    fn get(&self, key: SettingsKey) -> Option<Vec<u8>>;
    /// Store a record, returning false if the store couldn't take it.
    fn set(&mut self, key: SettingsKey, data: &[u8]) -> bool;
}

/// An in-memory store.
impl SettingsStore for BTreeMap<SettingsKey, Vec<u8>> {
    fn get(&self, key: SettingsKey) -> Option<Vec<u8>> {
        BTreeMap::get(self, &key).cloned()
    }

    fn set(&mut self, key: SettingsKey, data: &[u8]) -> bool {
        self.insert(key, data.to_vec());
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cbor(tag(0x686c6373657467))]
#[cbor(map)]
pub struct Settings {
    #[n(0)]
    pub version: u16,
    #[n(1)]
    pub timing: Timing,
    #[n(2)]
    pub indicator: IndicatorSettings,
    #[n(3)]
    pub host: HostSettings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cbor(map)]
pub struct IndicatorSettings {
    /// Show the active layer on the indicator LEDs.
    #[n(0)]
    pub layer_change: bool,
    #[n(1)]
    pub brightness: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cbor(map)]
pub struct HostSettings {
    /// Use this host instead of waiting for detection.
    #[n(0)]
    pub os_override: Option<HostOs>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: SETTINGS_VERSION,
            timing: Timing::default(),
            indicator: IndicatorSettings {
                layer_change: true,
                brightness: 128,
            },
            host: HostSettings { os_override: None },
        }
    }
}

impl Settings {
    /// The stored form: CBOR followed by the CRC, little endian.
    pub fn encode(&self) -> Result<Vec<u8>, SettingsError> {
        let mut buf = minicbor::to_vec(self).map_err(|_| SettingsError::Encode)?;
        let crc = CRC.checksum(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Settings, SettingsError> {
        if data.len() < 3 {
            return Err(SettingsError::TooShort);
        }
        let (body, crc) = data.split_at(data.len() - 2);
        if CRC.checksum(body) != u16::from_le_bytes([crc[0], crc[1]]) {
            return Err(SettingsError::Crc);
        }
        let settings: Settings = minicbor::decode(body).map_err(|_| SettingsError::Malformed)?;
        if settings.version != SETTINGS_VERSION {
            return Err(SettingsError::UnsupportedVersion(settings.version));
        }
        Ok(settings)
    }

    /// Read the settings from the store, falling back to the defaults.
    pub fn load(store: &dyn SettingsStore) -> Settings {
        match store.get(USER_SETTINGS) {
            None => {
                info!("no stored settings, using defaults");
                Settings::default()
            }
            Some(data) => match Settings::decode(&data) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("stored settings unusable ({}), using defaults", e);
                    Settings::default()
                }
            },
        }
    }

    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<(), SettingsError> {
        let data = self.encode()?;
        if store.set(USER_SETTINGS, &data) {
            Ok(())
        } else {
            Err(SettingsError::StoreRejected)
        }
    }

    /// Push the settings that live in the keymap into it.
    pub fn apply(&self, keymap: &mut Keymap) {
        keymap.timing = self.timing;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsError {
    TooShort,
    Crc,
    Malformed,
    UnsupportedVersion(u16),
    Encode,
    StoreRejected,
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::TooShort => write!(f, "record too short"),
            SettingsError::Crc => write!(f, "CRC mismatch"),
            SettingsError::Malformed => write!(f, "malformed record"),
            SettingsError::UnsupportedVersion(v) => write!(f, "unsupported version {}", v),
            SettingsError::Encode => write!(f, "unable to encode"),
            SettingsError::StoreRejected => write!(f, "store rejected the record"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SettingsError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", defmt::Display2Format(self))
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SettingsError {}
