use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

pub const DEFAULT_DEVICE_ADDRESS: &str = "192.168.1.42";

/// Network address of the LED driver.
///
/// Opaque on purpose: a persisted value or a draft being edited may be
/// anything. Only [`DeviceAddress::is_submittable`] addresses may be committed
/// from the address editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Four dot separated groups of one to three ASCII digits. No range check
    /// per octet and no port.
    pub fn is_submittable(&self) -> bool {
        is_dotted_quad(&self.0)
    }
}

impl Default for DeviceAddress {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_ADDRESS)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

fn is_dotted_quad(raw: &str) -> bool {
    let groups: Vec<&str> = raw.split('.').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|group| (1..=3).contains(&group.len()) && group.bytes().all(|b| b.is_ascii_digit()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelName {
    Red,
    Green,
    Blue,
    ColdWhite,
    WarmWhite,
}

impl ChannelName {
    pub const ALL: [ChannelName; 5] = [
        ChannelName::Red,
        ChannelName::Green,
        ChannelName::Blue,
        ChannelName::ColdWhite,
        ChannelName::WarmWhite,
    ];

    /// Key used by the device in `channels` and in `/config` payloads.
    pub fn wire_key(self) -> &'static str {
        match self {
            ChannelName::Red => "red",
            ChannelName::Green => "green",
            ChannelName::Blue => "blue",
            ChannelName::ColdWhite => "cold",
            ChannelName::WarmWhite => "warm",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChannelName::Red => "Red",
            ChannelName::Green => "Green",
            ChannelName::Blue => "Blue",
            ChannelName::ColdWhite => "Cold White",
            ChannelName::WarmWhite => "Warm White",
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.wire_key())
    }
}

impl FromStr for ChannelName {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(ChannelName::Red),
            "green" => Ok(ChannelName::Green),
            "blue" => Ok(ChannelName::Blue),
            "cold" | "cold-white" => Ok(ChannelName::ColdWhite),
            "warm" | "warm-white" => Ok(ChannelName::WarmWhite),
            _ => Err(ValueError::UnknownChannel(s.to_string())),
        }
    }
}

/// Brightness of one channel. The `u8` representation keeps every value in
/// `0..=255`, including values decoded from the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelIntensity(u8);

impl ChannelIntensity {
    pub const MIN: ChannelIntensity = ChannelIntensity(0);
    pub const MAX: ChannelIntensity = ChannelIntensity(u8::MAX);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub fn percent(self) -> f32 {
        f32::from(self.0) / f32::from(u8::MAX) * 100.0
    }
}

impl From<u8> for ChannelIntensity {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for ChannelIntensity {
    type Error = ValueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| ValueError::IntensityOutOfRange(value))
    }
}

impl fmt::Display for ChannelIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    #[serde(rename = "ON")]
    On,
    #[default]
    #[serde(rename = "OFF")]
    Off,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        self == PowerState::On
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            PowerState::On => "ON",
            PowerState::Off => "OFF",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        })
    }
}

/// Last known device state. Replaced wholesale on every update, never edited
/// in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub power: PowerState,
    pub channels: BTreeMap<String, ChannelIntensity>,
}

impl Default for DeviceSnapshot {
    fn default() -> Self {
        Self {
            power: PowerState::Off,
            channels: ChannelName::ALL
                .iter()
                .map(|name| (name.wire_key().to_string(), ChannelIntensity::MIN))
                .collect(),
        }
    }
}

impl DeviceSnapshot {
    /// New snapshot with `power` replaced and `channels` written over the
    /// current mapping. Keys absent from `channels` keep their value.
    pub fn merged<'a>(
        &self,
        power: PowerState,
        channels: impl IntoIterator<Item = (&'a String, &'a ChannelIntensity)>,
    ) -> Self {
        let mut next = self.channels.clone();
        for (key, value) in channels {
            next.insert(key.clone(), *value);
        }
        Self {
            power,
            channels: next,
        }
    }

    pub fn with_channel(&self, channel: ChannelName, value: ChannelIntensity) -> Self {
        let mut next = self.clone();
        next.channels.insert(channel.wire_key().to_string(), value);
        next
    }

    pub fn channel(&self, channel: ChannelName) -> ChannelIntensity {
        self.channels
            .get(channel.wire_key())
            .copied()
            .unwrap_or(ChannelIntensity::MIN)
    }
}
