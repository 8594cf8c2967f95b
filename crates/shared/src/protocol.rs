use std::collections::BTreeMap;

use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::domain::{ChannelIntensity, ChannelName, DeviceSnapshot, PowerState};

pub const STATUS_PATH: &str = "/";
pub const CONFIG_PATH: &str = "/config";

/// Status response. Decoding is the schema check: `status` must be `ON` or
/// `OFF` and every channel value must fit in `0..=255`. Devices that omit
/// `channels` decode with an empty map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub status: PowerState,
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelIntensity>,
}

impl DeviceStatus {
    pub fn from_snapshot(snapshot: &DeviceSnapshot) -> Self {
        Self {
            status: snapshot.power,
            channels: snapshot.channels.clone(),
        }
    }

    pub fn apply_to(&self, previous: &DeviceSnapshot) -> DeviceSnapshot {
        previous.merged(self.status, &self.channels)
    }
}

/// `/config` payload: a single `{"<channel>": <value>}` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelWrite {
    pub channel: ChannelName,
    pub value: ChannelIntensity,
}

impl Serialize for ChannelWrite {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.channel.wire_key(), &self.value)?;
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAck {
    pub success: bool,
}
