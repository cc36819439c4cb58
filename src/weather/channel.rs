//! Data channel payloads
//!
//! The companion writes a buffer of data events to the weather characteristic
//! as one postcard frame. Every event addresses a path and carries a small
//! key/value map; the face only reads the `/weather` item.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use super::{Temperature, WeatherSnapshot};

/// Path of the weather data item
pub const WEATHER_PATH: &str = "/weather";
/// High temperature, text
pub const HIGH_TEMPERATURE: &str = "high_temperature";
/// Low temperature, text. The key is spelled like this on the phone side.
pub const LOW_TEMPERATURE: &str = "low_tempersture";
/// OpenWeatherMap condition code, integer
pub const WEATHER_ID: &str = "weather_id";

/// Events in one buffer
pub const MAX_EVENTS: usize = 4;
/// Entries in one data map
pub const MAX_ENTRIES: usize = 8;

pub type Key = String<24>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataEventKind {
    Changed,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataValue {
    Text(Temperature),
    Int(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEvent {
    pub kind: DataEventKind,
    pub path: String<32>,
    pub entries: Vec<(Key, DataValue), MAX_ENTRIES>,
}

pub type DataEventBuffer = Vec<DataEvent, MAX_EVENTS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Frame could not be decoded
    Malformed,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Malformed => f.write_str("malformed data event buffer"),
        }
    }
}

impl From<postcard::Error> for Error {
    fn from(_: postcard::Error) -> Self {
        Error::Malformed
    }
}

/// Decode a data event buffer
pub fn decode(bytes: &[u8]) -> Result<DataEventBuffer, Error> {
    Ok(postcard::from_bytes(bytes)?)
}

impl DataEvent {
    pub fn text(&self, key: &str) -> Option<&Temperature> {
        self.entries.iter().find_map(|(k, v)| match v {
            DataValue::Text(text) if k.as_str() == key => Some(text),
            _ => None,
        })
    }

    pub fn int(&self, key: &str) -> Option<i32> {
        self.entries.iter().find_map(|(k, v)| match v {
            DataValue::Int(value) if k.as_str() == key => Some(*value),
            _ => None,
        })
    }

    /// Weather carried by this event, if it is a change of the weather item
    pub fn weather(&self) -> Option<WeatherSnapshot> {
        if self.kind != DataEventKind::Changed || self.path.as_str() != WEATHER_PATH {
            return None;
        }

        Some(WeatherSnapshot {
            high_temperature: self.text(HIGH_TEMPERATURE).cloned(),
            low_temperature: self.text(LOW_TEMPERATURE).cloned(),
            condition_id: self.int(WEATHER_ID),
        })
    }
}

/// Weather updates in a buffer, in arrival order
pub fn weather_updates(events: &[DataEvent]) -> impl Iterator<Item = WeatherSnapshot> + '_ {
    events.iter().filter_map(|event| {
        let update = event.weather();
        if update.is_none() {
            crate::debug!("Ignoring data event at {}", event.path.as_str());
        }
        update
    })
}
