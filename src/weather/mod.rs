//! Weather data received from the companion phone

use heapless::String;

pub mod channel;

/// Capacity of a temperature label in bytes
pub const TEMPERATURE_LEN: usize = 16;

pub type Temperature = String<TEMPERATURE_LEN>;

/// Latest weather report.
///
/// Always replaced as a whole by the data channel, the face only shows it when
/// every field is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherSnapshot {
    pub high_temperature: Option<Temperature>,
    pub low_temperature: Option<Temperature>,
    /// OpenWeatherMap condition code
    pub condition_id: Option<i32>,
}

/// A snapshot with every field present
pub struct CompleteWeather<'a> {
    pub high_temperature: &'a str,
    pub low_temperature: &'a str,
    pub condition: Condition,
}

impl WeatherSnapshot {
    pub fn new(high: &str, low: &str, condition_id: i32) -> Self {
        Self {
            high_temperature: String::try_from(high).ok(),
            low_temperature: String::try_from(low).ok(),
            condition_id: Some(condition_id),
        }
    }

    /// All three fields with a known condition, or nothing
    pub fn complete(&self) -> Option<CompleteWeather<'_>> {
        let high = self.high_temperature.as_ref()?;
        let low = self.low_temperature.as_ref()?;
        let condition = Condition::from_id(self.condition_id?)?;

        Some(CompleteWeather {
            high_temperature: high.as_str(),
            low_temperature: low.as_str(),
            condition,
        })
    }
}

/// Weather condition groups, one icon each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Condition {
    Storm,
    LightRain,
    Rain,
    Snow,
    Fog,
    Clear,
    LightClouds,
    Clouds,
}

impl Condition {
    /// Group an OpenWeatherMap condition code.
    ///
    /// See <https://openweathermap.org/weather-conditions>. Codes outside the
    /// known groups have no icon.
    pub fn from_id(id: i32) -> Option<Self> {
        let condition = match id {
            200..=232 => Condition::Storm,
            300..=321 => Condition::LightRain,
            500..=504 => Condition::Rain,
            511 => Condition::Snow,
            520..=531 => Condition::Rain,
            600..=622 => Condition::Snow,
            701..=761 => Condition::Fog,
            781 => Condition::Storm,
            800 => Condition::Clear,
            801 => Condition::LightClouds,
            802..=804 => Condition::Clouds,
            _ => return None,
        };
        Some(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_groups() {
        assert_eq!(Condition::from_id(211), Some(Condition::Storm));
        assert_eq!(Condition::from_id(310), Some(Condition::LightRain));
        assert_eq!(Condition::from_id(502), Some(Condition::Rain));
        assert_eq!(Condition::from_id(511), Some(Condition::Snow));
        assert_eq!(Condition::from_id(521), Some(Condition::Rain));
        assert_eq!(Condition::from_id(601), Some(Condition::Snow));
        assert_eq!(Condition::from_id(761), Some(Condition::Fog));
        assert_eq!(Condition::from_id(781), Some(Condition::Storm));
        assert_eq!(Condition::from_id(800), Some(Condition::Clear));
        assert_eq!(Condition::from_id(801), Some(Condition::LightClouds));
        assert_eq!(Condition::from_id(804), Some(Condition::Clouds));
        assert_eq!(Condition::from_id(0), None);
        assert_eq!(Condition::from_id(900), None);
        assert_eq!(Condition::from_id(-1), None);
    }

    #[test]
    fn test_unmapped_condition_is_incomplete() {
        for id in [0, 900, -1] {
            assert!(WeatherSnapshot::new("72°", "58°", id).complete().is_none());
        }
    }

    #[test]
    fn test_complete_needs_every_field() {
        let full = WeatherSnapshot::new("72°", "58°", 800);
        let weather = full.complete().unwrap();
        assert_eq!(weather.high_temperature, "72°");
        assert_eq!(weather.low_temperature, "58°");
        assert_eq!(weather.condition, Condition::Clear);

        let mut partial = full.clone();
        partial.high_temperature = None;
        assert!(partial.complete().is_none());

        let mut partial = full.clone();
        partial.low_temperature = None;
        assert!(partial.complete().is_none());

        let mut partial = full;
        partial.condition_id = None;
        assert!(partial.complete().is_none());

        assert!(WeatherSnapshot::default().complete().is_none());
    }
}
