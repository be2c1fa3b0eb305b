//! Parsing of the sensor board's text protocol.
//!
//! The board prints one value per line in blocks:
//!
//! ```text
//! Humidity: 65.4 %
//! Temperature: 23.5 °C
//! Light: 450.2 lux
//! Sound: 1245
//! Gas (MQ135): 678
//! --------------------------
//! ```

use crate::collector::types::{Engagement, EnvironmentalValues, RawReading, Sensor};
use chrono::Utc;

/// Parse one protocol line into a sensor value.
///
/// Labels are matched case-insensitively. Any label starting with `gas`
/// (e.g. `Gas (MQ135)`) is the gas sensor. Lines that carry no recognised
/// label or no leading number after the colon are ignored.
pub fn parse_sensor_line(line: &str) -> Option<(Sensor, f64)> {
    let (label, rest) = line.trim().split_once(':')?;
    let label = label.trim().to_lowercase();

    let sensor = if label == "humidity" {
        Sensor::Humidity
    } else if label == "temperature" {
        Sensor::Temperature
    } else if label == "light" {
        Sensor::Light
    } else if label == "sound" {
        Sensor::Sound
    } else if label.starts_with("gas") {
        Sensor::Gas
    } else {
        return None;
    };

    // Sound and gas are integer ADC counts on the board
    let integer_only = matches!(sensor, Sensor::Sound | Sensor::Gas);
    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || (c == '.' && !integer_only)))
        .unwrap_or(rest.len());

    rest[..end].parse::<f64>().ok().map(|value| (sensor, value))
}

/// Whether a line is a block delimiter.
pub fn is_delimiter(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-')
}

/// Accumulates per-sensor lines into complete readings.
#[derive(Debug, Default)]
pub struct ReadingAssembler {
    latest: [Option<f64>; 5],
    updated_since_emit: [bool; 5],
}

impl ReadingAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns a reading when a full block has been seen.
    ///
    /// A reading is emitted once all five sensors have reported since the
    /// previous emission, or when a delimiter closes a block that updated at
    /// least one sensor while every sensor has a known value.
    pub fn feed_line(
        &mut self,
        line: &str,
        engagement: Option<Engagement>,
    ) -> Option<RawReading> {
        if is_delimiter(line) {
            let any_update = self.updated_since_emit.iter().any(|&u| u);
            return if any_update && self.latest.iter().all(Option::is_some) {
                self.emit(engagement)
            } else {
                None
            };
        }

        let (sensor, value) = parse_sensor_line(line)?;
        let index = Self::index(sensor);
        self.latest[index] = Some(value);
        self.updated_since_emit[index] = true;

        if self.updated_since_emit.iter().all(|&u| u) {
            self.emit(engagement)
        } else {
            None
        }
    }

    /// Latest known value per sensor.
    pub fn latest(&self, sensor: Sensor) -> Option<f64> {
        self.latest[Self::index(sensor)]
    }

    fn emit(&mut self, engagement: Option<Engagement>) -> Option<RawReading> {
        let values: Option<Vec<f64>> = self.latest.iter().copied().collect();
        let environment = EnvironmentalValues::from_slice(&values?)?;
        self.updated_since_emit = [false; 5];
        let raw = RawReading::from_environment(Utc::now(), environment);
        Some(match engagement {
            Some(engagement) => raw.with_engagement_defaults(engagement),
            None => raw,
        })
    }

    fn index(sensor: Sensor) -> usize {
        Sensor::ALL
            .iter()
            .position(|&s| s == sensor)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_lines() {
        assert_eq!(
            parse_sensor_line("Humidity: 65.4 %"),
            Some((Sensor::Humidity, 65.4))
        );
        assert_eq!(
            parse_sensor_line("  temperature: 23.5 °C"),
            Some((Sensor::Temperature, 23.5))
        );
        assert_eq!(
            parse_sensor_line("Light: 450.2 lux"),
            Some((Sensor::Light, 450.2))
        );
        assert_eq!(parse_sensor_line("Sound: 1245"), Some((Sensor::Sound, 1245.0)));
        assert_eq!(
            parse_sensor_line("Gas (MQ135): 678"),
            Some((Sensor::Gas, 678.0))
        );
    }

    #[test]
    fn test_parse_ignores_noise() {
        assert_eq!(parse_sensor_line("--------------------------"), None);
        assert_eq!(parse_sensor_line("Booting sensor board"), None);
        assert_eq!(parse_sensor_line("Pressure: 1013"), None);
        assert_eq!(parse_sensor_line("Temperature: n/a"), None);
    }

    #[test]
    fn test_assembler_emits_after_full_block() {
        let mut assembler = ReadingAssembler::new();
        let engagement = Some(Engagement {
            occupancy: 10,
            high_engagement: 7,
            low_engagement: 2,
        });

        let lines = [
            "Humidity: 45.0 %",
            "Temperature: 23.0 °C",
            "Light: 200.0 lux",
            "Sound: 45",
        ];
        for line in lines {
            assert!(assembler.feed_line(line, engagement).is_none());
        }

        let raw = assembler.feed_line("Gas (MQ135): 600", engagement).unwrap();
        assert_eq!(raw.temperature, Some(23.0));
        assert_eq!(raw.gas, Some(600.0));
        assert_eq!(raw.high_engagement, Some(7));
        assert!(raw.missing_fields().is_empty());

        // The closing delimiter of an already emitted block adds nothing
        assert!(assembler.feed_line("-----", engagement).is_none());

        // A partial block is completed with the last known values
        assert!(assembler.feed_line("Sound: 52", engagement).is_none());
        let raw = assembler.feed_line("-----", engagement).unwrap();
        assert_eq!(raw.sound, Some(52.0));
        assert_eq!(raw.humidity, Some(45.0));
    }

    #[test]
    fn test_integer_sensors_truncate_fraction() {
        assert_eq!(parse_sensor_line("Sound: 12.5"), Some((Sensor::Sound, 12.0)));
    }

    #[test]
    fn test_delimiter_before_all_sensors_known() {
        let mut assembler = ReadingAssembler::new();
        assembler.feed_line("Humidity: 45.0 %", None);
        assert!(assembler.feed_line("----------", None).is_none());
        assert_eq!(assembler.latest(Sensor::Humidity), Some(45.0));
    }

    #[test]
    fn test_no_engagement_leaves_fields_empty() {
        let mut assembler = ReadingAssembler::new();
        for line in [
            "Humidity: 45.0 %",
            "Temperature: 23.0 °C",
            "Light: 200.0 lux",
            "Sound: 45",
        ] {
            assert!(assembler.feed_line(line, None).is_none());
        }
        let raw = assembler.feed_line("Gas (MQ135): 600", None).unwrap();
        assert_eq!(raw.gas, Some(600.0));
        assert_eq!(raw.high_engagement, None);
        assert!(raw.missing_fields().contains(&"occupancy"));
    }
}
