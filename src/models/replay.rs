//! Replay payloads attached to record submissions.
//!
//! The hub does not simulate replays; it checks that a payload is sane and
//! stores it so other players can download and watch it.
//!
//! All timestamps are in **microseconds (i64)** for precision.

use serde::{Deserialize, Serialize};

/// Current replay format version for compatibility.
pub const REPLAY_FORMAT_VERSION: u8 = 4;

/// Hard cap on inputs in one replay.
pub const MAX_REPLAY_INPUTS: usize = 200_000;

pub const MIN_RATE: f64 = 0.5;
pub const MAX_RATE: f64 = 2.0;

/// A single user input (press or release).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayInput {
    /// Absolute time in microseconds since map start.
    pub time_us: i64,
    /// Packed data: (column << 1) | is_press
    /// Bit 0: is_press (1 = press, 0 = release)
    /// Bits 1-7: column index
    pub payload: u8,
}

impl ReplayInput {
    /// Unpack column and is_press from payload.
    #[inline]
    pub fn unpack(&self) -> (usize, bool) {
        let is_press = (self.payload & 1) != 0;
        let column = (self.payload >> 1) as usize;
        (column, is_press)
    }
}

/// Minimal replay data containing only raw inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayData {
    /// Format version for future compatibility.
    #[serde(default = "default_version")]
    pub version: u8,
    /// All user inputs in chronological order.
    pub inputs: Vec<ReplayInput>,
    /// Playback rate used during the play.
    #[serde(default = "default_rate")]
    pub rate: f64,
}

fn default_version() -> u8 {
    REPLAY_FORMAT_VERSION
}

fn default_rate() -> f64 {
    1.0
}

impl ReplayData {
    pub fn new(rate: f64) -> Self {
        Self {
            version: REPLAY_FORMAT_VERSION,
            inputs: Vec::new(),
            rate,
        }
    }

    /// Adds an input (press or release).
    #[cfg(test)]
    pub fn add_input(&mut self, time_us: i64, column: usize, is_press: bool) {
        let payload = ((column as u8) << 1) | (is_press as u8);
        self.inputs.push(ReplayInput { time_us, payload });
    }

    pub fn press_count(&self) -> usize {
        self.inputs.iter().filter(|i| i.unpack().1).count()
    }

    /// Checks the payload before it is written to disk.
    pub fn validate(&self) -> Result<(), String> {
        if self.version > REPLAY_FORMAT_VERSION {
            return Err(format!("Unsupported replay version {}", self.version));
        }
        if !(MIN_RATE..=MAX_RATE).contains(&self.rate) {
            return Err(format!(
                "Replay rate must be within {MIN_RATE}..={MAX_RATE}"
            ));
        }
        if self.inputs.len() > MAX_REPLAY_INPUTS {
            return Err(format!("Replay exceeds {MAX_REPLAY_INPUTS} inputs"));
        }
        if self.inputs.iter().any(|i| i.time_us < 0) {
            return Err("Replay inputs cannot have negative timestamps".to_string());
        }
        if self.inputs.windows(2).any(|w| w[1].time_us < w[0].time_us) {
            return Err("Replay inputs must be in chronological order".to_string());
        }
        Ok(())
    }
}

impl Default for ReplayData {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let mut replay = ReplayData::new(1.0);
        replay.add_input(1_000, 3, true);
        replay.add_input(2_000, 3, false);

        assert_eq!(replay.inputs[0].unpack(), (3, true));
        assert_eq!(replay.inputs[1].unpack(), (3, false));
        assert_eq!(replay.press_count(), 1);
    }

    #[test]
    fn test_validate_order() {
        let mut replay = ReplayData::new(1.0);
        replay.add_input(5_000, 0, true);
        replay.add_input(4_000, 0, false);
        assert!(replay.validate().is_err());
    }

    #[test]
    fn test_validate_rate() {
        let replay = ReplayData::new(3.0);
        assert!(replay.validate().is_err());
        assert!(ReplayData::new(1.5).validate().is_ok());
    }

    #[test]
    fn test_missing_fields_default() {
        let replay: ReplayData =
            serde_json::from_str(r#"{"inputs":[{"time_us":10,"payload":1}]}"#).unwrap();
        assert_eq!(replay.version, REPLAY_FORMAT_VERSION);
        assert_eq!(replay.rate, 1.0);
    }
}
