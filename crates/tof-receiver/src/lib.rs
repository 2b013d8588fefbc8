//! ToF Proximity Receiver
//!
//! The cane tip carries a VL53L0X time-of-flight sensor driven by a Pico,
//! which streams newline-delimited JSON over USB serial. This crate turns
//! that stream into the single question the safety loop asks every cycle:
//! "has a trigger distance arrived since I last looked?"

mod message;
mod receiver;

pub use message::{parse_line, TofMessage};
pub use receiver::{SimulatedTof, TofReceiver};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ToF receiver error types
#[derive(Error, Debug)]
pub enum TofError {
    #[error("Failed to open serial port {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("Serial reader stopped: {0}")]
    Disconnected(String),
}

/// Proximity sensor collaborator polled by the safety loop
pub trait ProximitySource: Send {
    /// Most recent trigger distance in metres, consumed on read.
    ///
    /// `Ok(None)` means no trigger arrived since the previous call.
    fn read_latest_distance(&mut self) -> Result<Option<f64>, TofError>;
}

/// ToF serial configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TofConfig {
    /// Serial device (e.g. "/dev/ttyACM0" on the Pi, "COM3" on Windows)
    pub serial_port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Periodic readings strictly below this distance count as triggers (mm)
    pub trigger_distance_mm: f64,
    /// Replay these distances (metres) instead of opening the serial port
    pub simulate_samples: Option<Vec<f64>>,
}

impl Default for TofConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyACM0".to_string(),
            baud_rate: 115_200,
            trigger_distance_mm: 2500.0,
            simulate_samples: None,
        }
    }
}
