//! Pico serial line protocol

use serde::Deserialize;

/// Raw JSON object as written by the Pico firmware
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    event: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    d_mm: Option<f64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Decoded firmware message
#[derive(Debug, Clone, PartialEq)]
pub enum TofMessage {
    /// Firmware-side trigger, always acted on
    Trigger { d_mm: f64 },
    /// Periodic reading, a trigger only when inside the trigger distance
    Reading { d_mm: f64 },
    /// Boot, retry, warn, error and other lifecycle notices
    Status { event: String, detail: Option<String> },
}

impl TofMessage {
    /// Trigger distance in metres, if this message should wake the camera
    pub fn trigger_distance_m(&self, trigger_distance_mm: f64) -> Option<f64> {
        match *self {
            TofMessage::Trigger { d_mm } => Some(d_mm / 1000.0),
            // 8191 is the sensor's out-of-range value and falls outside the band.
            TofMessage::Reading { d_mm } if d_mm > 0.0 && d_mm < trigger_distance_mm => {
                Some(d_mm / 1000.0)
            }
            _ => None,
        }
    }
}

/// Parse one serial line; blank or malformed lines yield `None`
pub fn parse_line(line: &str) -> Option<TofMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let raw: RawMessage = serde_json::from_str(line).ok()?;

    match (raw.event.as_deref(), raw.kind.as_deref(), raw.d_mm) {
        (Some("trigger"), _, Some(d_mm)) => Some(TofMessage::Trigger { d_mm }),
        (_, Some("tof"), Some(d_mm)) => Some(TofMessage::Reading { d_mm }),
        (Some(event), _, _) if event != "trigger" => Some(TofMessage::Status {
            event: event.to_string(),
            detail: raw.detail.or(raw.msg),
        }),
        _ => None,
    }
}
