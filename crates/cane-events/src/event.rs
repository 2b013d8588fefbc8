//! Hazard event record

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::EventError;

/// Ordinal hazard level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    Low,
    Mid,
    High,
    Critical,
}

impl Severity {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Mid => "mid",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// `mid` or above: spoken and tracked in the danger window
    pub fn is_danger(&self) -> bool {
        *self >= Severity::Mid
    }

    /// `high` or above: eligible for a caregiver notification
    pub fn notifies_caregiver(&self) -> bool {
        *self >= Severity::High
    }
}

impl FromStr for Severity {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "mid" => Ok(Severity::Mid),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(EventError::InvalidSeverity(other.to_string())),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = EventError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensor that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum EventSource {
    Camera,
    Tof,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Camera => "camera",
            EventSource::Tof => "tof",
        }
    }
}

impl TryFrom<String> for EventSource {
    type Error = EventError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "camera" => Ok(EventSource::Camera),
            "tof" => Ok(EventSource::Tof),
            _ => Err(EventError::InvalidSource(value)),
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bearing of a hazard relative to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Direction {
    Left,
    Center,
    Right,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Center => "center",
            Direction::Right => "right",
            Direction::Down => "down",
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = EventError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "left" => Ok(Direction::Left),
            "center" => Ok(Direction::Center),
            "right" => Ok(Direction::Right),
            "down" => Ok(Direction::Down),
            _ => Err(EventError::InvalidDirection(value)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a detected hazard
///
/// Fields are read-only once built; consumers share events by clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    event_id: String,
    #[serde(rename = "ts", alias = "timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: String,
    source: EventSource,
    severity: Severity,
    #[serde(default)]
    distance_m: Option<f64>,
    #[serde(default)]
    direction: Option<Direction>,
    #[serde(default)]
    object_label: Option<String>,
    #[serde(default)]
    extra: BTreeMap<String, Value>,
}

impl Event {
    /// Start building an event stamped with a fresh id and the current UTC time
    pub fn builder(kind: impl Into<String>, source: EventSource, severity: Severity) -> EventBuilder {
        EventBuilder {
            event: Event {
                event_id: Uuid::new_v4().to_string(),
                timestamp: Utc::now(),
                kind: kind.into(),
                source,
                severity,
                distance_m: None,
                direction: None,
                object_label: None,
                extra: BTreeMap::new(),
            },
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Dotted category, e.g. `vision.person` or `tof.drop`
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn source(&self) -> EventSource {
        self.source
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn distance_m(&self) -> Option<f64> {
        self.distance_m
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn object_label(&self) -> Option<&str> {
        self.object_label.as_deref()
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    /// Object label, or the last segment of the dotted type when unlabeled
    pub fn label(&self) -> &str {
        self.object_label
            .as_deref()
            .unwrap_or_else(|| self.kind.rsplit('.').next().unwrap_or(&self.kind))
    }

    /// Structured mapping form (timestamp as RFC 3339)
    pub fn to_value(&self) -> Value {
        // Every field is a plain string, number or map, so this cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decode from the structured mapping form, re-validating every field
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        let event: Event =
            serde_json::from_value(value).map_err(|e| EventError::Malformed(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }

    /// Serialize to JSON text
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Parse from JSON text
    pub fn from_json(text: &str) -> Result<Self, EventError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| EventError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    fn validate(&self) -> Result<(), EventError> {
        match self.distance_m {
            Some(d) if !d.is_finite() => Err(EventError::NonFiniteDistance(d)),
            Some(d) if d < 0.0 => Err(EventError::NegativeDistance(d)),
            _ => Ok(()),
        }
    }
}

/// Builder for [`Event`]
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    /// Override the generated id (fixtures and replays)
    pub fn event_id(mut self, id: impl Into<String>) -> Self {
        self.event.event_id = id.into();
        self
    }

    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.event.timestamp = ts;
        self
    }

    pub fn distance_m(mut self, distance: f64) -> Self {
        self.event.distance_m = Some(distance);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.event.direction = Some(direction);
        self
    }

    pub fn object_label(mut self, label: impl Into<String>) -> Self {
        self.event.object_label = Some(label.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.extra.insert(key.into(), value.into());
        self
    }

    /// Validate and freeze the event
    pub fn build(self) -> Result<Event, EventError> {
        self.event.validate()?;
        Ok(self.event)
    }
}
