//! Drop and step detection from the downward ToF distance

use cane_events::{Direction, Event, EventSource, Severity};
use tracing::{debug, warn};

use crate::HazardConfig;

/// Maps one proximity reading to zero or one ground-hazard event
pub struct DistanceClassifier {
    drop_min_m: f64,
    step_min_m: f64,
    step_down_min_m: f64,
    drop_max_m: f64,
}

impl DistanceClassifier {
    pub fn new(config: &HazardConfig) -> Self {
        Self {
            drop_min_m: config.drop_min_m,
            step_min_m: config.step_min_m,
            step_down_min_m: config.step_down_min_m,
            drop_max_m: config.drop_max_m,
        }
    }

    /// Classify a distance; bands are checked in ascending order
    pub fn classify(&self, distance_m: Option<f64>) -> Vec<Event> {
        let Some(distance) = distance_m.filter(|d| *d > 0.0) else {
            return Vec::new();
        };

        let (kind, severity) = if distance <= self.drop_min_m {
            ("tof.drop", Severity::Critical)
        } else if distance <= self.step_min_m {
            ("tof.step", Severity::Mid)
        } else if distance <= self.step_down_min_m {
            ("tof.step_down", Severity::High)
        } else if distance <= self.drop_max_m {
            ("tof.drop", Severity::High)
        } else {
            return Vec::new();
        };

        debug!("Distance {:.3} m classified as {} ({})", distance, kind, severity);
        match Event::builder(kind, EventSource::Tof, severity)
            .distance_m(distance)
            .direction(Direction::Down)
            .build()
        {
            Ok(event) => vec![event],
            Err(e) => {
                warn!("Dropping ToF event: {}", e);
                Vec::new()
            }
        }
    }
}

impl Default for DistanceClassifier {
    fn default() -> Self {
        Self::new(&HazardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn single(d: f64) -> Event {
        let events = DistanceClassifier::default().classify(Some(d));
        assert_eq!(events.len(), 1, "expected one event for {}", d);
        events.into_iter().next().unwrap()
    }

    #[test]
    fn test_band_edges() {
        let e = single(0.05);
        assert_eq!((e.kind(), e.severity()), ("tof.drop", Severity::Critical));

        let e = single(0.10);
        assert_eq!((e.kind(), e.severity()), ("tof.step", Severity::Mid));

        let e = single(0.20);
        assert_eq!((e.kind(), e.severity()), ("tof.step_down", Severity::High));

        let e = single(0.40);
        assert_eq!((e.kind(), e.severity()), ("tof.drop", Severity::High));
    }

    #[test]
    fn test_event_shape() {
        let e = single(0.3);
        assert_eq!(e.source(), EventSource::Tof);
        assert_eq!(e.direction(), Some(Direction::Down));
        assert_eq!(e.distance_m(), Some(0.3));
    }

    #[test]
    fn test_no_event_outside_bands() {
        let classifier = DistanceClassifier::default();
        assert!(classifier.classify(Some(1.5)).is_empty());
        assert!(classifier.classify(Some(0.41)).is_empty());
        assert!(classifier.classify(Some(0.0)).is_empty());
        assert!(classifier.classify(Some(-0.2)).is_empty());
        assert!(classifier.classify(None).is_empty());
    }

    proptest! {
        #[test]
        fn prop_touching_edge_is_critical_drop(d in 0.0001f64..=0.05) {
            let events = DistanceClassifier::default().classify(Some(d));
            prop_assert_eq!(events.len(), 1);
            prop_assert_eq!(events[0].kind(), "tof.drop");
            prop_assert_eq!(events[0].severity(), Severity::Critical);
        }

        #[test]
        fn prop_step_down_band(d in 0.1001f64..=0.20) {
            let events = DistanceClassifier::default().classify(Some(d));
            prop_assert_eq!(events.len(), 1);
            prop_assert_eq!(events[0].kind(), "tof.step_down");
            prop_assert_eq!(events[0].severity(), Severity::High);
        }

        #[test]
        fn prop_beyond_drop_max_is_quiet(d in 0.4001f64..100.0) {
            prop_assert!(DistanceClassifier::default().classify(Some(d)).is_empty());
        }

        #[test]
        fn prop_at_most_one_event(d in -1.0f64..5.0) {
            prop_assert!(DistanceClassifier::default().classify(Some(d)).len() <= 1);
        }
    }
}
