//! ==============================================================================
//! posture.rs - headrest distance classifier
//! ==============================================================================
//!
//! the headrest module measures head-to-headrest distance with an ultrasonic
//! sensor and turns it into a status label:
//!
//!     seat vacant            -> IDLE (distance reported as 0)
//!     distance < normal_cm   -> GOOD POSTURE
//!     distance > slouch_cm   -> SLOUCH DETECTED
//!     in between             -> no update (keeps the previous status showing)
//!
//! ==============================================================================

use serde::Deserialize;

use crate::domain::{GOOD_POSTURE, IDLE, SLOUCH_DETECTED};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    pub normal_cm: f64,
    pub slouch_cm: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { normal_cm: 25.0, slouch_cm: 40.0 }
    }
}

/// a status label and the distance to publish with it
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub status: &'static str,
    pub distance_cm: f64,
}

pub fn classify(distance_cm: f64, seated: bool, t: &Thresholds) -> Option<Classified> {
    if !seated {
        return Some(Classified { status: IDLE, distance_cm: 0.0 });
    }

    // bands use the raw reading; only the published value is rounded
    let status = if distance_cm > t.slouch_cm {
        SLOUCH_DETECTED
    } else if distance_cm < t.normal_cm {
        GOOD_POSTURE
    } else {
        return None;
    };
    Some(Classified { status, distance_cm: round_distance(distance_cm) })
}

/// two decimal places, as the sensor reports
pub fn round_distance(distance_cm: f64) -> f64 {
    (distance_cm * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bands() {
        let t = Thresholds::default();
        assert_eq!(classify(12.0, true, &t).unwrap().status, GOOD_POSTURE);
        assert_eq!(classify(45.0, true, &t).unwrap().status, SLOUCH_DETECTED);
        assert_eq!(classify(25.0, true, &t), None);
        assert_eq!(classify(32.0, true, &t), None);
        assert_eq!(classify(40.0, true, &t), None);
    }

    #[test]
    fn test_vacant_seat_is_idle_at_zero() {
        let t = Thresholds::default();
        assert_eq!(
            classify(80.0, false, &t),
            Some(Classified { status: IDLE, distance_cm: 0.0 })
        );
    }

    #[test]
    fn test_distance_rounded() {
        let t = Thresholds::default();
        assert_eq!(classify(41.23456, true, &t).unwrap().distance_cm, 41.23);
        assert_eq!(round_distance(9.999), 10.0);
    }

    #[test]
    fn test_bands_compare_unrounded_distance() {
        let t = Thresholds::default();
        assert_eq!(
            classify(40.004, true, &t),
            Some(Classified { status: SLOUCH_DETECTED, distance_cm: 40.0 })
        );
        assert_eq!(
            classify(24.996, true, &t),
            Some(Classified { status: GOOD_POSTURE, distance_cm: 25.0 })
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let t = Thresholds { normal_cm: 10.0, slouch_cm: 20.0 };
        assert_eq!(classify(15.0, true, &t), None);
        assert_eq!(classify(21.0, true, &t).unwrap().status, SLOUCH_DETECTED);
    }
}
