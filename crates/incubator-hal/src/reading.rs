//! Replaces the duck-typed "float or the string `NC`" sensor value with a
//! sum type. A `Reading` is either a finite numeric value or the explicit
//! "not connected" fault marker — there is no third state a caller can
//! forget to handle.

/// A single sensor reading, or the fault marker for a missing, timed-out,
/// or implausible one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reading {
    Value(f64),
    NotConnected,
}

impl Reading {
    pub fn is_connected(&self) -> bool {
        matches!(self, Reading::Value(_))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            Reading::NotConnected => None,
        }
    }
}

impl From<Option<f64>> for Reading {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Reading::Value(v),
            _ => Reading::NotConnected,
        }
    }
}

/// A dual-channel reading from a two-RTD probe hub. The temperature loop
/// uses `ch1`/`ch2` together: mean when both are connected, the surviving
/// channel alone in degraded mode, fault when both are gone.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DualReading {
    pub ch1: Reading,
    pub ch2: Reading,
}

impl DualReading {
    pub fn both_disconnected(&self) -> bool {
        !self.ch1.is_connected() && !self.ch2.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_conversion_collapses_nan_and_none() {
        assert_eq!(Reading::from(Some(36.5)), Reading::Value(36.5));
        assert_eq!(Reading::from(None), Reading::NotConnected);
        assert_eq!(Reading::from(Some(f64::NAN)), Reading::NotConnected);
        assert_eq!(Reading::from(Some(f64::INFINITY)), Reading::NotConnected);
    }

    #[test]
    fn dual_reading_both_disconnected() {
        let d = DualReading {
            ch1: Reading::NotConnected,
            ch2: Reading::NotConnected,
        };
        assert!(d.both_disconnected());
        let d = DualReading {
            ch1: Reading::Value(1.0),
            ch2: Reading::NotConnected,
        };
        assert!(!d.both_disconnected());
    }
}
