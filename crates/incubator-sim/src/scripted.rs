use incubator_hal::{DualReading, Reading};
use std::collections::VecDeque;

/// Plays back a fixed script of values, holding the last one once the
/// script runs out.
///
/// Answers the Nth read with the Nth scripted value rather than one fixed
/// reply — what the incubator's scenario tests actually need: a
/// deterministic sequence of readings at known tick boundaries, not a live
/// physical simulation.
#[derive(Debug, Clone)]
pub struct Script<T> {
    remaining: VecDeque<T>,
    last: Option<T>,
}

impl<T: Clone> Script<T> {
    pub fn new(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            remaining: values.into_iter().collect(),
            last: None,
        }
    }

    pub fn constant(value: T) -> Self {
        Self::new(std::iter::once(value))
    }

    pub fn next(&mut self) -> T {
        let value = self.remaining.pop_front().or_else(|| self.last.clone());
        let value = value.expect("Script must be seeded with at least one value");
        self.last = Some(value.clone());
        value
    }
}

/// Scripted dual-RTD probe for the temperature loop.
pub struct ScriptedTemperatureProbe {
    script: Script<DualReading>,
}

impl ScriptedTemperatureProbe {
    pub fn new(values: impl IntoIterator<Item = DualReading>) -> Self {
        Self {
            script: Script::new(values),
        }
    }

    /// Both channels report the same constant value forever.
    pub fn constant(value: f64) -> Self {
        Self::new(std::iter::once(DualReading {
            ch1: Reading::Value(value),
            ch2: Reading::Value(value),
        }))
    }

    pub fn not_connected() -> Self {
        Self::new(std::iter::once(DualReading {
            ch1: Reading::NotConnected,
            ch2: Reading::NotConnected,
        }))
    }
}

#[async_trait::async_trait]
impl incubator_hal::TemperatureProbe for ScriptedTemperatureProbe {
    async fn read(&mut self) -> DualReading {
        self.script.next()
    }
}

macro_rules! scripted_single_channel_probe {
    ($name:ident, $trait_name:ident) => {
        pub struct $name {
            script: Script<Reading>,
        }

        impl $name {
            pub fn new(values: impl IntoIterator<Item = Reading>) -> Self {
                Self {
                    script: Script::new(values),
                }
            }

            pub fn constant(value: f64) -> Self {
                Self::new(std::iter::once(Reading::Value(value)))
            }

            pub fn not_connected() -> Self {
                Self::new(std::iter::once(Reading::NotConnected))
            }
        }

        #[async_trait::async_trait]
        impl incubator_hal::$trait_name for $name {
            async fn read(&mut self) -> Reading {
                self.script.next()
            }
        }
    };
}

scripted_single_channel_probe!(ScriptedHumidityProbe, HumidityProbe);
scripted_single_channel_probe!(ScriptedOxygenProbe, OxygenProbe);

/// Scripted CO₂ probe. `open()` always succeeds immediately — there is no
/// multiplier-query/polling-mode-set round trip to simulate here, since the
/// scripted values are already in final (post-multiplier) ppm.
pub struct ScriptedCo2Probe {
    script: Script<Reading>,
}

impl ScriptedCo2Probe {
    pub fn new(values: impl IntoIterator<Item = Reading>) -> Self {
        Self {
            script: Script::new(values),
        }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(std::iter::once(Reading::Value(value)))
    }

    pub fn not_connected() -> Self {
        Self::new(std::iter::once(Reading::NotConnected))
    }
}

#[async_trait::async_trait]
impl incubator_hal::Co2Probe for ScriptedCo2Probe {
    async fn open(&mut self) -> Result<(), incubator_hal::HalError> {
        Ok(())
    }

    async fn read(&mut self) -> Reading {
        self.script.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_holds_last_value_after_exhaustion() {
        let mut script = Script::new([1, 2, 3]);
        assert_eq!(script.next(), 1);
        assert_eq!(script.next(), 2);
        assert_eq!(script.next(), 3);
        assert_eq!(script.next(), 3);
        assert_eq!(script.next(), 3);
    }

    #[tokio::test]
    async fn scripted_oxygen_probe_plays_back_in_order() {
        use incubator_hal::OxygenProbe;
        let mut probe = ScriptedOxygenProbe::new([Reading::Value(5.0), Reading::Value(6.0)]);
        assert_eq!(probe.read().await, Reading::Value(5.0));
        assert_eq!(probe.read().await, Reading::Value(6.0));
        assert_eq!(probe.read().await, Reading::Value(6.0));
    }
}
