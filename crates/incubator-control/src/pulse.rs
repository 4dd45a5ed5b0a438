use std::time::{Duration, Instant};

/// Tracks the last actuation of a pulse-driven actuator and answers whether
/// enough time has elapsed since then to fire again.
#[derive(Debug, Clone, Copy)]
pub struct CooldownGate {
    last_actuation: Option<Instant>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self {
            last_actuation: None,
        }
    }

    pub fn ready(&self, now: Instant, cooldown: Duration) -> bool {
        match self.last_actuation {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= cooldown,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_actuation = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_actuation = None;
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_before_first_actuation() {
        let gate = CooldownGate::new();
        assert!(gate.ready(Instant::now(), Duration::from_secs(60)));
    }

    #[test]
    fn not_ready_within_cooldown() {
        let mut gate = CooldownGate::new();
        let t0 = Instant::now();
        gate.mark(t0);
        assert!(!gate.ready(t0 + Duration::from_secs(59), Duration::from_secs(60)));
        assert!(gate.ready(t0 + Duration::from_secs(60), Duration::from_secs(60)));
    }
}
