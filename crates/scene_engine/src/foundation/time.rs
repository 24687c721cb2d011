//! Frame timing

/// Simulation clock advanced once per engine frame
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    current_time: f64,
    frame_step: f64,
    frame_count: u64,
}

impl FrameClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `delta` seconds (negative deltas are clamped to zero)
    pub fn advance(&mut self, delta: f64) {
        self.frame_step = delta.max(0.0);
        self.current_time += self.frame_step;
        self.frame_count += 1;
    }

    /// Simulation time in seconds
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Length of the last frame in seconds
    pub fn frame_step(&self) -> f64 {
        self.frame_step
    }

    /// Number of frames advanced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates_time() {
        let mut clock = FrameClock::new();
        clock.advance(0.5);
        clock.advance(-1.0);
        clock.advance(0.25);
        assert_eq!(clock.frame_count(), 3);
        assert!((clock.current_time() - 0.75).abs() < f64::EPSILON);
        assert!((clock.frame_step() - 0.25).abs() < f64::EPSILON);
    }
}
