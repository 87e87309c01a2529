/// Breathing effect: a free-running sine oscillator on the actor's size.
///
/// Phase is measured in cycles and only grows. Switching mode changes the
/// rate of future accumulation; the phase itself carries over unless the
/// snap-on-switch behaviour is enabled.

use std::f64::consts::TAU;
use std::time::Duration;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PulseMode {
    Idle,
    Moving,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseSettings {
    /// Cycles per second while idle.
    pub idle_rate: f64,
    /// Cycles per second while moving. Faster than idle.
    pub moving_rate: f64,
    pub size_min: f64,
    pub size_max: f64,
    /// Restart the cycle whenever the mode actually changes.
    pub reset_on_mode_switch: bool,
}

impl Default for PulseSettings {
    fn default() -> Self {
        PulseSettings {
            idle_rate: 1.0,
            moving_rate: 2.0,
            size_min: 0.95,
            size_max: 1.05,
            reset_on_mode_switch: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PulseDriver {
    settings: PulseSettings,
    mode: PulseMode,
    phase: f64,
}

impl PulseDriver {
    pub fn new(settings: PulseSettings) -> Self {
        PulseDriver { settings, mode: PulseMode::Idle, phase: 0.0 }
    }

    pub fn mode(&self) -> PulseMode {
        self.mode
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn rate(&self) -> f64 {
        match self.mode {
            PulseMode::Idle => self.settings.idle_rate,
            PulseMode::Moving => self.settings.moving_rate,
        }
    }

    /// Returns `true` if the mode changed.
    pub fn set_mode(&mut self, mode: PulseMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        if self.settings.reset_on_mode_switch {
            self.phase = 0.0;
        }
        true
    }

    pub fn advance(&mut self, dt: Duration) {
        self.phase += dt.as_secs_f64() * self.rate();
    }

    /// Current size multiplier, always within [size_min, size_max].
    pub fn size(&self) -> f64 {
        let PulseSettings { size_min, size_max, .. } = self.settings;
        let wave = (self.phase * TAU).sin() * 0.5 + 0.5;
        (size_min + (size_max - size_min) * wave).clamp(size_min, size_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn starts_at_midpoint_and_peaks_at_quarter_cycle() {
        let mut p = PulseDriver::new(PulseSettings::default());
        assert!((p.size() - 1.0).abs() < 1e-9);
        p.advance(ms(250)); // idle: 1 cycle/s → quarter cycle
        assert!((p.size() - 1.05).abs() < 1e-9);
        p.advance(ms(500));
        assert!((p.size() - 0.95).abs() < 1e-9);
    }

    #[test]
    fn moving_is_faster_than_idle() {
        let mut p = PulseDriver::new(PulseSettings::default());
        assert!(p.set_mode(PulseMode::Moving));
        p.advance(ms(125)); // 2 cycles/s → quarter cycle
        assert!((p.size() - 1.05).abs() < 1e-9);
        assert!(p.rate() > PulseSettings::default().idle_rate);
    }

    #[test]
    fn mode_switch_preserves_phase() {
        let mut p = PulseDriver::new(PulseSettings::default());
        p.advance(ms(300));
        let before = (p.phase(), p.size());
        p.set_mode(PulseMode::Moving);
        assert_eq!((p.phase(), p.size()), before);
        assert!(!p.set_mode(PulseMode::Moving));
    }

    #[test]
    fn snap_on_switch_resets_to_midpoint() {
        let settings = PulseSettings { reset_on_mode_switch: true, ..Default::default() };
        let mut p = PulseDriver::new(settings);
        p.advance(ms(300));
        p.set_mode(PulseMode::Moving);
        assert_eq!(p.phase(), 0.0);
        assert!((p.size() - 1.0).abs() < 1e-9);

        // Re-asserting the same mode does not snap.
        p.advance(ms(100));
        p.set_mode(PulseMode::Moving);
        assert!(p.phase() > 0.0);
    }

    #[test]
    fn size_stays_in_bounds_across_switches() {
        let mut p = PulseDriver::new(PulseSettings::default());
        let modes = [PulseMode::Idle, PulseMode::Moving];
        for i in 0..5000u64 {
            if i % 7 == 0 {
                p.set_mode(modes[(i / 7 % 2) as usize]);
            }
            p.advance(Duration::from_micros(1 + i * 37 % 40_000));
            let s = p.size();
            assert!((0.95..=1.05).contains(&s), "size {s} out of bounds");
        }
    }
}
