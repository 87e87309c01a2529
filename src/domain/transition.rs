/// Cell-to-cell interpolation driven by accumulated real time.
///
/// Elapsed time is accumulated as `Duration` (integer nanoseconds), so the
/// end of a transition does not depend on how the time was sliced into
/// frames. On completion the position is set to the target exactly.
///
/// Completion is polled: `advance` returns `true` on the one call where the
/// transition finishes.

use std::time::Duration;

use thiserror::Error;

use super::entity::PixelPos;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StartError {
    /// Cancel the running transition first.
    #[error("transition already running")]
    AlreadyRunning,
}

#[derive(Clone, Debug)]
struct Active {
    from: PixelPos,
    to: PixelPos,
    duration: Duration,
    elapsed: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct TransitionDriver {
    active: Option<Active>,
    position: PixelPos,
}

impl TransitionDriver {
    pub fn new(position: PixelPos) -> Self {
        TransitionDriver { active: None, position }
    }

    pub fn start(&mut self, from: PixelPos, to: PixelPos, duration: Duration) -> Result<(), StartError> {
        if self.active.is_some() {
            return Err(StartError::AlreadyRunning);
        }
        self.position = from;
        self.active = Some(Active { from, to, duration, elapsed: Duration::ZERO });
        Ok(())
    }

    /// Stop where we are. The caller snaps to the grid if it needs to.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn position(&self) -> PixelPos {
        self.position
    }

    /// Move the resting position (used for grid snaps while idle).
    pub fn set_position(&mut self, pos: PixelPos) {
        self.position = pos;
    }

    /// Progress in [0, 1]; 0 when idle.
    pub fn progress(&self) -> f64 {
        match &self.active {
            Some(a) => ratio(a.elapsed, a.duration),
            None => 0.0,
        }
    }

    /// Advance by `dt`. Returns `true` if the transition completed during
    /// this call.
    pub fn advance(&mut self, dt: Duration) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        active.elapsed = active.elapsed.saturating_add(dt);
        if active.elapsed >= active.duration {
            self.position = active.to;
            self.active = None;
            return true;
        }
        self.position = active.from.lerp(active.to, ratio(active.elapsed, active.duration));
        false
    }
}

fn ratio(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_millis(1000);

    fn up_one_cell() -> (PixelPos, PixelPos) {
        (PixelPos::new(416.0, 608.0), PixelPos::new(416.0, 544.0))
    }

    #[test]
    fn frame_slicing_does_not_change_the_end() {
        let (from, to) = up_one_cell();

        let mut sliced = TransitionDriver::new(from);
        sliced.start(from, to, SEC).unwrap();
        let mut done_at = None;
        for i in 0..10 {
            if sliced.advance(Duration::from_millis(100)) {
                done_at = Some(i);
            }
        }
        assert_eq!(done_at, Some(9));
        assert_eq!(sliced.position(), to);

        let mut whole = TransitionDriver::new(from);
        whole.start(from, to, SEC).unwrap();
        assert!(whole.advance(SEC));
        assert_eq!(whole.position(), to);
    }

    #[test]
    fn midway_position_is_linear() {
        let (from, to) = up_one_cell();
        let mut t = TransitionDriver::new(from);
        t.start(from, to, SEC).unwrap();
        assert!(!t.advance(Duration::from_millis(250)));
        assert_eq!(t.position(), PixelPos::new(416.0, 592.0));
        assert!((t.progress() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn completion_reported_once() {
        let (from, to) = up_one_cell();
        let mut t = TransitionDriver::new(from);
        t.start(from, to, SEC).unwrap();
        assert!(t.advance(Duration::from_millis(1500)));
        assert!(!t.advance(Duration::from_millis(100)));
        assert!(!t.is_running());
        assert_eq!(t.position(), to);
    }

    #[test]
    fn double_start_is_rejected() {
        let (from, to) = up_one_cell();
        let mut t = TransitionDriver::new(from);
        t.start(from, to, SEC).unwrap();
        let err = t.start(to, from, SEC).unwrap_err();
        assert_eq!(err, StartError::AlreadyRunning);
        assert_eq!(err.to_string(), "transition already running");
        t.cancel();
        assert!(t.start(to, from, SEC).is_ok());
    }

    #[test]
    fn cancel_leaves_position_in_place() {
        let (from, to) = up_one_cell();
        let mut t = TransitionDriver::new(from);
        t.start(from, to, SEC).unwrap();
        t.advance(Duration::from_millis(500));
        t.cancel();
        assert_eq!(t.position(), PixelPos::new(416.0, 576.0));
        assert!(!t.advance(SEC));
        assert_eq!(t.position(), PixelPos::new(416.0, 576.0));
    }
}
