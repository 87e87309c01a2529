/// Input latch and the single-slot direction queue.
///
/// The queue holds at most one pending direction plus an age counted in
/// blocked opportunities / completed cells (never wall-clock time).
/// Age resets whenever a new request overwrites the slot.

use super::entity::Direction;

/// Press edges for one frame. Held keys do not count, only fresh presses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectionPresses {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DirectionPresses {
    pub fn is_pressed(&self, dir: Direction) -> bool {
        match dir {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    pub fn set(&mut self, dir: Direction) {
        match dir {
            Direction::Up => self.up = true,
            Direction::Down => self.down = true,
            Direction::Left => self.left = true,
            Direction::Right => self.right = true,
        }
    }

    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    /// Union of two sources (keyboard + gamepad).
    pub fn merge(self, other: DirectionPresses) -> DirectionPresses {
        DirectionPresses {
            up: self.up || other.up,
            down: self.down || other.down,
            left: self.left || other.left,
            right: self.right || other.right,
        }
    }

    /// Pressed directions in latch priority order (up, down, left, right).
    pub fn in_priority_order(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::PRIORITY.into_iter().filter(|d| self.is_pressed(*d))
    }
}

impl From<Direction> for DirectionPresses {
    fn from(dir: Direction) -> Self {
        let mut p = DirectionPresses::default();
        p.set(dir);
        p
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputQueue {
    pending: Option<Direction>,
    age: u32,
}

impl InputQueue {
    pub fn new() -> Self {
        InputQueue::default()
    }

    /// Overwrite the pending request and reset its age.
    pub fn record_press(&mut self, dir: Direction) {
        self.pending = Some(dir);
        self.age = 0;
    }

    /// Record this frame's presses. Each press overwrites the previous one
    /// in priority order; returns the direction left pending, if any press
    /// happened this frame.
    pub fn latch(&mut self, presses: DirectionPresses) -> Option<Direction> {
        let mut latched = None;
        for dir in presses.in_priority_order() {
            self.record_press(dir);
            latched = Some(dir);
        }
        latched
    }

    pub fn pending(&self) -> Option<Direction> {
        self.pending
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    /// Consume the pending request.
    pub fn take(&mut self) -> Option<Direction> {
        self.age = 0;
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.age = 0;
    }

    /// Age the pending request by one unit. No-op on an empty queue.
    pub fn age_one(&mut self) {
        if self.pending.is_some() {
            self.age += 1;
        }
    }

    /// Drop the request once its age reaches `timeout`.
    /// Returns the expired direction.
    pub fn expire_if_stale(&mut self, timeout: u32) -> Option<Direction> {
        match self.pending {
            Some(dir) if self.age >= timeout => {
                self.clear();
                Some(dir)
            }
            _ => None,
        }
    }
}
