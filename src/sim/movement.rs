/// Grid movement controller: input latch, arbitration, transition and
/// pulse, advanced together once per frame.
///
/// Tick order:
///   1. Latch this frame's press edges into the queue
///   2. Fresh-press handling (stop on reverse, instant turn, resume)
///   3. Arbitration, only while idle
///   4. Advance the in-flight transition; completion returns to idle
///   5. Advance the pulse
///
/// A transition started in steps 2–3 is not advanced in the same tick, so
/// its progress counts from the next frame. Completion in step 4 leaves the
/// actor idle for the rest of the tick; the next frame's arbitration
/// continues the motion.
///
/// ## Arbitration table
/// ┌──────────────────────────────┬──────────┬──────────────────────────────┐
/// │ Candidate                    │ Target   │ Outcome                      │
/// ├──────────────────────────────┼──────────┼──────────────────────────────┤
/// │ queued, differs from facing  │ blocked  │ stay, age queue (may expire) │
/// │ facing (or queued == facing) │ blocked  │ stay idle, pulse → idle      │
/// │ either                       │ clear    │ adopt queued, commit move    │
/// └──────────────────────────────┴──────────┴──────────────────────────────┘

use std::time::Duration;

use crate::domain::entity::{Actor, Direction, MotionState, PixelPos};
use crate::domain::grid::WallQuery;
use crate::domain::latch::{DirectionPresses, InputQueue};
use crate::domain::pulse::{PulseDriver, PulseMode, PulseSettings};
use crate::domain::transition::TransitionDriver;
use super::event::GameEvent;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementSettings {
    /// Time to cross one cell.
    pub move_duration: Duration,
    /// Age (in blocked attempts / completed cells) at which a queued
    /// request is dropped.
    pub queue_timeout: u32,
    /// A clear fresh press preempts the in-flight transition.
    pub instant_turn: bool,
    /// Pressing the opposite of facing while moving halts the actor.
    pub stop_on_reverse: bool,
}

impl Default for MovementSettings {
    fn default() -> Self {
        MovementSettings {
            move_duration: Duration::from_millis(1000),
            queue_timeout: 2,
            instant_turn: false,
            stop_on_reverse: false,
        }
    }
}

/// What a renderer needs each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderFrame {
    pub pixel: PixelPos,
    pub facing: Direction,
    pub size: f64,
    pub motion: MotionState,
    pub cell: (i32, i32),
    pub pending: Option<Direction>,
    pub pulse_mode: PulseMode,
}

pub struct MovementController {
    settings: MovementSettings,
    actor: Actor,
    queue: InputQueue,
    transition: TransitionDriver,
    pulse: PulseDriver,
    /// Idle only for the rest between two auto-advanced cells.
    just_completed: bool,
}

impl MovementController {
    /// Place the actor at rest on `cell`.
    pub fn new<M: WallQuery>(
        map: &M,
        cell: (i32, i32),
        facing: Direction,
        settings: MovementSettings,
        pulse: PulseSettings,
    ) -> Self {
        let center = map.cell_center(cell.0, cell.1);
        MovementController {
            settings,
            actor: Actor::new(cell.0, cell.1, center, facing),
            queue: InputQueue::new(),
            transition: TransitionDriver::new(center),
            pulse: PulseDriver::new(pulse),
            just_completed: false,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn queue(&self) -> &InputQueue {
        &self.queue
    }

    pub fn pulse(&self) -> &PulseDriver {
        &self.pulse
    }

    pub fn settings(&self) -> &MovementSettings {
        &self.settings
    }

    /// Progress of the in-flight move, `None` when not transitioning.
    pub fn move_progress(&self) -> Option<f64> {
        self.transition.is_running().then(|| self.transition.progress())
    }

    pub fn frame(&self) -> RenderFrame {
        RenderFrame {
            pixel: self.actor.pixel,
            facing: self.actor.facing,
            size: self.pulse.size(),
            motion: self.actor.motion,
            cell: self.actor.cell(),
            pending: self.queue.pending(),
            pulse_mode: self.pulse.mode(),
        }
    }

    /// Advance one frame.
    pub fn tick<M: WallQuery>(
        &mut self,
        map: &M,
        presses: DirectionPresses,
        dt: Duration,
        events: &mut Vec<GameEvent>,
    ) {
        let mut started = false;

        if let Some(dir) = self.queue.latch(presses) {
            tracing::trace!(dir = dir.name(), "queued");
            started = self.on_fresh_press(map, dir, events);
        }

        if self.actor.motion == MotionState::Idle {
            started |= self.arbitrate(map, events);
        }
        self.just_completed = false;

        if !started && self.actor.is_transitioning() {
            if self.transition.advance(dt) {
                self.finish_transition(events);
            }
            self.actor.pixel = self.transition.position();
        }

        self.pulse.advance(dt);
    }

    // ── Fresh presses ──

    /// Returns true if a new transition was started.
    fn on_fresh_press<M: WallQuery>(&mut self, map: &M, dir: Direction, events: &mut Vec<GameEvent>) -> bool {
        match self.actor.motion {
            MotionState::Transitioning => {
                if self.settings.stop_on_reverse && dir == self.actor.facing.opposite() {
                    self.halt(map, events);
                    return false;
                }
                if self.settings.instant_turn && dir != self.actor.facing {
                    let (tx, ty) = self.actor.neighbor(dir);
                    if !map.is_blocked(tx, ty) {
                        self.transition.cancel();
                        self.snap_to_cell(map);
                        self.queue.clear();
                        self.turn(dir, events);
                        return self.commit(map, (tx, ty), events);
                    }
                }
                false
            }
            MotionState::StoppedByPlayer => {
                // The press stays queued and is arbitrated this same tick.
                self.actor.motion = MotionState::Idle;
                tracing::debug!(dir = dir.name(), "resumed");
                events.push(GameEvent::Resumed { dir });
                false
            }
            MotionState::Idle => {
                // Between two cells of a continuing run the actor still
                // counts as moving.
                let (fx, fy) = self.actor.neighbor(self.actor.facing);
                if self.settings.stop_on_reverse
                    && self.just_completed
                    && dir == self.actor.facing.opposite()
                    && !map.is_blocked(fx, fy)
                {
                    self.halt(map, events);
                }
                false
            }
        }
    }

    fn halt<M: WallQuery>(&mut self, map: &M, events: &mut Vec<GameEvent>) {
        self.transition.cancel();
        self.snap_to_cell(map);
        self.queue.clear();
        self.actor.motion = MotionState::StoppedByPlayer;
        self.set_pulse(PulseMode::Idle);
        tracing::debug!(x = self.actor.cell_x, y = self.actor.cell_y, "halted by reverse input");
        events.push(GameEvent::Halted { facing: self.actor.facing });
    }

    // ── Arbitration ──

    /// Decide the next cell while idle. Returns true if a move was committed.
    fn arbitrate<M: WallQuery>(&mut self, map: &M, events: &mut Vec<GameEvent>) -> bool {
        self.expire_queue(events);

        let facing = self.actor.facing;
        let pending = self.queue.pending();
        let candidate = pending.unwrap_or(facing);
        let (tx, ty) = self.actor.neighbor(candidate);

        if map.is_blocked(tx, ty) {
            match pending {
                Some(dir) if dir != facing => {
                    self.queue.age_one();
                    tracing::trace!(dir = dir.name(), age = self.queue.age(), "queued direction blocked");
                    events.push(GameEvent::QueuedBlocked { dir, age: self.queue.age() });
                    self.expire_queue(events);
                }
                _ => {
                    // A request equal to facing changes nothing; drop it.
                    self.queue.clear();
                    if self.set_pulse(PulseMode::Idle) {
                        tracing::debug!(dir = facing.name(), x = self.actor.cell_x, y = self.actor.cell_y, "blocked");
                        events.push(GameEvent::Stalled { dir: facing, x: self.actor.cell_x, y: self.actor.cell_y });
                    }
                }
            }
            return false;
        }

        if let Some(dir) = self.queue.take() {
            if dir != facing {
                self.turn(dir, events);
            }
        }
        self.commit(map, (tx, ty), events)
    }

    fn expire_queue(&mut self, events: &mut Vec<GameEvent>) {
        if let Some(dir) = self.queue.expire_if_stale(self.settings.queue_timeout) {
            tracing::debug!(dir = dir.name(), "queued direction expired");
            events.push(GameEvent::QueueExpired { dir });
        }
    }

    fn turn(&mut self, dir: Direction, events: &mut Vec<GameEvent>) {
        let from = self.actor.facing;
        self.actor.facing = dir;
        tracing::debug!(from = from.name(), to = dir.name(), "direction change");
        events.push(GameEvent::Turned { from, to: dir });
    }

    /// Start the move to `target`. The discrete cell jumps to the target
    /// immediately; the pixel position follows over the move duration.
    fn commit<M: WallQuery>(&mut self, map: &M, target: (i32, i32), events: &mut Vec<GameEvent>) -> bool {
        let from_cell = self.actor.cell();
        let to = map.cell_center(target.0, target.1);
        if let Err(e) = self.transition.start(self.actor.pixel, to, self.settings.move_duration) {
            tracing::warn!(error = %e, "move requested while a transition is running");
            return false;
        }
        self.actor.cell_x = target.0;
        self.actor.cell_y = target.1;
        self.actor.motion = MotionState::Transitioning;
        self.set_pulse(PulseMode::Moving);
        tracing::debug!(
            dir = self.actor.facing.name(),
            x = target.0,
            y = target.1,
            "move"
        );
        events.push(GameEvent::MoveStarted { from: from_cell, to: target, dir: self.actor.facing });
        true
    }

    fn finish_transition(&mut self, events: &mut Vec<GameEvent>) {
        self.actor.motion = MotionState::Idle;
        self.just_completed = true;
        // The cell just crossed counts as one aging unit for a waiting request.
        self.queue.age_one();
        self.expire_queue(events);
        tracing::trace!(x = self.actor.cell_x, y = self.actor.cell_y, "move complete");
        events.push(GameEvent::MoveCompleted { x: self.actor.cell_x, y: self.actor.cell_y });
    }

    fn snap_to_cell<M: WallQuery>(&mut self, map: &M) {
        let center = map.cell_center(self.actor.cell_x, self.actor.cell_y);
        self.actor.pixel = center;
        self.transition.set_position(center);
    }

    fn set_pulse(&mut self, mode: PulseMode) -> bool {
        let changed = self.pulse.set_mode(mode);
        if changed {
            tracing::trace!(?mode, rate = self.pulse.rate(), "pulse mode");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::tests::grid_from;
    use crate::domain::grid::Grid;

    const FRAME: Duration = Duration::from_millis(16);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn press(dir: Direction) -> DirectionPresses {
        DirectionPresses::from(dir)
    }

    fn none() -> DirectionPresses {
        DirectionPresses::default()
    }

    fn controller(grid: &Grid, settings: MovementSettings) -> MovementController {
        MovementController::new(grid, grid.start(), Direction::Up, settings, PulseSettings::default())
    }

    fn tick(c: &mut MovementController, g: &Grid, p: DirectionPresses, dt: Duration) -> Vec<GameEvent> {
        let mut events = vec![];
        c.tick(g, p, dt, &mut events);
        events
    }

    /// Vertical corridor, start at the bottom.
    fn corridor() -> Grid {
        grid_from(&[
            "111",
            "101",
            "101",
            "101",
            "131",
            "111",
        ])
    }

    #[test]
    fn auto_advance_commits_target_cell_immediately() {
        let g = corridor();
        let mut c = controller(&g, MovementSettings::default());
        let start_px = g.cell_center(1, 4);

        let events = tick(&mut c, &g, none(), FRAME);
        assert_eq!(c.actor().cell(), (1, 3));
        assert_eq!(c.actor().motion, MotionState::Transitioning);
        assert_eq!(c.actor().pixel, start_px, "new transition is not advanced in its start tick");
        assert_eq!(c.pulse().mode(), PulseMode::Moving);
        assert!(events.contains(&GameEvent::MoveStarted { from: (1, 4), to: (1, 3), dir: Direction::Up }));

        let events = tick(&mut c, &g, none(), ms(1000));
        assert_eq!(c.actor().pixel, g.cell_center(1, 3));
        assert_eq!(c.actor().motion, MotionState::Idle);
        assert!(events.contains(&GameEvent::MoveCompleted { x: 1, y: 3 }));
    }

    #[test]
    fn end_position_independent_of_frame_slicing() {
        let g = corridor();
        let mut sliced = controller(&g, MovementSettings::default());
        let mut whole = controller(&g, MovementSettings::default());

        tick(&mut sliced, &g, none(), FRAME);
        for _ in 0..10 {
            tick(&mut sliced, &g, none(), ms(100));
        }
        tick(&mut whole, &g, none(), FRAME);
        tick(&mut whole, &g, none(), ms(1000));

        assert_eq!(sliced.actor().motion, MotionState::Idle);
        assert_eq!(whole.actor().motion, MotionState::Idle);
        assert_eq!(sliced.actor().pixel, whole.actor().pixel);
        assert_eq!(sliced.actor().pixel, g.cell_center(1, 3));
    }

    #[test]
    fn dead_end_idles_indefinitely() {
        let g = grid_from(&["111", "131", "111"]);
        let mut c = controller(&g, MovementSettings::default());
        let events = tick(&mut c, &g, none(), FRAME);
        assert!(events.is_empty(), "pulse already idle, nothing to report");
        for _ in 0..100 {
            tick(&mut c, &g, none(), FRAME);
        }
        assert_eq!(c.actor().cell(), (1, 1));
        assert_eq!(c.actor().motion, MotionState::Idle);
        assert_eq!(c.pulse().mode(), PulseMode::Idle);
    }

    #[test]
    fn runs_up_to_wall_then_goes_idle() {
        let g = corridor();
        let mut c = controller(&g, MovementSettings::default());
        for _ in 0..3 {
            tick(&mut c, &g, none(), FRAME);
            tick(&mut c, &g, none(), ms(1000));
        }
        assert_eq!(c.actor().cell(), (1, 1));
        let events = tick(&mut c, &g, none(), FRAME);
        assert!(events.contains(&GameEvent::Stalled { dir: Direction::Up, x: 1, y: 1 }));
        assert_eq!(c.pulse().mode(), PulseMode::Idle);
        assert_eq!(c.actor().motion, MotionState::Idle);
    }

    #[test]
    fn queued_turn_applies_at_next_clear_opportunity() {
        let g = grid_from(&[
            "11111",
            "11001",
            "11011",
            "11311",
            "11111",
        ]);
        let mut c = controller(&g, MovementSettings::default());
        tick(&mut c, &g, none(), FRAME); // (2,3) → (2,2)
        tick(&mut c, &g, press(Direction::Right), ms(500));
        assert_eq!(c.queue().pending(), Some(Direction::Right));
        assert_eq!(c.actor().cell(), (2, 2), "queued press does not preempt in queued mode");

        tick(&mut c, &g, none(), ms(500)); // lands on (2,2); right is blocked there
        assert_eq!(c.queue().age(), 1);
        let events = tick(&mut c, &g, none(), FRAME); // right blocked → ages to 2 → expires
        assert!(events.contains(&GameEvent::QueueExpired { dir: Direction::Right }));
        assert!(c.queue().is_empty());

        // Reverts to facing: up to (2,1), where right is open.
        tick(&mut c, &g, none(), FRAME);
        assert_eq!(c.actor().cell(), (2, 1));
        tick(&mut c, &g, press(Direction::Right), ms(1000));
        let events = tick(&mut c, &g, none(), FRAME);
        assert!(events.contains(&GameEvent::Turned { from: Direction::Up, to: Direction::Right }));
        assert_eq!(c.actor().cell(), (3, 1));
        assert_eq!(c.actor().facing, Direction::Right);
        assert!(c.queue().is_empty());
    }

    #[test]
    fn blocked_queue_expires_and_actor_reverts_to_facing() {
        let g = corridor();
        let mut c = controller(&g, MovementSettings::default());
        tick(&mut c, &g, none(), FRAME); // → (1,3)
        tick(&mut c, &g, press(Direction::Left), ms(500));
        tick(&mut c, &g, none(), ms(600)); // completes, age 1
        assert_eq!(c.actor().motion, MotionState::Idle);
        assert_eq!(c.queue().age(), 1);

        let events = tick(&mut c, &g, none(), FRAME);
        assert!(events.contains(&GameEvent::QueuedBlocked { dir: Direction::Left, age: 2 }));
        assert!(events.contains(&GameEvent::QueueExpired { dir: Direction::Left }));
        assert_eq!(c.actor().cell(), (1, 3), "no move on the tick the request was rejected");

        tick(&mut c, &g, none(), FRAME);
        assert_eq!(c.actor().cell(), (1, 2));
        assert_eq!(c.actor().facing, Direction::Up);
    }

    #[test]
    fn queued_request_equal_to_facing_is_consumed_at_wall() {
        let g = grid_from(&["111", "131", "111"]);
        let mut c = controller(&g, MovementSettings::default());
        tick(&mut c, &g, press(Direction::Up), FRAME);
        assert!(c.queue().is_empty());
    }

    #[test]
    fn reverse_press_halts_and_second_press_resumes() {
        let g = corridor();
        let settings = MovementSettings { stop_on_reverse: true, ..Default::default() };
        let mut c = controller(&g, settings);
        tick(&mut c, &g, none(), FRAME); // → (1,3)
        tick(&mut c, &g, none(), ms(400));

        let events = tick(&mut c, &g, press(Direction::Down), FRAME);
        assert!(events.contains(&GameEvent::Halted { facing: Direction::Up }));
        assert_eq!(c.actor().motion, MotionState::StoppedByPlayer);
        assert_eq!(c.actor().pixel, g.cell_center(1, 3));
        assert_eq!(c.actor().facing, Direction::Up);
        assert_eq!(c.pulse().mode(), PulseMode::Idle);
        assert!(c.queue().is_empty());

        for _ in 0..30 {
            tick(&mut c, &g, none(), ms(100));
        }
        assert_eq!(c.actor().cell(), (1, 3), "no auto-advance while stopped");

        let events = tick(&mut c, &g, press(Direction::Down), FRAME);
        assert!(events.contains(&GameEvent::Resumed { dir: Direction::Down }));
        assert_eq!(c.actor().motion, MotionState::Transitioning);
        assert_eq!(c.actor().facing, Direction::Down);
        assert_eq!(c.actor().cell(), (1, 4));
    }

    #[test]
    fn reverse_press_on_rest_frame_between_cells_halts() {
        let g = corridor();
        let settings = MovementSettings { stop_on_reverse: true, ..Default::default() };
        let mut c = controller(&g, settings);
        tick(&mut c, &g, none(), FRAME); // → (1,3)
        let events = tick(&mut c, &g, none(), ms(1000));
        assert!(events.contains(&GameEvent::MoveCompleted { x: 1, y: 3 }));
        assert_eq!(c.actor().motion, MotionState::Idle);

        let events = tick(&mut c, &g, press(Direction::Down), FRAME);
        assert!(events.contains(&GameEvent::Halted { facing: Direction::Up }));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Turned { .. })));
        assert_eq!(c.actor().motion, MotionState::StoppedByPlayer);
        assert_eq!(c.actor().cell(), (1, 3));
        assert_eq!(c.actor().facing, Direction::Up);
    }

    #[test]
    fn reverse_press_at_wall_turns_around() {
        let g = corridor();
        let settings = MovementSettings { stop_on_reverse: true, ..Default::default() };
        let mut c = controller(&g, settings);
        for _ in 0..3 {
            tick(&mut c, &g, none(), FRAME);
            tick(&mut c, &g, none(), ms(1000));
        }
        assert_eq!(c.actor().cell(), (1, 1));

        let events = tick(&mut c, &g, press(Direction::Down), FRAME);
        assert!(events.contains(&GameEvent::Turned { from: Direction::Up, to: Direction::Down }));
        assert_eq!(c.actor().motion, MotionState::Transitioning);
        assert_eq!(c.actor().cell(), (1, 2));
    }

    #[test]
    fn reverse_press_without_stop_mode_is_just_queued() {
        let g = corridor();
        let mut c = controller(&g, MovementSettings::default());
        tick(&mut c, &g, none(), FRAME);
        tick(&mut c, &g, press(Direction::Down), ms(400));
        assert_eq!(c.actor().motion, MotionState::Transitioning);
        assert_eq!(c.queue().pending(), Some(Direction::Down));
    }

    #[test]
    fn instant_turn_preempts_in_flight_move() {
        let g = grid_from(&[
            "11111",
            "11011",
            "11001",
            "11311",
            "11111",
        ]);
        let settings = MovementSettings { instant_turn: true, ..Default::default() };
        let mut c = controller(&g, settings);
        tick(&mut c, &g, none(), FRAME); // (2,3) → (2,2)
        tick(&mut c, &g, none(), ms(300));
        assert!(c.actor().pixel != g.cell_center(2, 2));

        let events = tick(&mut c, &g, press(Direction::Right), FRAME);
        assert!(events.contains(&GameEvent::Turned { from: Direction::Up, to: Direction::Right }));
        assert!(events.contains(&GameEvent::MoveStarted { from: (2, 2), to: (3, 2), dir: Direction::Right }));
        assert_eq!(c.actor().pixel, g.cell_center(2, 2), "snapped to the discrete cell");
        assert_eq!(c.actor().cell(), (3, 2));
        assert_eq!(c.actor().motion, MotionState::Transitioning);
        assert!(c.queue().is_empty());

        tick(&mut c, &g, none(), ms(1000));
        assert_eq!(c.actor().pixel, g.cell_center(3, 2));
    }

    #[test]
    fn instant_turn_into_wall_stays_queued() {
        let g = corridor();
        let settings = MovementSettings { instant_turn: true, ..Default::default() };
        let mut c = controller(&g, settings);
        tick(&mut c, &g, none(), FRAME);
        tick(&mut c, &g, press(Direction::Left), ms(300));
        assert_eq!(c.actor().motion, MotionState::Transitioning);
        assert_eq!(c.queue().pending(), Some(Direction::Left));
        assert_eq!(c.actor().facing, Direction::Up);
    }

    /// First embedded level with a tiny deterministic press generator.
    #[test]
    fn never_enters_wall_and_queue_never_stale() {
        let g = grid_from(&[
            "111111111111",
            "100000400001",
            "101111011101",
            "101000000101",
            "100011211001",
            "101000000001",
            "101110101111",
            "100000000001",
            "111111011111",
            "100000300001",
            "111111111111",
        ]);
        let modes = [
            MovementSettings::default(),
            MovementSettings { instant_turn: true, ..Default::default() },
            MovementSettings { stop_on_reverse: true, ..Default::default() },
            MovementSettings { instant_turn: true, stop_on_reverse: true, ..Default::default() },
        ];
        for settings in modes {
            let mut c = controller(&g, settings);
            let mut seed: u32 = 0x2545_f491;
            for _ in 0..4000 {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let presses = if seed >> 28 < 3 {
                    press(Direction::PRIORITY[(seed >> 8) as usize % 4])
                } else {
                    none()
                };
                let dt = ms(u64::from(seed >> 12) % 250);
                tick(&mut c, &g, presses, dt);

                let (x, y) = c.actor().cell();
                assert!(!g.is_blocked(x, y), "actor entered wall at ({x}, {y})");
                let q = c.queue();
                assert!(q.is_empty() || q.age() < settings.queue_timeout);
                let s = c.frame().size;
                assert!((0.95..=1.05).contains(&s));
            }
        }
    }
}
