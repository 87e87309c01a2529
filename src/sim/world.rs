/// WorldState: the complete state of a running session.
///
/// ## Layers
///   - `levels`:     every playable level, validated at startup. Never mutated.
///   - `grid`:       the current level's map (a clone of `levels[current_level]`).
///   - `controller`: the actor plus its input queue, transition and pulse.
///   - `hazards`:    live hazards; touching one removes it.
///
/// `load_level` rebuilds everything level-scoped from `levels`;
/// lives survive level changes and are reset only by `new_game`.

use std::time::Duration;

use crate::config::RulesConfig;
use crate::domain::entity::Hazard;
use crate::domain::grid::{Grid, LevelError, WallQuery};
use crate::sim::level::LevelDef;
use crate::sim::movement::MovementController;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    LevelReady,
    Playing,
    LevelComplete,
    GameOver,
    GameComplete,
}

pub struct WorldState {
    // ── Level data ──
    pub levels: Vec<LevelDef>,
    pub grid: Grid,
    pub current_level: usize,
    pub level_name: String,

    // ── Entities ──
    pub controller: MovementController,
    pub hazards: Vec<Hazard>,

    // ── Rules ──
    pub rules: RulesConfig,

    // ── Meta ──
    pub phase: Phase,
    pub lives: u32,
    pub time_remaining: Duration,
    pub frame: u64,

    // ── UI ──
    pub message: String,
    pub message_timer: Duration,
    pub paused: bool,
    pub show_debug: bool,
}

impl WorldState {
    /// Start a session on the first level. Fails only if `levels` is empty.
    pub fn new(levels: Vec<LevelDef>, rules: RulesConfig) -> Result<Self, LevelError> {
        let first = levels.first().ok_or(LevelError::Empty)?;
        let grid = first.grid.clone();
        let level_name = first.name.clone();
        let controller = spawn_controller(&grid, &rules);

        let mut world = WorldState {
            levels,
            grid,
            current_level: 0,
            level_name,
            controller,
            hazards: vec![],
            lives: rules.lives,
            time_remaining: rules.time_limit,
            rules,
            phase: Phase::LevelReady,
            frame: 0,
            message: String::new(),
            message_timer: Duration::ZERO,
            paused: false,
            show_debug: false,
        };
        world.load_level(0);
        Ok(world)
    }

    pub fn total_levels(&self) -> usize {
        self.levels.len()
    }

    /// Load a level. Preserves lives. Past the last level the game is complete.
    pub fn load_level(&mut self, idx: usize) {
        let Some(def) = self.levels.get(idx) else {
            self.phase = Phase::GameComplete;
            self.set_message("You escaped every maze!", Duration::from_secs(5));
            return;
        };

        self.current_level = idx;
        self.level_name = def.name.clone();
        self.grid = def.grid.clone();
        self.controller = spawn_controller(&self.grid, &self.rules);
        self.hazards = self
            .grid
            .hazard_spawns()
            .into_iter()
            .map(|(x, y)| Hazard::new(x, y, self.grid.cell_center(x, y)))
            .collect();
        self.time_remaining = self.rules.time_limit;
        self.frame = 0;
        self.phase = Phase::LevelReady;
        let name = self.level_name.clone();
        self.set_message(&name, Duration::from_secs(3));
        tracing::info!(level = idx, name = %self.level_name, "level loaded");
    }

    pub fn restart_level(&mut self) {
        self.load_level(self.current_level);
    }

    pub fn next_level(&mut self) {
        self.load_level(self.current_level + 1);
    }

    /// Fresh lives, back to the first level.
    pub fn new_game(&mut self) {
        self.lives = self.rules.lives;
        self.paused = false;
        self.load_level(0);
    }

    /// Whole seconds left, rounded up (what the HUD shows).
    pub fn seconds_left(&self) -> u64 {
        let d = self.time_remaining;
        d.as_secs() + u64::from(d.subsec_nanos() > 0)
    }

    pub fn set_message(&mut self, msg: &str, duration: Duration) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Count down the message timer; clears the message when it runs out.
    pub fn tick_message(&mut self, dt: Duration) {
        if self.message_timer.is_zero() {
            return;
        }
        self.message_timer = self.message_timer.saturating_sub(dt);
        if self.message_timer.is_zero() {
            self.message.clear();
        }
    }
}

fn spawn_controller(grid: &Grid, rules: &RulesConfig) -> MovementController {
    MovementController::new(grid, grid.start(), rules.start_facing, rules.movement, rules.pulse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::embedded_levels;

    fn world() -> WorldState {
        WorldState::new(embedded_levels(64.0), RulesConfig::default()).unwrap()
    }

    #[test]
    fn new_world_waits_on_first_level() {
        let w = world();
        assert_eq!(w.phase, Phase::LevelReady);
        assert_eq!(w.current_level, 0);
        assert_eq!(w.lives, 3);
        assert_eq!(w.seconds_left(), 90);
        assert_eq!(w.hazards.len(), 1);
        assert_eq!(w.controller.actor().cell(), w.grid.start());
        assert_eq!(w.message, w.level_name);
    }

    #[test]
    fn empty_level_list_is_rejected() {
        assert!(matches!(
            WorldState::new(vec![], RulesConfig::default()),
            Err(LevelError::Empty)
        ));
    }

    #[test]
    fn past_last_level_completes_game() {
        let mut w = world();
        w.lives = 2;
        w.load_level(w.total_levels());
        assert_eq!(w.phase, Phase::GameComplete);
        w.new_game();
        assert_eq!(w.lives, 3);
        assert_eq!(w.current_level, 0);
        assert_eq!(w.phase, Phase::LevelReady);
    }

    #[test]
    fn seconds_left_rounds_up() {
        let mut w = world();
        w.time_remaining = Duration::from_millis(89_001);
        assert_eq!(w.seconds_left(), 90);
        w.time_remaining = Duration::from_millis(89_000);
        assert_eq!(w.seconds_left(), 89);
    }

    #[test]
    fn message_expires() {
        let mut w = world();
        w.set_message("hi", Duration::from_millis(100));
        w.tick_message(Duration::from_millis(60));
        assert_eq!(w.message, "hi");
        w.tick_message(Duration::from_millis(60));
        assert!(w.message.is_empty());
    }
}
