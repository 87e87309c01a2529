/// The step function: advances the session by one frame.
///
/// Processing order:
///   1. Message timer
///   2. Movement controller tick (latch, arbitration, transition, pulse)
///   3. Hazard contact (lose a life, hazard is consumed)
///   4. Exit check (actor at rest on an exit center)
///   5. Countdown timer
///
/// Each stage may end the level; later stages are skipped once the phase
/// leaves `Playing`.

use std::time::Duration;

use crate::domain::grid::WallQuery;
use crate::domain::latch::DirectionPresses;
use super::event::GameEvent;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, presses: DirectionPresses, dt: Duration) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.paused {
        return vec![];
    }

    let mut events = Vec::new();
    world.frame += 1;
    world.tick_message(dt);

    world.controller.tick(&world.grid, presses, dt, &mut events);

    if resolve_hazards(world, &mut events) {
        return events;
    }
    if resolve_exit(world, &mut events) {
        return events;
    }
    resolve_timer(world, dt, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Hazards
// ══════════════════════════════════════════════════════════════

/// Returns true if the session ended.
fn resolve_hazards(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let pos = world.controller.actor().pixel;
    let size = world.rules.actor_size;

    let (hit, kept): (Vec<_>, Vec<_>) = world
        .hazards
        .drain(..)
        .partition(|h| h.touches(pos, size));
    world.hazards = kept;

    for h in hit {
        world.lives = world.lives.saturating_sub(1);
        tracing::info!(x = h.x, y = h.y, lives = world.lives, "hazard hit");
        events.push(GameEvent::HazardHit { x: h.x, y: h.y, lives_left: world.lives });

        if world.lives == 0 {
            tracing::info!("out of lives");
            events.push(GameEvent::OutOfLives);
            world.phase = Phase::GameOver;
            world.set_message("Out of lives!", Duration::from_secs(5));
            return true;
        }
        world.set_message("Ouch!", Duration::from_secs(1));
    }
    false
}

// ══════════════════════════════════════════════════════════════
// Exit
// ══════════════════════════════════════════════════════════════

fn resolve_exit(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let actor = world.controller.actor();
    if actor.is_transitioning() {
        return false;
    }
    let (x, y) = actor.cell();
    let on_exit = world.grid.tile_at(x, y).map_or(false, |t| t.is_exit());
    if !on_exit || actor.pixel != world.grid.cell_center(x, y) {
        return false;
    }

    tracing::info!(level = world.current_level, x, y, "exit reached");
    events.push(GameEvent::ExitReached { x, y });
    world.phase = Phase::LevelComplete;
    let msg = format!("{} escaped!", world.level_name);
    world.set_message(&msg, Duration::from_secs(3));
    true
}

// ══════════════════════════════════════════════════════════════
// Countdown
// ══════════════════════════════════════════════════════════════

fn resolve_timer(world: &mut WorldState, dt: Duration, events: &mut Vec<GameEvent>) {
    world.time_remaining = world.time_remaining.saturating_sub(dt);
    if world.time_remaining.is_zero() {
        tracing::info!(level = world.current_level, "time up");
        events.push(GameEvent::TimeUp);
        world.phase = Phase::GameOver;
        world.set_message("Time's up!", Duration::from_secs(5));
    }
}
