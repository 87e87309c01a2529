/// Entry point and game loop.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use config::GameConfig;
use sim::event::GameEvent;
use sim::level::load_levels;
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;

/// Longest frame the simulation will accept. A stall (terminal resize,
/// suspended process) must not teleport the actor across several cells.
const MAX_FRAME_DT: Duration = Duration::from_millis(250);

fn main() {
    let config = GameConfig::load();
    logging::init(&config.log);

    let levels = load_levels(&config.levels_dir, config.rules.cell_size);
    let mut world = match WorldState::new(levels, config.rules.clone()) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("No playable level: {e}");
            return;
        }
    };
    world.show_debug = config.show_debug;
    tracing::info!(levels = world.total_levels(), "session started");

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut world, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        tracing::error!(error = %e, "game loop failed");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Turkey Escape!");
    match world.phase {
        Phase::GameComplete => println!("You escaped all {} mazes.", world.total_levels()),
        _ => println!("Reached: {} ({}/{})", world.level_name, world.current_level + 1, world.total_levels()),
    }
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut last_frame = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &gp) {
            break;
        }

        let now = Instant::now();
        let dt = now.duration_since(last_frame).min(MAX_FRAME_DT);
        last_frame = now;

        match world.phase {
            Phase::Playing if !world.paused => {
                let presses = kb.direction_presses().merge(gp.direction_presses());
                let events = step::step(world, presses, dt);
                log_events(&events);
            }
            _ => world.tick_message(dt),
        }

        renderer.render(world)?;
        std::thread::sleep(config.frame);
    }

    Ok(())
}

fn log_events(events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::HazardHit { .. }
            | GameEvent::ExitReached { .. }
            | GameEvent::TimeUp
            | GameEvent::OutOfLives => tracing::info!(?event, "session event"),
            _ => tracing::trace!(?event, "movement event"),
        }
    }
}

// ── Key Constants ──

const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::F(1), KeyCode::Char('p'), KeyCode::Char('P')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R'), KeyCode::F(2)];
const KEYS_DEBUG: &[KeyCode] = &[KeyCode::F(3)];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];

/// Handle everything that is not a movement press. Returns true to quit.
fn handle_meta(world: &mut WorldState, kb: &InputState, gp: &GamepadState) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();
    let esc = kb.any_pressed(&[KeyCode::Esc]) || gp.cancel_pressed();

    if kb.any_pressed(KEYS_QUIT) {
        return true;
    }

    if kb.any_pressed(KEYS_DEBUG) {
        world.show_debug = !world.show_debug;
        return false;
    }

    let in_level = matches!(world.phase,
        Phase::LevelReady | Phase::Playing | Phase::LevelComplete
    );

    if in_level && (kb.any_pressed(KEYS_RESTART) || gp.restart_pressed()) {
        world.paused = false;
        world.restart_level();
        world.set_message("Level restarted", Duration::from_secs(2));
        tracing::info!(level = world.current_level, "level restarted");
        return false;
    }

    if world.phase == Phase::Playing && (kb.any_pressed(KEYS_PAUSE) || gp.pause_pressed()) {
        world.paused = !world.paused;
        tracing::debug!(paused = world.paused, "pause toggled");
        return false;
    }

    if world.paused {
        // Esc while paused quits; everything else waits for resume.
        return esc;
    }

    match world.phase {
        Phase::LevelReady => {
            let pad_any = confirm || gp.direction_presses().any();
            if esc {
                return true;
            }
            if kb.any_fresh() || pad_any {
                world.phase = Phase::Playing;
                world.message.clear();
                tracing::info!(level = world.current_level, "level started");
            }
        }
        Phase::LevelComplete => {
            if confirm {
                world.next_level();
            } else if esc {
                return true;
            }
        }
        Phase::GameOver | Phase::GameComplete => {
            if confirm {
                world.new_game();
            } else if esc {
                return true;
            }
        }
        Phase::Playing => {}
    }

    false
}
