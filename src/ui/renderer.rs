/// Game screen renderer on top of `frame::Frame`.
///
/// One grid cell is two terminal columns. The actor is drawn in the cell
/// that contains its pixel position, so it visibly lags the discrete cell
/// while a transition is in flight. Its colour brightness follows the
/// pulse size.

use std::io::{self, BufWriter};

use crossterm::{
    cursor,
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, ResetColor, SetBackgroundColor},
    terminal::{self, Clear, ClearType},
};

use super::frame::{Frame, Glyph, BASE_BG};
use crate::domain::entity::{Direction, MotionState};
use crate::domain::pulse::PulseSettings;
use crate::domain::tile::Tile;
use crate::sim::movement::RenderFrame;
use crate::sim::world::{Phase, WorldState};

// ── Layout ──

/// Terminal columns per grid cell.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const WALL_FG: Color = Color::Rgb { r: 120, g: 90, b: 60 };
const WALL_BG: Color = Color::Rgb { r: 70, g: 50, b: 30 };
const FLOOR_BG: Color = Color::Rgb { r: 34, g: 40, b: 34 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: Frame,
    back: Frame,
    last_phase: Option<Phase>,
    /// Render count, drives blinking prompts.
    anim: u64,
    /// Terminal reports key Release events.
    keyboard_enhanced: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: Frame::new(0, 0),
            back: Frame::new(0, 0),
            last_phase: None,
            anim: 0,
            keyboard_enhanced: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(BASE_BG),
            Clear(ClearType::All)
        )?;

        self.fit_terminal();

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.keyboard_enhanced = true;
        }

        Ok(())
    }

    /// Match both frames to the terminal size. Returns true if it changed.
    fn fit_terminal(&mut self) -> bool {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let (w, h) = (tw as usize, th as usize);
        if (w, h) == (self.front.width(), self.front.height()) {
            return false;
        }
        self.front.resize(w, h);
        self.back.resize(w, h);
        true
    }

    /// Whether key Release events can be trusted for edge detection.
    pub fn keyboard_enhanced(&self) -> bool {
        self.keyboard_enhanced
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let resized = self.fit_terminal();
        if resized || self.last_phase != Some(world.phase) {
            // Full repaint on resize and on screen changes.
            self.back.fill(Glyph::STALE);
            queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.anim = self.anim.wrapping_add(1);
        self.compose(world);
        self.front.write_diff(&self.back, &mut self.writer)?;
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    fn compose(&mut self, world: &WorldState) {
        self.front.fill(Glyph::BLANK);

        match world.phase {
            Phase::GameOver => self.compose_game_over(world),
            Phase::GameComplete => self.compose_game_complete(world),
            Phase::LevelReady | Phase::Playing | Phase::LevelComplete => {
                self.compose_hud(world);
                self.compose_map(world);
                self.compose_footer(world);
                if world.show_debug {
                    self.compose_debug(world);
                }
            }
        }

        if world.paused {
            self.compose_pause_overlay(world);
        }
    }

    // ── Compose: play field ──

    fn compose_hud(&mut self, w: &WorldState) {
        self.front.fill_row(HUD_ROW, HUD_BG);
        let hearts: String = "♥".repeat(w.lives as usize);
        let hud = format!(
            " {}  ({}/{})   Lives: {:<4} Time: {:>3} ",
            w.level_name,
            w.current_level + 1,
            w.total_levels(),
            hearts,
            w.seconds_left(),
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_map(&mut self, w: &WorldState) {
        let frame = w.controller.frame();
        let actor_cell = w.grid.cell_containing(frame.pixel);

        for gy in 0..w.grid.height() {
            let row = MAP_ROW + gy;
            if row >= self.front.height() { break; }
            for gx in 0..w.grid.width() {
                let col = gx * CELL_W;
                if col + 1 >= self.front.width() { break; }
                let (x, y) = (gx as i32, gy as i32);

                if (x, y) == actor_cell {
                    self.compose_actor(&frame, &w.rules.pulse, col, row);
                } else if w.hazards.iter().any(|h| h.x == x && h.y == y) {
                    self.front.put_wide(col, row, '🦊', Color::Reset, FLOOR_BG);
                } else {
                    self.compose_tile(w.grid.tile_at(x, y).unwrap_or_default(), col, row);
                }
            }
        }
    }

    fn compose_tile(&mut self, tile: Tile, col: usize, row: usize) {
        let (c0, c1, fg, bg) = match tile {
            Tile::Wall => ('▓', '▓', WALL_FG, WALL_BG),
            Tile::Exit => ('[', ']', Color::Rgb { r: 80, g: 255, b: 80 }, Color::Rgb { r: 20, g: 70, b: 20 }),
            Tile::Start => ('·', '·', Color::DarkGrey, FLOOR_BG),
            Tile::Floor | Tile::HazardSpawn => (' ', ' ', Color::Reset, FLOOR_BG),
        };
        self.front.set(col, row, Glyph::new(c0, fg, bg));
        self.front.set(col + 1, row, Glyph::new(c1, fg, bg));
    }

    fn compose_actor(&mut self, frame: &RenderFrame, pulse: &PulseSettings, col: usize, row: usize) {
        let (c0, c1) = actor_glyph(frame.facing);
        let fg = actor_color(frame.size, pulse);
        let bg = match frame.motion {
            MotionState::StoppedByPlayer => Color::Rgb { r: 70, g: 30, b: 30 },
            _ => FLOOR_BG,
        };
        self.front.set(col, row, Glyph::new(c0, fg, bg));
        self.front.set(col + 1, row, Glyph::new(c1, fg, bg));
    }

    fn map_bottom(&self, w: &WorldState) -> usize {
        MAP_ROW + w.grid.height()
    }

    fn compose_footer(&mut self, w: &WorldState) {
        let msg_row = self.map_bottom(w) + 1;
        if msg_row >= self.front.height() { return; }

        match w.phase {
            Phase::LevelReady => {
                if (self.anim / 15) % 2 == 0 {
                    self.front.fill_row(msg_row, MSG_BG);
                    self.front.put_str(1, msg_row, "▸▸ PRESS ANY KEY TO START ◂◂", Color::Black, MSG_BG);
                }
            }
            Phase::LevelComplete => {
                self.front.fill_row(msg_row, MSG_BG);
                let msg = format!("★ {} ★  ENTER: next level", w.message);
                self.front.put_str(1, msg_row, &msg, Color::Black, MSG_BG);
            }
            _ => {
                if !w.message.is_empty() {
                    self.front.fill_row(msg_row, MSG_BG);
                    self.front.put_str(1, msg_row, &w.message, Color::Black, MSG_BG);
                }
            }
        }

        let help_row = msg_row + 2;
        if help_row < self.front.height() {
            let help = " WASD/Arrows: Turn  P/F1: Pause  R: Restart  F3: Debug  Q: Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    /// Side panel with the actor's internal state.
    fn compose_debug(&mut self, w: &WorldState) {
        let frame = w.controller.frame();
        let queue = w.controller.queue();
        let pending = match frame.pending {
            Some(d) => format!("{} (age {})", d.name(), queue.age()),
            None => "none".to_string(),
        };
        let progress = match w.controller.move_progress() {
            Some(p) => format!("{:.0}%", p * 100.0),
            None => "-".to_string(),
        };
        let settings = w.controller.settings();
        let mode = match (settings.instant_turn, settings.stop_on_reverse) {
            (false, false) => "queued",
            (true, false) => "instant",
            (false, true) => "queued+stop",
            (true, true) => "instant+stop",
        };
        let lines = [
            format!("Grid:    ({}, {})", frame.cell.0, frame.cell.1),
            format!("Pixel:   ({:.1}, {:.1})", frame.pixel.x, frame.pixel.y),
            format!("Facing:  {}", frame.facing.name()),
            format!("Queued:  {}", pending),
            format!("Motion:  {:?} {}", frame.motion, progress),
            format!("Pulse:   {:?} x{:.3}", frame.pulse_mode, frame.size),
            format!("Phase:   {:.2} cycles", w.controller.pulse().phase()),
            format!("Turns:   {}", mode),
            format!("Frame:   {}", w.frame),
        ];

        let x = w.grid.width() * CELL_W + 2;
        let dim = Color::Rgb { r: 30, g: 30, b: 30 };
        let fg = Color::Rgb { r: 120, g: 255, b: 120 };
        self.front.put_str(x, MAP_ROW, " DEBUG ", Color::Black, fg);
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(x, MAP_ROW + 1 + i, &format!(" {:<28}", line), fg, dim);
        }
    }

    // ── Compose: end screens and overlays ──

    fn compose_game_over(&mut self, w: &WorldState) {
        let red = Color::Rgb { r: 255, g: 60, b: 60 };
        let box_art = [
            "╔══════════════════════════════╗",
            "║        ✕  GAME  OVER  ✕      ║",
            "╚══════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(6, 4 + i, l, red, Color::Reset);
        }
        let reason = if w.lives == 0 { "The hazards got you." } else { "The clock ran out." };
        let level = format!("◈ Reached: {} ({}/{})", w.level_name, w.current_level + 1, w.total_levels());
        self.front.put_str(8, 8, reason, Color::White, Color::Reset);
        self.front.put_str(8, 9, &level, Color::White, Color::Reset);
        self.front.put_str(8, 11, "▸ ENTER: New game", Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
        self.front.put_str(8, 12, "▸ ESC:   Quit", Color::DarkGrey, Color::Reset);
    }

    fn compose_game_complete(&mut self, w: &WorldState) {
        let gold = Color::Rgb { r: 255, g: 220, b: 50 };
        let box_art = [
            "╔══════════════════════════════════╗",
            "║   ★ THE TURKEY ESCAPED! ★        ║",
            "╚══════════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(4, 4 + i, l, gold, Color::Reset);
        }
        let levels = format!("◈ All {} mazes cleared with {} lives left", w.total_levels(), w.lives);
        self.front.put_str(6, 8, &levels, Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
        self.front.put_str(6, 10, "▸ ENTER: Play again   ESC: Quit", Color::White, Color::Reset);
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let hdr = Color::Rgb { r: 255, g: 220, b: 50 };
        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };

        let view_cols = (w.grid.width() * CELL_W).max(24);
        let box_w = 24_usize;
        let box_h = 8_usize;
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + w.grid.height().saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Glyph::new(' ', Color::Reset, dim));
            }
        }

        let label = if (self.anim / 20) % 2 == 0 { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_str(box_x + 6, box_y + 1, label, hdr, dim);
        self.front.put_str(box_x + 2, box_y + 3, "P/F1  Resume", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 4, "R     Restart level", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 5, "F3    Debug panel", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 6, "Q     Quit", key_c, dim);
    }
}

/// Two-column glyph for the actor, pointing where it faces.
fn actor_glyph(facing: Direction) -> (char, char) {
    match facing {
        Direction::Up => ('▲', '▲'),
        Direction::Down => ('▼', '▼'),
        Direction::Left => ('◀', '■'),
        Direction::Right => ('■', '▶'),
    }
}

/// Brightness follows the pulse: `size_min` is dimmest, `size_max` brightest.
fn actor_color(size: f64, pulse: &PulseSettings) -> Color {
    let span = pulse.size_max - pulse.size_min;
    let t = if span > 0.0 { ((size - pulse.size_min) / span).clamp(0.0, 1.0) } else { 1.0 };
    let level = |lo: f64, hi: f64| (lo + (hi - lo) * t).round() as u8;
    Color::Rgb { r: level(170.0, 255.0), g: level(110.0, 200.0), b: level(40.0, 90.0) }
}
