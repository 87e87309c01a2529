/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete,
/// and clamps values that would break the movement rules.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::entity::Direction;
use crate::domain::pulse::PulseSettings;
use crate::sim::movement::MovementSettings;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub frame: Duration,
    pub show_debug: bool,
    pub log: LogConfig,
}

/// Everything the simulation needs to build a session.
#[derive(Clone, Debug, PartialEq)]
pub struct RulesConfig {
    pub movement: MovementSettings,
    pub pulse: PulseSettings,
    pub start_facing: Direction,
    pub cell_size: f64,
    pub actor_size: f64,
    pub lives: u32,
    pub time_limit: Duration,
}

impl Default for RulesConfig {
    fn default() -> Self {
        TomlConfig::default().rules()
    }
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub restart: Vec<String>,
    pub pause: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Log file; `None` disables logging (the terminal is in raw mode).
    pub file: Option<PathBuf>,
    pub level: String,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    movement: TomlMovement,
    #[serde(default)]
    pulse: TomlPulse,
    #[serde(default)]
    session: TomlSession,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    log: TomlLog,
}

#[derive(Deserialize, Debug)]
struct TomlMovement {
    #[serde(default = "default_move_duration")]
    move_duration_ms: u64,
    #[serde(default = "default_queue_timeout")]
    queue_timeout: u32,
    #[serde(default)]
    instant_turn: bool,
    #[serde(default)]
    stop_on_reverse: bool,
    #[serde(default = "default_start_facing")]
    start_facing: String,
    #[serde(default = "default_cell_size")]
    cell_size_px: f64,
    #[serde(default = "default_actor_size")]
    actor_size_px: f64,
}

#[derive(Deserialize, Debug)]
struct TomlPulse {
    #[serde(default = "default_idle_rate")]
    idle_rate: f64,
    #[serde(default = "default_moving_rate")]
    moving_rate: f64,
    #[serde(default = "default_size_min")]
    size_min: f64,
    #[serde(default = "default_size_max")]
    size_max: f64,
    #[serde(default)]
    reset_on_mode_switch: bool,
}

#[derive(Deserialize, Debug)]
struct TomlSession {
    #[serde(default = "default_lives")]
    lives: u32,
    #[serde(default = "default_time_limit")]
    time_limit_secs: u64,
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default)]
    show_debug: bool,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default)]
    file: String,
    #[serde(default = "default_log_level")]
    level: String,
}

// ── Defaults ──

fn default_move_duration() -> u64 { 1000 }  // one cell per second
fn default_queue_timeout() -> u32 { 2 }
fn default_start_facing() -> String { "up".into() }
fn default_cell_size() -> f64 { 64.0 }
fn default_actor_size() -> f64 { 60.0 }      // 64px cell minus 4px padding
fn default_idle_rate() -> f64 { 1.0 }        // 500ms out + 500ms back
fn default_moving_rate() -> f64 { 2.0 }      // 250ms out + 250ms back
fn default_size_min() -> f64 { 0.95 }
fn default_size_max() -> f64 { 1.05 }
fn default_lives() -> u32 { 3 }
fn default_time_limit() -> u64 { 90 }
fn default_frame_ms() -> u64 { 16 }

fn default_confirm() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_pause() -> Vec<String> { vec!["Start".into()] }
fn default_levels_dir() -> String { "levels".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlMovement {
    fn default() -> Self {
        TomlMovement {
            move_duration_ms: default_move_duration(),
            queue_timeout: default_queue_timeout(),
            instant_turn: false,
            stop_on_reverse: false,
            start_facing: default_start_facing(),
            cell_size_px: default_cell_size(),
            actor_size_px: default_actor_size(),
        }
    }
}

impl Default for TomlPulse {
    fn default() -> Self {
        TomlPulse {
            idle_rate: default_idle_rate(),
            moving_rate: default_moving_rate(),
            size_min: default_size_min(),
            size_max: default_size_max(),
            reset_on_mode_switch: false,
        }
    }
}

impl Default for TomlSession {
    fn default() -> Self {
        TomlSession {
            lives: default_lives(),
            time_limit_secs: default_time_limit(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
            restart: default_restart(),
            pause: default_pause(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            show_debug: false,
        }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog {
            file: String::new(),
            level: default_log_level(),
        }
    }
}

// ── Sanitizing ──

impl TomlConfig {
    fn rules(&self) -> RulesConfig {
        let m = &self.movement;
        let p = &self.pulse;

        let start_facing = Direction::from_name(&m.start_facing).unwrap_or_else(|| {
            eprintln!("Warning: unknown start_facing {:?}, using \"up\"", m.start_facing);
            Direction::Up
        });

        let size_min = finite_or(p.size_min, default_size_min());
        let size_max = finite_or(p.size_max, default_size_max());
        let (size_min, size_max) = if size_min <= size_max {
            (size_min, size_max)
        } else {
            (size_max, size_min)
        };
        let idle_rate = finite_or(p.idle_rate, default_idle_rate()).max(0.0);
        let moving_rate = finite_or(p.moving_rate, default_moving_rate()).max(idle_rate);

        RulesConfig {
            movement: MovementSettings {
                move_duration: Duration::from_millis(m.move_duration_ms.max(1)),
                queue_timeout: m.queue_timeout.max(1),
                instant_turn: m.instant_turn,
                stop_on_reverse: m.stop_on_reverse,
            },
            pulse: PulseSettings {
                idle_rate,
                moving_rate,
                size_min,
                size_max,
                reset_on_mode_switch: p.reset_on_mode_switch,
            },
            start_facing,
            cell_size: if m.cell_size_px > 0.0 { m.cell_size_px } else { default_cell_size() },
            actor_size: m.actor_size_px.max(0.0),
            lives: self.session.lives.max(1),
            time_limit: Duration::from_secs(self.session.time_limit_secs.max(1)),
        }
    }
}

/// `nan` and `inf` are valid TOML floats; treat them as unset.
fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() { value } else { default }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir = resolve_dir(&toml_cfg.general.levels_dir, search_dirs);
        let log_file = toml_cfg.log.file.trim();

        GameConfig {
            rules: toml_cfg.rules(),
            gamepad: GamepadConfig {
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
                restart: toml_cfg.gamepad.restart,
                pause: toml_cfg.gamepad.pause,
            },
            levels_dir,
            frame: Duration::from_millis(toml_cfg.session.frame_ms.clamp(1, 100)),
            show_debug: toml_cfg.general.show_debug,
            log: LogConfig {
                file: if log_file.is_empty() { None } else { Some(PathBuf::from(log_file)) },
                level: toml_cfg.log.level,
            },
        }
    }
}

/// Absolute paths are used as-is; relative ones are looked up in the
/// candidate dirs, defaulting to CWD-relative.
fn resolve_dir(dir: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(dir);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(dir))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text),
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Warning: config.toml parse error: {e}");
            eprintln!("Using default settings.");
            TomlConfig::default()
        }
    }
}
