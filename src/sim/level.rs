/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by file name)
///   2. Built-in embedded levels
///
/// ## Level format (`.txt`):
///   ```
///   # Level Name
///   111111
///   100041
///   131111
///   ```
///   Optional first `#` line is the name; later `#` lines are comments.
///   One row per line, one digit per cell. `,` and whitespace between
///   digits are ignored, so `1, 0, 3` and `103` are the same row.
///
/// ## Cell codes:
///   0 = Floor    1 = Wall    2 = Hazard spawn
///   3 = Start    4 = Exit
///
/// Every level is validated when loaded; a broken file is skipped with a
/// warning and never reaches the simulation.

use std::path::Path;

use crate::domain::grid::{Grid, LevelError};

/// A validated level.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub grid: Grid,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// All playable levels: the levels directory if it has any valid level,
/// otherwise the embedded set.
pub fn load_levels(levels_dir: &Path, cell_size: f64) -> Vec<LevelDef> {
    if levels_dir.is_dir() {
        let levels = load_from_directory(levels_dir, cell_size);
        if !levels.is_empty() {
            tracing::info!(count = levels.len(), dir = %levels_dir.display(), "loaded levels");
            return levels;
        }
        tracing::warn!(dir = %levels_dir.display(), "no valid levels found, using built-in set");
    }
    embedded_levels(cell_size)
}

/// Parse a single level from text content.
pub fn parse_level(content: &str, cell_size: f64) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut rows: Vec<Vec<u8>> = vec![];

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('#') {
            if name.is_empty() && rows.is_empty() {
                name = rest.trim().to_string();
            }
            continue;
        }
        rows.push(parse_row(trimmed, rows.len())?);
    }

    if name.is_empty() {
        name = "Unnamed Maze".to_string();
    }

    let grid = Grid::from_codes(&rows, cell_size)?;
    Ok(LevelDef { name, grid })
}

fn parse_row(line: &str, row: usize) -> Result<Vec<u8>, LevelError> {
    let mut codes = vec![];
    for ch in line.chars() {
        match ch {
            ',' => {}
            c if c.is_whitespace() => {}
            c => match c.to_digit(10) {
                Some(d) => codes.push(d as u8),
                None => return Err(LevelError::BadChar { row, ch: c }),
            },
        }
    }
    Ok(codes)
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path, cell_size: f64) -> Vec<LevelDef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot read levels dir");
            return vec![];
        }
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt"))
        .collect();
    paths.sort();

    let mut levels = vec![];
    for path in paths {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "cannot read level");
                continue;
            }
        };
        match parse_level(&content, cell_size) {
            Ok(def) => {
                if def.grid.exits().is_empty() {
                    tracing::warn!(file = %path.display(), "level has no exit and cannot be completed");
                }
                levels.push(def);
            }
            Err(e) => tracing::warn!(file = %path.display(), error = %e, "skipping invalid level"),
        }
    }
    levels
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels(cell_size: f64) -> Vec<LevelDef> {
    [
        make_embedded("Level 1 - The Coop", &[
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
        ]),
        make_embedded("Level 2 - Barn Loops", &[
            "11111111111111",
            "14000000000001",
            "10111101111101",
            "10100001000101",
            "10102111110101",
            "10000000000001",
            "11101111101111",
            "10001000100021",
            "10111010111101",
            "10000010000001",
            "11111113111111",
            "11111111111111",
        ]),
        make_embedded("Level 3 - Kitchen Run", &[
            "1111111111111",
            "1000001000041",
            "1011101011101",
            "1010001000101",
            "1010111110101",
            "1000100020001",
            "1110101010111",
            "1000001000001",
            "1011111111101",
            "1020000000201",
            "1111113111111",
        ]),
    ]
    .into_iter()
    .filter_map(|(name, text)| match parse_level(&text, cell_size) {
        Ok(def) => Some(def),
        Err(e) => {
            tracing::error!(level = name, error = %e, "built-in level is invalid");
            None
        }
    })
    .collect()
}

fn make_embedded(name: &'static str, map: &[&str]) -> (&'static str, String) {
    let mut text = format!("# {name}\n");
    for row in map {
        text.push_str(row);
        text.push('\n');
    }
    (name, text)
}
