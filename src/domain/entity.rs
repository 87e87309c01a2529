/// Actor, directions and continuous positions.
/// The actor has exactly three motion states.

/// Cardinal direction. Closed set: anything else is unrepresentable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Latch priority order. When several presses land in one frame they are
    /// recorded in this order, so the last one wins.
    pub const PRIORITY: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Grid step for one cell. Y grows downward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Parse a config name (`up`, `down`, `left`, `right`, any case).
    pub fn from_name(s: &str) -> Option<Direction> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "north" => Some(Direction::Up),
            "down" | "south" => Some(Direction::Down),
            "left" | "west" => Some(Direction::Left),
            "right" | "east" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Continuous position in pixel space.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct PixelPos {
    pub x: f64,
    pub y: f64,
}

impl PixelPos {
    pub fn new(x: f64, y: f64) -> Self {
        PixelPos { x, y }
    }

    /// Linear interpolation; `t` is clamped to [0, 1].
    pub fn lerp(self, to: PixelPos, t: f64) -> PixelPos {
        let t = t.clamp(0.0, 1.0);
        PixelPos {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MotionState {
    Idle,
    Transitioning,
    StoppedByPlayer,
}

/// The player-controlled entity.
///
/// `cell_x`/`cell_y` are authoritative and change only when a transition is
/// committed: while a transition is in flight they already name its target.
#[derive(Clone, Debug)]
pub struct Actor {
    pub cell_x: i32,
    pub cell_y: i32,
    pub pixel: PixelPos,
    pub facing: Direction,
    pub motion: MotionState,
}

impl Actor {
    pub fn new(cell_x: i32, cell_y: i32, pixel: PixelPos, facing: Direction) -> Self {
        Actor {
            cell_x,
            cell_y,
            pixel,
            facing,
            motion: MotionState::Idle,
        }
    }

    pub fn cell(&self) -> (i32, i32) {
        (self.cell_x, self.cell_y)
    }

    /// The cell one step away in `dir`.
    pub fn neighbor(&self, dir: Direction) -> (i32, i32) {
        let (dx, dy) = dir.delta();
        (self.cell_x + dx, self.cell_y + dy)
    }

    pub fn is_transitioning(&self) -> bool {
        self.motion == MotionState::Transitioning
    }
}

/// A hazard sitting on a cell. Touching it costs a life and consumes it.
#[derive(Clone, Debug, PartialEq)]
pub struct Hazard {
    pub x: i32,
    pub y: i32,
    pub center: PixelPos,
}

impl Hazard {
    pub fn new(x: i32, y: i32, center: PixelPos) -> Self {
        Hazard { x, y, center }
    }

    /// Axis-aligned overlap of two equal squares of side `size`.
    pub fn touches(&self, pos: PixelPos, size: f64) -> bool {
        (pos.x - self.center.x).abs() < size && (pos.y - self.center.y).abs() < size
    }
}
