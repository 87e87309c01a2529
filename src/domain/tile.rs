/// Cell codes and their properties.
/// Properties are queried via methods, not stored as flags,
/// so cell semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Floor,
    Wall,
    HazardSpawn, // Floor with a hazard placed on it at load
    Start,       // Floor where the actor spawns
    Exit,        // Floor that completes the level
}

impl Tile {
    /// Decode a level cell code (`0`..=`4`).
    pub fn from_code(code: u8) -> Option<Tile> {
        match code {
            0 => Some(Tile::Floor),
            1 => Some(Tile::Wall),
            2 => Some(Tile::HazardSpawn),
            3 => Some(Tile::Start),
            4 => Some(Tile::Exit),
            _ => None,
        }
    }

    /// Does this cell stop movement?
    pub fn is_wall(self) -> bool {
        matches!(self, Tile::Wall)
    }

    pub fn is_exit(self) -> bool {
        matches!(self, Tile::Exit)
    }

    pub fn is_hazard_spawn(self) -> bool {
        matches!(self, Tile::HazardSpawn)
    }
}
