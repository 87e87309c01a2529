pub mod entity;
pub mod grid;
pub mod latch;
pub mod pulse;
pub mod tile;
pub mod transition;
