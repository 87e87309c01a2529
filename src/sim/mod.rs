pub mod event;
pub mod level;
pub mod movement;
pub mod step;
pub mod world;
