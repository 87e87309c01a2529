/// Events emitted during a simulation step.
/// The presentation layer and the log consume these.

use crate::domain::entity::Direction;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    MoveStarted { from: (i32, i32), to: (i32, i32), dir: Direction },
    MoveCompleted { x: i32, y: i32 },
    Turned { from: Direction, to: Direction },
    /// The queued request could not be applied this frame.
    QueuedBlocked { dir: Direction, age: u32 },
    QueueExpired { dir: Direction },
    /// Facing is blocked; the actor came to rest.
    Stalled { dir: Direction, x: i32, y: i32 },
    Halted { facing: Direction },
    Resumed { dir: Direction },
    HazardHit { x: i32, y: i32, lives_left: u32 },
    ExitReached { x: i32, y: i32 },
    TimeUp,
    OutOfLives,
}
