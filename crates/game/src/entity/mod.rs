mod ball;
mod paddle;
mod types;

pub use ball::Ball;
pub use paddle::Paddle;
pub use types::{MoveDirection, Rect, Side};
