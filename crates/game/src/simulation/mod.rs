mod game;
mod snapshot;
mod tick;

pub use game::{Match, MatchPhase};
pub use snapshot::MatchSnapshot;
pub use tick::{FixedTimestep, MAX_FRAME_DELTA};
