pub mod car;
pub mod controller;
pub mod devices;
pub mod population;
pub mod round;
pub mod track;
pub mod track_format;

pub use car::{Car, CarParams, TurnCommand};
pub use controller::{Controller, FeedForward, FnController};
pub use population::{Fitness, Population, TickStatus};
pub use round::{Round, RoundOutcome};
pub use track::{BoundaryColor, TrackSurface};
