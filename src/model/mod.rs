// MODEL: Game state and data
pub mod catalog;
pub mod drops;
pub mod landmarks;
pub mod playfield;
pub mod rain;
pub mod tally;

pub use catalog::{Catalog, Category, CategoryId, CategorySelection, Timbre, Variant};
pub use drops::{DropSimulation, FallingObject, Miss};
pub use landmarks::{Landmark, PoseFrame, TrackedPoint};
pub use playfield::Playfield;
pub use rain::{BackgroundRain, RainDrop};
pub use tally::HitTally;
