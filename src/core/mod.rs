pub mod errors;
mod polarizer;
mod state;
pub mod utils;

pub use polarizer::Polarizer;
pub use state::{EntangledQubit, Measurable, Outcome, PairStatus, PolarizationState, SinglePhoton};
