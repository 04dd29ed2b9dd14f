pub mod analysis;
pub mod config;
mod core;
mod observer;
pub mod protocols;
pub mod spdc;

pub use crate::analysis::{CorrelationAnalyzer, EavesdroppingReport, SharedKey};
pub use crate::config::SimulationConfig;
pub use crate::core::{
    EntangledQubit, Measurable, Outcome, PairStatus, PolarizationState, Polarizer, SinglePhoton,
    errors, utils,
};
pub use crate::observer::{Observer, Recording};
