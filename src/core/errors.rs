use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Entangled qubit already fully measured (both halves revealed)")]
    AlreadyFullyMeasured,

    #[error("Observer basis choice set must not be empty")]
    EmptyBasisChoices,

    #[error("Observer '{0}' has no measurement to resend")]
    NothingToResend(String),

    #[error("Invalid measurement setup: {0}")]
    InvalidSetup(#[from] ConfigurationError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Recordings have different lengths ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    #[error("Insufficient sample: {matched} matched trials, at least 2 required")]
    InsufficientSample { matched: usize },

    #[error("Degenerate sample: outcome variance is zero, correlation undefined")]
    DegenerateSample,

    #[error("At least one test angle difference is required")]
    NoTestAngles,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Invalid basis angle: {0}")]
    InvalidBasisAngle(f64),

    #[error("Invalid trial count: {0}. Must be at least 1")]
    InvalidTrialCount(usize),

    #[error("Invalid wavelength: {0}. Must be finite and positive")]
    InvalidWavelength(f64),

    #[error("Invalid detection threshold: {0}. Must be finite and non-negative")]
    InvalidThreshold(f64),

    #[error("Angle set '{0}' must not be empty")]
    EmptyAngleSet(&'static str),

    #[error("No phase matching for pump wavelength {wavelength} nm at optic axis angle {optic_axis_angle} rad")]
    NoPhaseMatching {
        wavelength: f64,
        optic_axis_angle: f64,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Protocol error: {0}")]
    ProtocolError(#[from] ProtocolError),

    #[error("Analysis error: {0}")]
    AnalysisError(#[from] AnalysisError),

    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),
}
