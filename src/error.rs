pub type PitchlineResult<T> = Result<T, PitchlineError>;

#[derive(thiserror::Error, Debug)]
pub enum PitchlineError {
    #[error("invalid tone name: '{0}'")]
    InvalidToneName(String),

    #[error("invalid frequency bounds: {0}")]
    InvalidFrequencyBounds(String),

    #[error("invalid anchor spec: '{0}' (expected a corner name or 'x:y' pixel offset)")]
    InvalidAnchorSpec(String),

    #[error("unknown theme: '{0}'")]
    InvalidThemeName(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("{command} failed: {detail}")]
    ExternalProcessFailure { command: String, detail: String },

    #[error("{command} timed out after {seconds}s")]
    ExternalProcessTimeout { command: String, seconds: u64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PitchlineError {
    pub fn tone(name: impl Into<String>) -> Self {
        Self::InvalidToneName(name.into())
    }

    pub fn bounds(msg: impl Into<String>) -> Self {
        Self::InvalidFrequencyBounds(msg.into())
    }

    pub fn anchor(spec: impl Into<String>) -> Self {
        Self::InvalidAnchorSpec(spec.into())
    }

    pub fn theme(name: impl Into<String>) -> Self {
        Self::InvalidThemeName(name.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn process(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ExternalProcessFailure {
            command: command.into(),
            detail: detail.into(),
        }
    }

    pub fn timeout(command: impl Into<String>, seconds: u64) -> Self {
        Self::ExternalProcessTimeout {
            command: command.into(),
            seconds,
        }
    }
}
