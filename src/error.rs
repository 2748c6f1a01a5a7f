use std::process::ExitStatus;

pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("insufficient privilege: {0}")]
    Preflight(String),

    #[error("command failed: {command}")]
    CommandFailed {
        command: String,
        status: Option<ExitStatus>,
        stderr: String,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        hint: String,
        #[source]
        source: Box<Self>,
    },

    #[error("configuration rejected by validator: {0}")]
    Validation(String),

    #[error("'{0}' did not become healthy after {1} attempts")]
    Liveness(String, u32),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl ProvisionError {
    /// Wrap an error raised inside a step with the step name and an
    /// operator-facing next action.
    #[must_use]
    pub fn in_step(self, step: &str, hint: &str) -> Self {
        Self::StepFailed {
            step: step.to_string(),
            hint: hint.to_string(),
            source: Box::new(self),
        }
    }

    /// The actionable next step attached to a step failure, if any.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::StepFailed { hint, .. } => Some(hint),
            Self::Preflight(_) => Some("re-run the same command as root, e.g. with `sudo`"),
            _ => None,
        }
    }

    /// The innermost error, skipping step wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
