/// Planning error types
use crate::dotd::DotdError;
use crate::label::Label;
use crate::validation::Diagnostic;
use mortar_config::ConfigError;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid declaration for {label}: {}", join_messages(.diagnostics))]
    InvalidDeclaration {
        label: Label,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Action '{action}' failed: {source}")]
    ActionExecution {
        action: String,
        #[source]
        source: DotdError,
    },

    #[error("in deps attribute of objc_library rule {target}: rule '{dependency}' does not exist")]
    DependencyNotFound { target: Label, dependency: Label },

    #[error("Dependency '{dependency}' of {target} failed analysis")]
    DependencyFailed { target: Label, dependency: Label },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Target declared twice: {0}")]
    DuplicateTarget(Label),

    #[error("Invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("Analysis cache error: {0}")]
    Cache(String),
}

impl BuildError {
    /// Create an invalid label error
    pub fn invalid_label(label: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidLabel {
            label: label.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a dependency not found error
    pub fn dependency_not_found(target: &Label, dependency: &Label) -> Self {
        Self::DependencyNotFound {
            target: target.clone(),
            dependency: dependency.clone(),
        }
    }

    /// Diagnostics attached to a declaration error
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::InvalidDeclaration { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

fn join_messages(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
