use std::path::PathBuf;

/// Errors raised while configuring or running the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown routine: {0}")]
    UnknownRoutine(String),

    #[error("Routine {routine} needs the {subsystem} subsystem, which is disabled")]
    SubsystemDisabled {
        routine: String,
        subsystem: &'static str,
    },

    #[error("Logging already initialized: {0}")]
    Logging(String),
}
