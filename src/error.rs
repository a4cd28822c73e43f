// Error types for the swerve core and its configuration

/// Result type alias
pub type Result<T> = std::result::Result<T, SwerveError>;

#[derive(Debug, thiserror::Error)]
pub enum SwerveError {
    #[error("Illegal drive power {power} written to module {module}")]
    PowerOutOfRange { module: usize, power: f64 },

    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
