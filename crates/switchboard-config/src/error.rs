use std::path::PathBuf;

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A `{{ env.VAR }}` placeholder could not be expanded
    #[error("config variable expansion failed: {0}")]
    Expand(String),

    /// The expanded text is not valid TOML for [`crate::Config`]
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The parsed configuration is inconsistent
    #[error("invalid configuration: {0}")]
    Validation(String),
}
