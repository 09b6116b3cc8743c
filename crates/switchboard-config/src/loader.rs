use std::path::Path;

use secrecy::ExposeSecret;

use crate::{Config, ConfigError, StoreBackend};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration text
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let expanded = crate::env::expand_env(raw)?;
        let config: Self = toml::from_str(&expanded)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_store()?;
        self.validate_hub()?;
        self.validate_llm()?;
        self.validate_admin()?;
        Ok(())
    }

    fn validate_store(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Redis && self.store.url.is_none() {
            return Err(ConfigError::Validation("store.url is required for the redis backend".to_owned()));
        }

        if self.store.timeout.is_zero() {
            return Err(ConfigError::Validation("store.timeout must be greater than 0".to_owned()));
        }

        Ok(())
    }

    fn validate_hub(&self) -> Result<(), ConfigError> {
        let hub = &self.hub;

        // A live session must always see a ping before its read deadline expires
        if hub.ping_period >= hub.pong_wait {
            return Err(ConfigError::Validation(format!(
                "hub.ping_period ({:?}) must be shorter than hub.pong_wait ({:?})",
                hub.ping_period, hub.pong_wait
            )));
        }

        if hub.send_buffer == 0 || hub.broadcast_buffer == 0 {
            return Err(ConfigError::Validation("hub buffers must be greater than 0".to_owned()));
        }

        if hub.max_message_size == 0 {
            return Err(ConfigError::Validation("hub.max_message_size must be greater than 0".to_owned()));
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        if self.llm.usage_buffer == 0 {
            return Err(ConfigError::Validation("llm.usage_buffer must be greater than 0".to_owned()));
        }

        if self.llm.failure_alert_threshold < 1 {
            return Err(ConfigError::Validation(
                "llm.failure_alert_threshold must be at least 1".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_admin(&self) -> Result<(), ConfigError> {
        if let Some(ref secret) = self.server.admin_secret
            && secret.expose_secret().is_empty()
        {
            return Err(ConfigError::Validation("server.admin_secret must not be empty".to_owned()));
        }

        Ok(())
    }
}
