/// Problems with the settings, detected before anything is sent to the endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{setting} is not configured (pass --{setting} or set {env})")]
    Missing { setting: &'static str, env: &'static str },

    #[error("invalid {setting}: {reason}")]
    Invalid { setting: &'static str, reason: String },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigError {
    pub(crate) fn invalid(setting: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            setting,
            reason: reason.into(),
        }
    }
}
