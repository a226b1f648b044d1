//! Settings for a collection run.
//!
//! Values are layered: the embedded defaults, then `config.yaml` in the config directory, then
//! command-line arguments and their environment variables.

#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod error;
mod output_format;

pub use app_config::{
    get_config_dir,
    AppConfig,
};
pub use args::Args;
pub use error::ConfigError;
pub use output_format::OutputFormat;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    path::Path,
    time::Duration,
};
use url::Url;

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

/// Password that stays out of logs and `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_empty() { "\"\"" } else { "\"***\"" })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    pub app_config: AppConfig,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: Password,
    #[serde(default)]
    pub insecure: bool,
    pub metric: String,
    pub interval_id: i32,
    pub max_sample: i32,
    pub concurrency: usize,
    pub api_release: String,
    pub request_timeout: String,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    pub fn new(args: Args) -> Result<Self, ConfigError> {
        Self::load(&get_config_dir(), args)
    }

    /// Build the configuration from the files in `config_dir` and `args`.
    pub fn load(config_dir: &Path, args: Args) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let config_files = [("config.yaml", config::FileFormat::Yaml)];

        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        builder = builder.add_source(args);

        let cfg: Self = builder.build()?.try_deserialize()?;
        debug!(config_dir = ?cfg.app_config.config_dir, server = %cfg.server, metric = %cfg.metric, "configuration loaded");

        Ok(cfg)
    }

    /// Check that the run can start: credentials are present and the numeric settings are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("server", self.server.as_str(), "VCSA_SERVER"),
            ("username", self.username.as_str(), "QA_VCENTER_USERNAME"),
            ("password", self.password.expose(), "QA_VCENTER_PASSWORD"),
        ];
        for (setting, value, env) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing { setting, env });
            }
        }

        if self.metric.trim().is_empty() {
            return Err(ConfigError::invalid("metric", "must not be empty"));
        }
        if self.interval_id <= 0 {
            return Err(ConfigError::invalid("interval_id", "must be a positive number of seconds"));
        }
        if self.max_sample <= 0 {
            return Err(ConfigError::invalid("max_sample", "must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::invalid("concurrency", "must be at least 1"));
        }

        self.request_timeout()?;
        self.endpoint_url()?;
        Ok(())
    }

    /// The SDK endpoint of the configured server, `https://<server>/sdk`.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&format!("https://{}/sdk", self.server.trim()))
            .map_err(|err| ConfigError::invalid("server", format!("{:?} is not a valid host: {err}", self.server)))
    }

    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(&self.request_timeout).map_err(|err| {
            ConfigError::invalid(
                "request_timeout",
                format!("{:?} is not a duration: {err}", self.request_timeout),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    fn credentials() -> Args {
        Args {
            server: Some("vcenter.example.com".into()),
            username: Some("administrator@vsphere.local".into()),
            password: Some("secret".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path(), credentials()).unwrap();

        assert_eq!(cfg.metric, "cpu.usagemhz.average");
        assert_eq!(cfg.interval_id, 20);
        assert_eq!(cfg.max_sample, 1);
        assert_eq!(cfg.concurrency, 1);
        assert_eq!(cfg.api_release, "8.0.1.0");
        assert_eq!(cfg.format, OutputFormat::Text);
        assert!(!cfg.insecure);
        assert_eq!(cfg.request_timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(cfg.app_config.config_dir, dir.path());
        cfg.validate().unwrap();
    }

    #[test]
    fn args_override_the_config_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.child("config.yaml"),
            "server: file.example.com\ninsecure: true\nconcurrency: 4\nformat: table\n",
        )
        .unwrap();

        let cfg = Config::load(
            dir.path(),
            Args {
                concurrency: Some(8),
                ..credentials()
            },
        )
        .unwrap();

        assert_eq!(cfg.server, "vcenter.example.com");
        assert!(cfg.insecure);
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.format, OutputFormat::Table);
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(
            dir.path(),
            Args {
                password: None,
                ..credentials()
            },
        )
        .unwrap();

        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { setting: "password", .. }));
        assert!(err.to_string().contains("QA_VCENTER_PASSWORD"));
    }

    #[test]
    fn invalid_numbers_fail_validation() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(
            dir.path(),
            Args {
                max_sample: Some(0),
                ..credentials()
            },
        )
        .unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { setting: "max_sample", .. })));

        let cfg = Config::load(
            dir.path(),
            Args {
                request_timeout: Some("soon".into()),
                ..credentials()
            },
        )
        .unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { setting: "request_timeout", .. })));
    }

    #[test]
    fn endpoint_points_at_the_sdk() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path(), credentials()).unwrap();
        assert_eq!(cfg.endpoint_url().unwrap().as_str(), "https://vcenter.example.com/sdk");
    }

    #[test]
    fn password_is_redacted() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path(), credentials()).unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("secret"), "{debug}");
        assert_eq!(cfg.password.expose(), "secret");
    }
}
