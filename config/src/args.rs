use crate::OutputFormat;
use clap::Parser;

/// Report a performance counter for every virtual machine behind a vCenter endpoint.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// vCenter host name or address. The endpoint is `https://<HOST>/sdk`.
    #[clap(long, env = "VCSA_SERVER", value_name = "HOST")]
    pub server: Option<String>,

    /// User to log in with.
    #[clap(long, env = "QA_VCENTER_USERNAME", value_name = "USER")]
    pub username: Option<String>,

    /// Password of the user.
    #[clap(long, env = "QA_VCENTER_PASSWORD", hide_env_values = true, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Whether to skip validation of the endpoint's TLS certificate.
    #[clap(long, value_name = "BOOL")]
    pub insecure: Option<bool>,

    /// Counter to report, as `group.name.rollup`.
    #[clap(long, value_name = "NAME")]
    pub metric: Option<String>,

    /// Sampling interval in seconds. 20 is the real-time interval.
    #[clap(long = "interval", value_name = "SECONDS")]
    pub interval_id: Option<i32>,

    /// Maximum number of samples per virtual machine.
    #[clap(long = "max-samples", value_name = "N")]
    pub max_sample: Option<i32>,

    /// Number of virtual machines queried at the same time.
    #[clap(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// API release used in request paths.
    #[clap(long, value_name = "RELEASE")]
    pub api_release: Option<String>,

    /// Timeout for a single request, e.g. `30s` or `2m`.
    #[clap(long = "timeout", value_name = "DURATION")]
    pub request_timeout: Option<String>,

    /// Report format.
    #[clap(long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Enable debug logging.
    #[clap(short, long, action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(server) = &self.server {
                cache.insert("server".to_string(), server.clone().into());
            }
            if let Some(username) = &self.username {
                cache.insert("username".to_string(), username.clone().into());
            }
            if let Some(password) = &self.password {
                cache.insert("password".to_string(), password.clone().into());
            }
            if let Some(insecure) = self.insecure {
                cache.insert("insecure".to_string(), insecure.into());
            }
            if let Some(metric) = &self.metric {
                cache.insert("metric".to_string(), metric.clone().into());
            }
            if let Some(interval_id) = self.interval_id {
                cache.insert("interval_id".to_string(), i64::from(interval_id).into());
            }
            if let Some(max_sample) = self.max_sample {
                cache.insert("max_sample".to_string(), i64::from(max_sample).into());
            }
            if let Some(concurrency) = self.concurrency {
                cache.insert("concurrency".to_string(), (concurrency as u64).into());
            }
            if let Some(api_release) = &self.api_release {
                cache.insert("api_release".to_string(), api_release.clone().into());
            }
            if let Some(request_timeout) = &self.request_timeout {
                cache.insert("request_timeout".to_string(), request_timeout.clone().into());
            }
            if let Some(format) = self.format {
                cache.insert("format".to_string(), format.to_string().into());
            }
            if self.verbose {
                cache.insert("verbose".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let version = clap::crate_version!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "\
{version}

Config directory: {config_dir_path}"
    )
}
