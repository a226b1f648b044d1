use eyre::{
    Context as _,
    Result,
};
use tokio_util::sync::CancellationToken;
use vsphere_stats_config::{
    Args,
    Config,
};
use vsphere_stats_gatherer::{
    collect,
    connect,
    disconnect,
    Credentials,
    PassOptions,
};
use vsphere_vim_client::ClientOptions;

pub struct App {
    config: Config,
}

impl App {
    pub fn new(args: Args) -> Result<Self> {
        let config = Config::new(args).context("Failed to load configuration")?;
        config.validate().context("Invalid configuration")?;
        Ok(Self { config })
    }

    /// Connect, run one collection pass and print the report to stdout.
    pub async fn run(self) -> Result<()> {
        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted, cancelling collection");
                    cancel.cancel();
                }
            }
        });

        let endpoint = self.config.endpoint_url()?;
        let options = ClientOptions {
            insecure: self.config.insecure,
            api_release: self.config.api_release.clone(),
            timeout: self.config.request_timeout()?,
        };
        let credentials = Credentials::new(self.config.username.clone(), self.config.password.clone());

        info!(%endpoint, username = %credentials.username, "connecting");
        let session = connect(&endpoint, &credentials, &options, &cancel)
            .await
            .with_context(|| format!("Failed to establish a session with {endpoint}"))?;
        info!(user = session.user_name(), "session established");

        let result = collect(&session, &PassOptions::from(&self.config), &cancel).await;

        disconnect(&session, &cancel).await;

        let report = result.with_context(|| format!("Failed to collect {}", self.config.metric))?;
        print!("{}", report.render(self.config.format));
        Ok(())
    }
}
