use clap::Parser;
use color_eyre::Result;
use vsphere_stats::{
    init_errors,
    logging,
    App,
};
use vsphere_stats_config::Args;

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let args = Args::parse();
    logging::log_init(args.verbose)?;

    App::new(args)?.run().await
}
