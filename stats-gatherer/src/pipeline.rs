use crate::{
    catalog::CounterCatalog,
    error::GatherError,
    inventory::list_virtual_machines,
    query::{
        query_metric,
        Sampling,
    },
    report::{
        EntityOutcome,
        Report,
    },
    service::PerfService,
};
use futures::{
    stream,
    StreamExt as _,
};
use tokio_util::sync::CancellationToken;
use vsphere_stats_config::Config;

pub const DEFAULT_METRIC: &str = "cpu.usagemhz.average";

/// Parameters of one collection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOptions {
    pub metric: String,
    pub sampling: Sampling,
    /// Number of machines queried at the same time. 1 queries them one after another.
    pub concurrency: usize,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            metric: DEFAULT_METRIC.to_string(),
            sampling: Sampling::default(),
            concurrency: 1,
        }
    }
}

impl From<&Config> for PassOptions {
    fn from(config: &Config) -> Self {
        Self {
            metric: config.metric.clone(),
            sampling: Sampling {
                interval_id: config.interval_id,
                max_sample: config.max_sample,
            },
            concurrency: config.concurrency,
        }
    }
}

/// Run one pass: list the inventory, resolve the metric, then query every machine.
///
/// Listing, catalog and resolution failures end the pass before any query is issued. A failed
/// query only affects its own machine. Outcomes keep the inventory order regardless of
/// `concurrency`.
#[tracing::instrument(skip_all, fields(metric = %options.metric))]
pub async fn collect<S>(service: &S, options: &PassOptions, cancel: &CancellationToken) -> Result<Report, GatherError>
where
    S: PerfService + ?Sized,
{
    let vms = list_virtual_machines(service, cancel).await?;

    let catalog = CounterCatalog::fetch(service, cancel).await?;
    let descriptor = catalog.resolve(&options.metric)?.clone();
    debug!(counter_id = descriptor.id, unit = %descriptor.unit, "resolved metric");

    let counter_id = descriptor.id;
    let outcomes: Vec<EntityOutcome> = stream::iter(&vms)
        .map(|vm| async move {
            let outcome = query_metric(service, vm, counter_id, options.sampling, cancel).await;
            if let Err(err) = &outcome {
                if !err.is_fatal() {
                    warn!(entity = %vm.name, "skipping virtual machine: {err}");
                }
            }
            outcome
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    if outcomes.iter().any(|outcome| matches!(outcome, Err(GatherError::Cancelled))) {
        return Err(GatherError::Cancelled);
    }

    let report = Report { descriptor, outcomes };
    info!(
        machines = vms.len(),
        samples = report.samples().count(),
        failures = report.failures().count(),
        "collection pass finished"
    );
    Ok(report)
}
