use crate::{
    error::GatherError,
    inventory::VirtualMachineRef,
    service::{
        cancellable,
        PerfService,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use tokio_util::sync::CancellationToken;
use vsphere_vim_client::{
    ManagedObjectReference,
    PerfEntityMetricBase,
    PerfMetricId,
    PerfMetricSeries,
    PerfQuerySpec,
};

/// Sampling window of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampling {
    /// Interval in seconds. 20 is the finest, real-time interval.
    pub interval_id: i32,
    pub max_sample: i32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            interval_id: 20,
            max_sample: 1,
        }
    }
}

/// A query for one counter of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub entity: ManagedObjectReference,
    pub counter_id: i32,
    pub sampling: Sampling,
}

impl QuerySpec {
    pub fn new(entity: ManagedObjectReference, counter_id: i32, sampling: Sampling) -> Self {
        Self {
            entity,
            counter_id,
            sampling,
        }
    }
}

impl From<&QuerySpec> for PerfQuerySpec {
    fn from(spec: &QuerySpec) -> Self {
        PerfQuerySpec {
            entity: spec.entity.clone(),
            metric_id: vec![PerfMetricId::aggregate(spec.counter_id)],
            interval_id: spec.sampling.interval_id,
            max_sample: spec.sampling.max_sample,
        }
    }
}

/// Values of one counter instance. The aggregate instance has an empty name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesValues {
    pub instance: String,
    pub values: Vec<i64>,
}

/// What a query returned for one virtual machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    pub entity_name: String,
    pub counter_id: i32,
    pub series: Vec<SeriesValues>,
    /// Timestamp of the newest sample, if the provider reported one.
    pub sampled_at: Option<DateTime<Utc>>,
    /// Series of a representation other than integers, which are ignored.
    pub skipped_series: usize,
}

impl MetricSample {
    pub fn empty(entity_name: impl Into<String>, counter_id: i32) -> Self {
        Self {
            entity_name: entity_name.into(),
            counter_id,
            series: Vec::new(),
            sampled_at: None,
            skipped_series: 0,
        }
    }

    /// True when the provider had no value for the counter, e.g. for a powered-off machine.
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|series| series.values.is_empty())
    }

    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        self.series.iter().flat_map(|series| series.values.iter().copied())
    }
}

/// Query `counter_id` for `vm` and extract its integer series.
///
/// Provider and transport failures are returned as [`GatherError::Query`] naming the machine.
pub async fn query_metric<S>(
    service: &S,
    vm: &VirtualMachineRef,
    counter_id: i32,
    sampling: Sampling,
    cancel: &CancellationToken,
) -> Result<MetricSample, GatherError>
where
    S: PerfService + ?Sized,
{
    let spec = QuerySpec::new(vm.reference.clone(), counter_id, sampling);
    trace!(entity = %vm.name, ?spec, "querying performance data");

    let response = cancellable(cancel, service.query_perf(PerfQuerySpec::from(&spec)))
        .await?
        .map_err(|cause| GatherError::Query {
            entity: vm.name.clone(),
            cause,
        })?;

    extract_sample(&vm.name, counter_id, response)
}

/// Pick the integer series of `counter_id` out of a `QueryPerf` response.
///
/// Series of other counters are ignored. Series of other representations are counted in
/// [`MetricSample::skipped_series`]. A response without any entity result is an empty sample. A
/// response made up only of envelopes other than `PerfEntityMetric` is an
/// [`GatherError::ExtractionMismatch`].
pub fn extract_sample(
    entity_name: &str,
    counter_id: i32,
    response: Vec<PerfEntityMetricBase>,
) -> Result<MetricSample, GatherError> {
    let mut sample = MetricSample::empty(entity_name, counter_id);
    let mut unexpected = Vec::new();
    let envelopes = response.len();

    for envelope in response {
        let metric = match envelope {
            PerfEntityMetricBase::Entity(metric) => metric,
            PerfEntityMetricBase::Other { type_name } => {
                debug!(entity = entity_name, %type_name, "skipping unexpected performance data envelope");
                unexpected.push(type_name);
                continue;
            }
        };

        if let Some(latest) = metric.sample_info.iter().map(|info| info.timestamp).max() {
            sample.sampled_at = sample.sampled_at.max(Some(latest));
        }

        for series in metric.value {
            match series {
                PerfMetricSeries::Integer(series) if series.id.counter_id == counter_id => {
                    sample.series.push(SeriesValues {
                        instance: series.id.instance,
                        values: series.value,
                    });
                }
                PerfMetricSeries::Integer(_) => {}
                PerfMetricSeries::Other {
                    type_name,
                    counter_id: other,
                } => {
                    warn!(entity = entity_name, %type_name, counter_id = ?other, "skipping non-integer series");
                    sample.skipped_series += 1;
                }
            }
        }
    }

    if envelopes > 0 && unexpected.len() == envelopes {
        return Err(GatherError::ExtractionMismatch {
            entity: entity_name.to_string(),
            detail: format!("expected PerfEntityMetric, got {}", unexpected.join(", ")),
        });
    }

    if sample.is_empty() {
        debug!(entity = entity_name, counter_id, "no sample available");
    }
    Ok(sample)
}
