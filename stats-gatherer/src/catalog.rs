use crate::{
    error::GatherError,
    service::{
        cancellable,
        PerfService,
    },
};
use std::collections::{
    hash_map::Entry,
    HashMap,
};
use tokio_util::sync::CancellationToken;
use vsphere_vim_client::PerfCounterInfo;

/// A performance counter as advertised by the performance manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDescriptor {
    /// Provider-assigned counter id used in queries.
    pub id: i32,
    /// Dotted name, e.g. `cpu.usagemhz.average`.
    pub name: String,
    /// Unit key, e.g. `megaHertz`.
    pub unit: String,
    pub rollup: String,
    /// Human readable label, e.g. `Usage in MHz`.
    pub label: String,
}

impl From<&PerfCounterInfo> for CounterDescriptor {
    fn from(info: &PerfCounterInfo) -> Self {
        Self {
            id: info.key,
            name: info.full_name(),
            unit: info.unit_info.key.clone(),
            rollup: info.rollup_type.clone(),
            label: info.name_info.label.clone(),
        }
    }
}

/// Counter names mapped to their descriptors. Fetched once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct CounterCatalog {
    by_name: HashMap<String, CounterDescriptor>,
}

impl CounterCatalog {
    pub async fn fetch<S>(service: &S, cancel: &CancellationToken) -> Result<Self, GatherError>
    where
        S: PerfService + ?Sized,
    {
        let counters = cancellable(cancel, service.perf_counters())
            .await?
            .map_err(GatherError::CatalogUnavailable)?;
        let catalog = Self::from_counters(&counters);
        debug!(counters = catalog.len(), "fetched performance counter catalog");
        Ok(catalog)
    }

    /// Build a catalog from raw counter infos. When a name appears more than once, the first entry wins.
    pub fn from_counters<'a>(counters: impl IntoIterator<Item = &'a PerfCounterInfo>) -> Self {
        let mut by_name = HashMap::new();
        for info in counters {
            let descriptor = CounterDescriptor::from(info);
            match by_name.entry(descriptor.name.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(descriptor);
                }
                Entry::Occupied(entry) => {
                    debug!(
                        name = %descriptor.name,
                        kept = entry.get().id,
                        ignored = descriptor.id,
                        "duplicate counter name"
                    );
                }
            }
        }
        Self { by_name }
    }

    /// Exact-match lookup by dotted name.
    pub fn resolve(&self, name: &str) -> Result<&CounterDescriptor, GatherError> {
        self.by_name.get(name).ok_or_else(|| GatherError::UnknownMetric {
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
