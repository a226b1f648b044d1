//! In-memory [`PerfService`] for tests.

use crate::service::{
    PerfService,
    ServiceFuture,
    VIRTUAL_MACHINE,
};
use chrono::{
    TimeZone as _,
    Utc,
};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use vsphere_vim_client::{
    DynamicProperty,
    ElementDescription,
    ManagedObjectReference,
    ObjectContent,
    PerfCounterInfo,
    PerfEntityMetric,
    PerfEntityMetricBase,
    PerfMetricId,
    PerfMetricIntSeries,
    PerfMetricSeries,
    PerfQuerySpec,
    PerfSampleInfo,
    VimError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    CreateView,
    RetrieveNames,
    DestroyView,
    PerfCounters,
    QueryPerf(String),
    Logout,
}

pub fn counter(key: i32, group: &str, name: &str, rollup: &str) -> PerfCounterInfo {
    let describe = |key: &str, label: String| ElementDescription {
        key: key.to_string(),
        label: label.clone(),
        summary: label,
    };
    PerfCounterInfo {
        key,
        name_info: describe(name, format!("{name} label")),
        group_info: describe(group, group.to_string()),
        unit_info: describe("megaHertz", "MHz".to_string()),
        rollup_type: rollup.to_string(),
        stats_type: "rate".to_string(),
        level: Some(1),
        per_device_level: Some(3),
    }
}

pub fn int_series(counter_id: i32, values: &[i64]) -> PerfMetricSeries {
    PerfMetricSeries::Integer(PerfMetricIntSeries {
        id: PerfMetricId::aggregate(counter_id),
        value: values.to_vec(),
    })
}

pub fn other_series(type_name: &str, counter_id: Option<i32>) -> PerfMetricSeries {
    PerfMetricSeries::Other {
        type_name: type_name.to_string(),
        counter_id,
    }
}

pub fn entity_metric(moid: &str, value: Vec<PerfMetricSeries>) -> PerfEntityMetricBase {
    let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap_or_default();
    PerfEntityMetricBase::Entity(PerfEntityMetric {
        entity: vm_ref(moid),
        sample_info: vec![PerfSampleInfo { timestamp, interval: 20 }],
        value,
    })
}

fn vm_ref(moid: &str) -> ManagedObjectReference {
    ManagedObjectReference::new(VIRTUAL_MACHINE, moid)
}

fn fault(fault_type: &str, message: &str) -> VimError {
    VimError::Fault {
        fault_type: fault_type.to_string(),
        message: message.to_string(),
    }
}

enum Reply {
    Metrics(Vec<PerfEntityMetricBase>),
    Fail,
}

pub struct FakeService {
    vms: Vec<ObjectContent>,
    counters: Vec<PerfCounterInfo>,
    replies: HashMap<String, Reply>,
    delays: HashMap<String, Duration>,
    cancel_at: Option<(Step, CancellationToken)>,
    fail_inventory: bool,
    fail_retrieval: bool,
    fail_destroy: bool,
    fail_catalog: bool,
    fail_logout: bool,
    hang_logout: bool,
    steps: Mutex<Vec<Step>>,
}

impl FakeService {
    /// Empty inventory and a small catalog containing `cpu.usagemhz.average` as counter 6.
    pub fn new() -> Self {
        Self {
            vms: Vec::new(),
            counters: vec![
                counter(2, "cpu", "usage", "average"),
                counter(6, "cpu", "usagemhz", "average"),
                counter(24, "mem", "usage", "average"),
            ],
            replies: HashMap::new(),
            delays: HashMap::new(),
            cancel_at: None,
            fail_inventory: false,
            fail_retrieval: false,
            fail_destroy: false,
            fail_catalog: false,
            fail_logout: false,
            hang_logout: false,
            steps: Mutex::new(Vec::new()),
        }
    }

    pub fn with_vm(mut self, moid: &str, name: &str) -> Self {
        self.vms.push(ObjectContent {
            obj: vm_ref(moid),
            prop_set: vec![DynamicProperty {
                name: "name".to_string(),
                val: Value::String(name.to_string()),
            }],
        });
        self
    }

    pub fn with_unnamed_vm(mut self, moid: &str) -> Self {
        self.vms.push(ObjectContent {
            obj: vm_ref(moid),
            prop_set: Vec::new(),
        });
        self
    }

    pub fn with_catalog(mut self, counters: Vec<PerfCounterInfo>) -> Self {
        self.counters = counters;
        self
    }

    pub fn with_response(mut self, moid: &str, response: Vec<PerfEntityMetricBase>) -> Self {
        self.replies.insert(moid.to_string(), Reply::Metrics(response));
        self
    }

    pub fn with_query_failure(mut self, moid: &str) -> Self {
        self.replies.insert(moid.to_string(), Reply::Fail);
        self
    }

    pub fn with_query_delay(mut self, moid: &str, delay: Duration) -> Self {
        self.delays.insert(moid.to_string(), delay);
        self
    }

    /// Cancel `token` while the call recorded as `step` is in flight.
    pub fn cancelling_at(mut self, step: Step, token: CancellationToken) -> Self {
        self.cancel_at = Some((step, token));
        self
    }

    pub fn failing_inventory(mut self) -> Self {
        self.fail_inventory = true;
        self
    }

    pub fn failing_retrieval(mut self) -> Self {
        self.fail_retrieval = true;
        self
    }

    pub fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }

    pub fn failing_catalog(mut self) -> Self {
        self.fail_catalog = true;
        self
    }

    pub fn failing_logout(mut self) -> Self {
        self.fail_logout = true;
        self
    }

    /// Logout never answers.
    pub fn hanging_logout(mut self) -> Self {
        self.hang_logout = true;
        self
    }

    pub fn steps(&self) -> Vec<Step> {
        self.steps.lock().unwrap().clone()
    }

    /// Managed object ids of all queried machines, in call order.
    pub fn queried(&self) -> Vec<String> {
        self.steps()
            .into_iter()
            .filter_map(|step| match step {
                Step::QueryPerf(moid) => Some(moid),
                _ => None,
            })
            .collect()
    }

    /// Record `step`. If the test asked to cancel at this step, cancel and yield once so the
    /// cancellation lands while the call is still pending.
    async fn record(&self, step: Step) {
        let cancel = match &self.cancel_at {
            Some((target, token)) if *target == step => Some(token.clone()),
            _ => None,
        };
        self.steps.lock().unwrap().push(step);
        if let Some(token) = cancel {
            token.cancel();
            tokio::task::yield_now().await;
        }
    }

    fn view() -> ManagedObjectReference {
        ManagedObjectReference::new("ContainerView", "session[52a1]view-1")
    }
}

impl PerfService for FakeService {
    fn create_vm_view(&self) -> ServiceFuture<'_, ManagedObjectReference> {
        Box::pin(async move {
            self.record(Step::CreateView).await;
            if self.fail_inventory {
                return Err(fault("NotAuthenticated", "The session is not authenticated."));
            }
            Ok(Self::view())
        })
    }

    fn retrieve_vm_names<'a>(&'a self, view: &'a ManagedObjectReference) -> ServiceFuture<'a, Vec<ObjectContent>> {
        Box::pin(async move {
            self.record(Step::RetrieveNames).await;
            assert_eq!(view, &Self::view());
            if self.fail_retrieval {
                return Err(fault("ManagedObjectNotFound", "The object has already been deleted."));
            }
            Ok(self.vms.clone())
        })
    }

    fn destroy_view<'a>(&'a self, view: &'a ManagedObjectReference) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            self.record(Step::DestroyView).await;
            assert_eq!(view, &Self::view());
            if self.fail_destroy {
                return Err(fault("SystemError", "A general system error occurred."));
            }
            Ok(())
        })
    }

    fn perf_counters(&self) -> ServiceFuture<'_, Vec<PerfCounterInfo>> {
        Box::pin(async move {
            self.record(Step::PerfCounters).await;
            if self.fail_catalog {
                return Err(fault("SystemError", "A general system error occurred."));
            }
            Ok(self.counters.clone())
        })
    }

    fn query_perf(&self, spec: PerfQuerySpec) -> ServiceFuture<'_, Vec<PerfEntityMetricBase>> {
        Box::pin(async move {
            let moid = spec.entity.value.clone();
            self.record(Step::QueryPerf(moid.clone())).await;

            if let Some(delay) = self.delays.get(&moid) {
                tokio::time::sleep(*delay).await;
            }

            match self.replies.get(&moid) {
                Some(Reply::Metrics(response)) => Ok(response.clone()),
                Some(Reply::Fail) => Err(fault("HostCommunication", "Unable to communicate with the remote host.")),
                None => Ok(Vec::new()),
            }
        })
    }

    fn logout(&self) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            self.record(Step::Logout).await;
            if self.hang_logout {
                futures::future::pending::<()>().await;
            }
            if self.fail_logout {
                return Err(fault("NotAuthenticated", "The session is not authenticated."));
            }
            Ok(())
        })
    }
}
