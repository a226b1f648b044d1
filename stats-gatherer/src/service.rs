use crate::{
    error::GatherError,
    session::Session,
};
use futures::future::BoxFuture;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use vsphere_vim_client::{
    ManagedObjectReference,
    ObjectContent,
    PerfCounterInfo,
    PerfEntityMetricBase,
    PerfQuerySpec,
    VimError,
};

pub type ServiceFuture<'a, T> = BoxFuture<'a, Result<T, VimError>>;

pub(crate) const VIRTUAL_MACHINE: &str = "VirtualMachine";

/// Remote calls a collection pass makes.
///
/// Implemented by [`Session`] against a live endpoint. Implementations are shared read-only by all
/// per-entity queries, so none of the calls may require exclusive access.
pub trait PerfService: Send + Sync {
    /// Open a recursive view over all virtual machines below the inventory root.
    fn create_vm_view(&self) -> ServiceFuture<'_, ManagedObjectReference>;

    /// Read the `name` of every virtual machine in `view`.
    fn retrieve_vm_names<'a>(&'a self, view: &'a ManagedObjectReference) -> ServiceFuture<'a, Vec<ObjectContent>>;

    fn destroy_view<'a>(&'a self, view: &'a ManagedObjectReference) -> ServiceFuture<'a, ()>;

    /// The full performance counter catalog.
    fn perf_counters(&self) -> ServiceFuture<'_, Vec<PerfCounterInfo>>;

    fn query_perf(&self, spec: PerfQuerySpec) -> ServiceFuture<'_, Vec<PerfEntityMetricBase>>;

    /// End the session on the server.
    fn logout(&self) -> ServiceFuture<'_, ()>;
}

/// Run `fut` unless `cancel` fires first. An already cancelled token never polls `fut`, so no request
/// is sent.
pub async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, GatherError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GatherError::Cancelled),
        out = fut => Ok(out),
    }
}

impl PerfService for Session {
    fn create_vm_view(&self) -> ServiceFuture<'_, ManagedObjectReference> {
        Box::pin(async move {
            let vim = self.vim();
            vim.create_container_view(&vim.content().root_folder, &[VIRTUAL_MACHINE], true)
                .await
        })
    }

    fn retrieve_vm_names<'a>(&'a self, view: &'a ManagedObjectReference) -> ServiceFuture<'a, Vec<ObjectContent>> {
        Box::pin(async move { self.vim().retrieve_properties(view, VIRTUAL_MACHINE, &["name"]).await })
    }

    fn destroy_view<'a>(&'a self, view: &'a ManagedObjectReference) -> ServiceFuture<'a, ()> {
        Box::pin(async move { self.vim().destroy_view(view).await })
    }

    fn perf_counters(&self) -> ServiceFuture<'_, Vec<PerfCounterInfo>> {
        Box::pin(async move { self.vim().perf_counters().await })
    }

    fn query_perf(&self, spec: PerfQuerySpec) -> ServiceFuture<'_, Vec<PerfEntityMetricBase>> {
        Box::pin(async move { self.vim().query_perf(&[spec]).await })
    }

    fn logout(&self) -> ServiceFuture<'_, ()> {
        Box::pin(async move { self.vim().logout().await })
    }
}
