use crate::{
    error::GatherError,
    service::{
        cancellable,
        PerfService,
    },
};
use tokio_util::sync::CancellationToken;
use vsphere_vim_client::ManagedObjectReference;

/// One virtual machine of the inventory snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualMachineRef {
    pub reference: ManagedObjectReference,
    pub name: String,
}

impl VirtualMachineRef {
    pub fn new(reference: ManagedObjectReference, name: impl Into<String>) -> Self {
        Self {
            reference,
            name: name.into(),
        }
    }
}

/// List every virtual machine visible to the session.
///
/// The container view is destroyed before returning, whether the retrieval succeeded or not. After
/// cancellation the view is left to expire with the session.
pub async fn list_virtual_machines<S>(service: &S, cancel: &CancellationToken) -> Result<Vec<VirtualMachineRef>, GatherError>
where
    S: PerfService + ?Sized,
{
    let view = cancellable(cancel, service.create_vm_view())
        .await?
        .map_err(GatherError::Inventory)?;
    debug!(%view, "created container view");

    let retrieved = cancellable(cancel, service.retrieve_vm_names(&view)).await;

    match cancellable(cancel, service.destroy_view(&view)).await {
        Ok(Ok(())) => debug!(%view, "destroyed container view"),
        Ok(Err(err)) => warn!(%view, "failed to destroy container view: {err}"),
        Err(_) => debug!(%view, "skipped destroying container view after cancellation"),
    }

    let objects = retrieved?.map_err(GatherError::Inventory)?;
    let vms: Vec<_> = objects
        .into_iter()
        .filter_map(|object| match object.property("name").and_then(|prop| prop.as_str()) {
            Some(name) => Some(VirtualMachineRef::new(object.obj.clone(), name)),
            None => {
                warn!(entity = %object.obj, "skipping virtual machine without a name");
                None
            }
        })
        .collect();

    info!(count = vms.len(), "listed virtual machines");
    Ok(vms)
}
