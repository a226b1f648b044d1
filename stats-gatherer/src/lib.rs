//! # vSphere Stats Gatherer
//!
//! Reads one performance counter for every virtual machine behind a vCenter endpoint.
//!
//! A pass runs leaf-first:
//!
//! - **`session`**: logs in and owns the connection for the run
//! - **`inventory`**: lists all virtual machines through a container view
//! - **`catalog`**: fetches the counter catalog once and resolves the metric name to a counter id
//! - **`query`**: queries each machine and extracts the integer series of that counter
//! - **`report`**: renders the outcomes as text lines or a table
//!
//! [`collect`] drives the pass against any [`PerfService`]. Failures of a single machine end up in
//! the [`Report`]; everything else aborts the pass.

#[macro_use]
extern crate tracing;

mod catalog;
mod error;
mod inventory;
mod pipeline;
mod query;
mod report;
mod service;
mod session;

#[cfg(test)]
mod fake;

pub use catalog::{
    CounterCatalog,
    CounterDescriptor,
};
pub use error::GatherError;
pub use inventory::{
    list_virtual_machines,
    VirtualMachineRef,
};
pub use pipeline::{
    collect,
    PassOptions,
    DEFAULT_METRIC,
};
pub use query::{
    extract_sample,
    query_metric,
    MetricSample,
    QuerySpec,
    Sampling,
    SeriesValues,
};
pub use report::{
    format_line,
    EntityOutcome,
    Report,
};
pub use service::{
    cancellable,
    PerfService,
    ServiceFuture,
};
pub use session::{
    connect,
    disconnect,
    Credentials,
    Session,
};
