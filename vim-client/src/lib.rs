//! Client for the JSON flavour of the vSphere Web Services API.
//!
//! Covers the calls needed to read performance data: session login/logout, container views over the
//! inventory, property retrieval, the performance counter catalog and `QueryPerf`.

#[macro_use]
extern crate tracing;

mod client;
pub mod error;
pub mod types;

pub use client::{
    ClientOptions,
    VimClient,
    VimSession,
    DEFAULT_API_RELEASE,
    SESSION_HEADER,
};
pub use error::VimError;
pub use types::*;
