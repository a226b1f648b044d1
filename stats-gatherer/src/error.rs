use vsphere_vim_client::VimError;

/// Failures of a collection pass.
///
/// `Query` and `ExtractionMismatch` concern a single virtual machine and are recorded in the report.
/// Every other kind ends the run.
#[derive(Debug, thiserror::Error)]
pub enum GatherError {
    #[error("credentials rejected by {endpoint}: {cause}")]
    Authentication { endpoint: String, cause: VimError },

    #[error("could not connect to {endpoint}: {cause}")]
    Connection { endpoint: String, cause: VimError },

    #[error("failed to list virtual machines: {0}")]
    Inventory(VimError),

    #[error("failed to fetch the performance counter catalog: {0}")]
    CatalogUnavailable(VimError),

    #[error("metric {name:?} is not in the performance counter catalog")]
    UnknownMetric { name: String },

    #[error("performance query for {entity} failed: {cause}")]
    Query { entity: String, cause: VimError },

    #[error("unexpected performance data for {entity}: {detail}")]
    ExtractionMismatch { entity: String, detail: String },

    #[error("collection cancelled")]
    Cancelled,
}

impl GatherError {
    /// Whether the error ends the whole run rather than a single virtual machine's query.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GatherError::Query { .. } | GatherError::ExtractionMismatch { .. })
    }

    /// Name of the virtual machine a per-entity error belongs to.
    pub fn entity(&self) -> Option<&str> {
        match self {
            GatherError::Query { entity, .. } | GatherError::ExtractionMismatch { entity, .. } => Some(entity),
            _ => None,
        }
    }
}
