use incubator_hal::HalError;
use incubator_store::StoreError;

/// Construction/lifecycle faults — raised by [`crate::supervisor::Supervisor::new`]
/// and `Supervisor::run`'s shutdown path, never by a running loop. A
/// running loop's own faults stay local to that loop and never propagate
/// here or to any other loop.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to open CO2 probe: {0}")]
    HalOpen(#[from] HalError),

    #[error("failed to open historian: {0}")]
    HistorianOpen(#[from] StoreError),

    #[error("shutdown timed out waiting for {loop_name} to stop")]
    ShutdownTimeout { loop_name: &'static str },
}

/// The boundary error codes for the control surface consumed by an
/// external façade. Not wired to an HTTP layer in this workspace, but this
/// is the concrete type `update_setpoints`/`set_enabled` return so a future
/// façade has a contract to map onto status codes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FacadeError {
    #[error("no such loop: {loop_name}")]
    NotFound { loop_name: String },

    #[error("invalid value for {key}")]
    BadRequest { key: String },

    #[error("supervisor is shutting down")]
    Unavailable,
}
