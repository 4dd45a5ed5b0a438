//! The incubator control core: ties the control loops (`incubator-control`),
//! the persisted state and historian (`incubator-store`), and a hardware
//! abstraction layer together behind one [`supervisor::Supervisor`].

pub mod config;
pub mod error;
pub mod hal;
pub mod snapshot;
pub mod supervisor;

pub use config::IncubatorConfig;
pub use error::{FacadeError, SupervisorError};
pub use snapshot::Snapshot;
pub use supervisor::{Supervisor, SupervisorHandle};
